// Copyright (c) 2022 MASSA LABS <info@massa.net>

use pob_execution_exports::ExecutionController;
use pob_pool_exports::PoolController;
use pob_storage::ChainStore;
use pob_sync_exports::SyncController;

/// Links to the other modules of the node the engine interacts with.
#[derive(Clone)]
pub struct ConsensusChannels {
    /// Interface to the transaction pool
    pub pool: Box<dyn PoolController>,
    /// Interface to the versioned execution state
    pub execution: Box<dyn ExecutionController>,
    /// Interface to the finalized-history store
    pub chain: Box<dyn ChainStore>,
    /// Interface to the synchronizer
    pub sync: Box<dyn SyncController>,
}
