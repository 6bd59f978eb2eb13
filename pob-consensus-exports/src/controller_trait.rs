// Copyright (c) 2022 MASSA LABS <info@massa.net>

use pob_models::block_id::BlockId;

use crate::NodeMode;

/// Interface to the consensus engine
pub trait ConsensusController: Send + Sync {
    /// Current operating mode
    fn mode(&self) -> NodeMode;

    /// Id and height of the best linked tip
    fn head_info(&self) -> (BlockId, u64);

    /// Id and height of the last irreversible block
    fn lib_info(&self) -> (BlockId, u64);

    /// Returns a boxed clone of self.
    /// Useful to allow cloning `Box<dyn ConsensusController>`.
    fn clone_box(&self) -> Box<dyn ConsensusController>;
}

impl Clone for Box<dyn ConsensusController> {
    fn clone(&self) -> Box<dyn ConsensusController> {
        self.clone_box()
    }
}

/// Consensus manager used to stop the engine loops
pub trait ConsensusManager {
    /// Stops the verify and schedule loops, then the synchronizer
    fn stop(&mut self);
}
