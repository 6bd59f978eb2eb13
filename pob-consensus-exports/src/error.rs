// Copyright (c) 2022 MASSA LABS <info@massa.net>

use displaydoc::Display;
use pob_models::block_id::BlockId;
use thiserror::Error;

/// Errors of the consensus engine.
///
/// `Duplicate` and `Single` are expected outcomes of ordinary block
/// ingestion and are never surfaced past the verify loop.
#[non_exhaustive]
#[derive(Display, Error, Debug)]
pub enum ConsensusError {
    /// block {0} is already known
    Duplicate(BlockId),
    /// block {0} kept single, its parent is not linked yet
    Single(BlockId),
    /// block {0} exceeds the per-slot production limit of its witness
    OutOfLimit(BlockId),
    /// basic verification failed: {0}
    VerifyBasics(String),
    /// state verification failed: {0}
    VerifyState(String),
    /// block cache error: {0}
    BlockCacheError(#[from] pob_block_cache::BlockCacheError),
    /// execution error: {0}
    ExecutionError(#[from] pob_execution_exports::ExecutionError),
    /// pool error: {0}
    PoolError(#[from] pob_pool_exports::PoolError),
    /// sync error: {0}
    SyncError(#[from] pob_sync_exports::SyncError),
    /// storage error: {0}
    StorageError(#[from] pob_storage::StorageError),
    /// models error: {0}
    ModelsError(#[from] pob_models::ModelsError),
    /// time error: {0}
    TimeError(#[from] pob_time::TimeError),
    /// channel error: {0}
    ChannelError(String),
}
