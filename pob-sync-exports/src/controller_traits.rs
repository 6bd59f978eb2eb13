// Copyright (c) 2022 MASSA LABS <info@massa.net>

use pob_channel::receiver::PobReceiver;
use pob_models::block::Block;

use crate::messages::{BlockInfo, BlockMessage};
use crate::SyncError;

/// Interface to the synchronizer
pub trait SyncController: Send + Sync {
    /// The channel on which incoming blocks are delivered; the consensus
    /// verify loop is the sole consumer
    fn incoming_blocks(&self) -> PobReceiver<BlockMessage>;

    /// Whether the head lags the neighborhood by more than the threshold
    fn is_catching_up(&self) -> bool;

    /// Highest recently reported neighbor height
    fn neighbor_height(&self) -> u64;

    /// Urgent broadcast of a freshly produced block
    fn broadcast_block(&self, block: &Block) -> Result<(), SyncError>;

    /// Urgent broadcast of a freshly linked block id
    fn broadcast_block_hash(&self, info: BlockInfo) -> Result<(), SyncError>;

    /// Joins or leaves the block-producer overlay
    fn connect_bp_overlay(&self, connect: bool);

    /// Returns a boxed clone of self.
    /// Useful to allow cloning `Box<dyn SyncController>`.
    fn clone_box(&self) -> Box<dyn SyncController>;
}

impl Clone for Box<dyn SyncController> {
    fn clone(&self) -> Box<dyn SyncController> {
        self.clone_box()
    }
}

/// Synchronizer manager used to stop its threads
pub trait SyncManager {
    /// Stops the synchronizer threads
    fn stop(&mut self);
}
