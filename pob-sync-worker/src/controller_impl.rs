// Copyright (c) 2022 MASSA LABS <info@massa.net>

use std::sync::Arc;

use parking_lot::RwLock;
use pob_block_cache::SharedBlockCache;
use pob_channel::receiver::PobReceiver;
use pob_models::block::Block;
use pob_sync_exports::{
    BlockInfo, BlockMessage, PeerMessage, PeerNetwork, SyncConfig, SyncController, SyncError,
};
use pob_time::PobTime;

use crate::state::SyncState;

#[derive(Clone)]
pub(crate) struct SyncControllerImpl {
    pub(crate) config: SyncConfig,
    pub(crate) state: Arc<RwLock<SyncState>>,
    pub(crate) cache: SharedBlockCache,
    pub(crate) network: Box<dyn PeerNetwork>,
    pub(crate) consumer_rx: PobReceiver<BlockMessage>,
}

impl SyncController for SyncControllerImpl {
    fn incoming_blocks(&self) -> PobReceiver<BlockMessage> {
        self.consumer_rx.clone()
    }

    fn is_catching_up(&self) -> bool {
        let head = self.cache.read().head().number();
        head + self.config.lag_threshold < self.neighbor_height()
    }

    fn neighbor_height(&self) -> u64 {
        let now = PobTime::now().unwrap_or_default();
        self.state.read().neighbor_height(now)
    }

    fn broadcast_block(&self, block: &Block) -> Result<(), SyncError> {
        self.network.broadcast(&PeerMessage::NewBlock(block.clone()))
    }

    fn broadcast_block_hash(&self, info: BlockInfo) -> Result<(), SyncError> {
        self.network.broadcast(&PeerMessage::NewBlockHash(info))
    }

    fn connect_bp_overlay(&self, connect: bool) {
        self.network.connect_bp_overlay(connect);
    }

    fn clone_box(&self) -> Box<dyn SyncController> {
        Box::new(self.clone())
    }
}
