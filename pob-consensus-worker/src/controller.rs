// Copyright (c) 2022 MASSA LABS <info@massa.net>

use std::sync::Arc;

use parking_lot::RwLock;
use pob_block_cache::SharedBlockCache;
use pob_consensus_exports::{ConsensusController, NodeMode};
use pob_models::block_id::BlockId;

use crate::worker::EngineShared;

/// Reads go through the shared state and the block cache; the engine has no
/// external commands besides stopping.
#[derive(Clone)]
pub(crate) struct PobControllerImpl {
    pub(crate) shared: Arc<RwLock<EngineShared>>,
    pub(crate) cache: SharedBlockCache,
}

impl ConsensusController for PobControllerImpl {
    fn mode(&self) -> NodeMode {
        self.shared.read().mode
    }

    fn head_info(&self) -> (BlockId, u64) {
        let cache = self.cache.read();
        (cache.head_id(), cache.head().number())
    }

    fn lib_info(&self) -> (BlockId, u64) {
        let cache = self.cache.read();
        (cache.linked_root_id(), cache.linked_root().number())
    }

    fn clone_box(&self) -> Box<dyn ConsensusController> {
        Box::new(self.clone())
    }
}
