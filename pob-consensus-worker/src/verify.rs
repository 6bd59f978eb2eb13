// Copyright (c) 2022 MASSA LABS <info@massa.net>

use std::sync::Arc;

use crossbeam::channel::Receiver;
use crossbeam::select;
use parking_lot::RwLock;
use pob_consensus_exports::ConsensusError;
use pob_sync_exports::{BlockInfo, BlockMessage, BlockMessageKind};
use tracing::{debug, warn};

use crate::processor::BlockProcessor;

/// The verify loop: sole consumer of the synchronizer's incoming-block
/// channel.
pub(crate) struct VerifyThread {
    pub(crate) processor: BlockProcessor,
    pub(crate) incoming: Receiver<BlockMessage>,
    pub(crate) quit: Receiver<()>,
    /// held for read around each ingestion so that an active producer
    /// (which holds it for write) is never raced
    pub(crate) produce_gate: Arc<RwLock<()>>,
}

impl VerifyThread {
    pub(crate) fn run(self) {
        loop {
            select! {
                recv(self.quit) -> _ => break,
                recv(self.incoming) -> message => {
                    let Ok(message) = message else { break };
                    let _gate = self.produce_gate.read();
                    self.handle(message);
                }
            }
        }
    }

    fn handle(&self, message: BlockMessage) {
        let number = message.block.number();
        let head_number = self.processor.cache.read().head().number();
        if number > head_number + self.processor.config.max_block_ahead {
            debug!("block number is too large, block number: {}", number);
            return;
        }

        let info = BlockInfo {
            number,
            id: message.block.id(),
        };
        let result = self.processor.handle_recv_block(message.block, false);

        match message.kind {
            BlockMessageKind::NewBlock => {
                // linked or retained as Single: worth advertising onward
                if matches!(result, Ok(()) | Err(ConsensusError::Single(_))) {
                    if let Err(err) = self.processor.channels.sync.broadcast_block_hash(info) {
                        debug!("block hash broadcast failed: {}", err);
                    }
                }
                match result {
                    Ok(())
                    | Err(ConsensusError::Single(_))
                    | Err(ConsensusError::Duplicate(_)) => {}
                    Err(err) => warn!("received new block error: {}", err),
                }
            }
            BlockMessageKind::SyncResponse => match result {
                Ok(()) | Err(ConsensusError::Single(_)) | Err(ConsensusError::Duplicate(_)) => {}
                Err(err) => warn!("received sync block error: {}", err),
            },
        }
    }
}
