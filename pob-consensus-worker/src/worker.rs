// Copyright (c) 2022 MASSA LABS <info@massa.net>

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam::channel::{bounded, Sender};
use parking_lot::RwLock;
use pob_block_cache::{BlockCacheConfig, SharedBlockCache};
use pob_consensus_exports::{
    ConsensusChannels, ConsensusController, ConsensusError, ConsensusManager, NodeMode, PobConfig,
};
use pob_models::block::Block;
use pob_signature::KeyPair;
use pob_sync_exports::SyncManager;
use tracing::{info, warn};

use crate::controller::PobControllerImpl;
use crate::processor::BlockProcessor;
use crate::schedule::ScheduleThread;
use crate::verify::VerifyThread;

/// State shared between the loops and the controller
pub(crate) struct EngineShared {
    pub(crate) mode: NodeMode,
}

struct PobManagerImpl {
    quit: Option<Sender<()>>,
    handles: Vec<JoinHandle<()>>,
    sync_manager: Box<dyn SyncManager>,
}

impl ConsensusManager for PobManagerImpl {
    fn stop(&mut self) {
        info!("stopping consensus worker...");
        drop(self.quit.take());
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
        self.sync_manager.stop();
        info!("consensus worker stopped");
    }
}

/// Replays the write-ahead log through the ordinary ingest path. Blocks
/// already known or still waiting for their parent are expected outcomes; a
/// hard failure rotates the log and leaves the cache for the synchronizer
/// to refill.
pub(crate) fn recover_block_cache(
    processor: &BlockProcessor,
    cache_config: &BlockCacheConfig,
    replay: Vec<Block>,
) {
    let replayed = replay.len();
    for block in replay {
        match processor.handle_recv_block(block, true) {
            Ok(())
            | Err(ConsensusError::Duplicate(_))
            | Err(ConsensusError::Single(_)) => {}
            Err(err) => {
                warn!("failed to recover block cache: {}", err);
                info!("dropping the remaining log, moving the old file aside");
                if let Err(err) = processor.cache.write().new_wal(cache_config) {
                    warn!("failed to start a fresh WAL: {}", err);
                }
                return;
            }
        }
    }
    if replayed > 0 {
        info!("recovered {} blocks from the write-ahead log", replayed);
    }
}

/// Starts the PoB engine: recovers the block cache from its log, then runs
/// the verify and schedule loops.
pub fn start_pob_worker(
    config: PobConfig,
    cache_config: BlockCacheConfig,
    keypair: KeyPair,
    channels: ConsensusChannels,
    cache: SharedBlockCache,
    wal_replay: Vec<Block>,
    sync_manager: Box<dyn SyncManager>,
) -> (Box<dyn ConsensusController>, Box<dyn ConsensusManager>) {
    let processor = BlockProcessor {
        config,
        channels: channels.clone(),
        cache: cache.clone(),
        our_key: keypair.get_public_key(),
    };

    recover_block_cache(&processor, &cache_config, wal_replay);

    let shared = Arc::new(RwLock::new(EngineShared {
        mode: NodeMode::Init,
    }));
    let produce_gate = Arc::new(RwLock::new(()));
    let (quit_tx, quit_rx) = bounded::<()>(0);

    let incoming = channels.sync.incoming_blocks();
    let verify = VerifyThread {
        processor: processor.clone(),
        incoming: (*incoming).clone(),
        quit: quit_rx.clone(),
        produce_gate: produce_gate.clone(),
    };
    let verify_handle = std::thread::Builder::new()
        .name("pob-verify".into())
        .spawn(move || verify.run())
        .expect("failed to spawn thread: pob-verify");

    let schedule = ScheduleThread {
        processor,
        keypair,
        quit: quit_rx,
        shared: shared.clone(),
        produce_gate,
    };
    let schedule_handle = std::thread::Builder::new()
        .name("pob-schedule".into())
        .spawn(move || schedule.run())
        .expect("failed to spawn thread: pob-schedule");

    let controller = PobControllerImpl { shared, cache };
    let manager = PobManagerImpl {
        quit: Some(quit_tx),
        handles: vec![verify_handle, schedule_handle],
        sync_manager,
    };
    (Box::new(controller), Box::new(manager))
}
