// Copyright (c) 2022 MASSA LABS <info@massa.net>

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam::channel::{bounded, Receiver, Sender};
use crossbeam::select;
use parking_lot::RwLock;
use pob_block_cache::SharedBlockCache;
use pob_channel::{receiver::PobReceiver, sender::PobSender, PobChannel};
use pob_models::block_id::BlockId;
use pob_serialization::{DeserializeError, Deserializer};
use pob_storage::ChainStore;
use pob_sync_exports::{
    BlockInfo, BlockMessage, BlockMessageKind, PeerId, PeerMessage, PeerMessageDeserializer,
    PeerNetwork, SyncConfig, SyncController, SyncManager,
};
use pob_time::PobTime;
use rand::seq::SliceRandom;
use tracing::{debug, info, warn};

use crate::controller_impl::SyncControllerImpl;
use crate::state::SyncState;

fn now() -> PobTime {
    PobTime::now().unwrap_or_default()
}

/// Deserializes inbound frames and routes them to the loop that owns each
/// concern.
struct DispatchThread {
    inbound: Receiver<(PeerId, Vec<u8>)>,
    quit: Receiver<()>,
    state: Arc<RwLock<SyncState>>,
    consumer_tx: PobSender<BlockMessage>,
    gossip_tx: Sender<(BlockInfo, PeerId)>,
    request_tx: Sender<(PeerId, PeerMessage)>,
    deserializer: PeerMessageDeserializer,
}

impl DispatchThread {
    fn run(self) {
        loop {
            select! {
                recv(self.quit) -> _ => break,
                recv(self.inbound) -> frame => {
                    let Ok((peer, bytes)) = frame else { break };
                    self.route(peer, &bytes);
                }
            }
        }
    }

    fn route(&self, peer: PeerId, bytes: &[u8]) {
        let message = match self.deserializer.deserialize::<DeserializeError>(bytes) {
            Ok((rest, message)) if rest.is_empty() => message,
            Ok(_) => {
                debug!("peer {} sent a frame with trailing bytes", peer);
                return;
            }
            Err(err) => {
                debug!("undecodable frame from peer {}: {}", peer, err);
                return;
            }
        };
        match message {
            PeerMessage::SyncHeight { height, .. } => {
                self.state.write().record_height(peer, height, now());
            }
            PeerMessage::NewBlock(block) => {
                let _ = self.consumer_tx.try_send(BlockMessage {
                    block,
                    kind: BlockMessageKind::NewBlock,
                });
            }
            PeerMessage::BlockResponse(block) => {
                let _ = self.consumer_tx.try_send(BlockMessage {
                    block,
                    kind: BlockMessageKind::SyncResponse,
                });
            }
            PeerMessage::NewBlockHash(info) => {
                let _ = self.gossip_tx.try_send((info, peer));
            }
            PeerMessage::BlockHashResponse(infos) => {
                self.state.write().record_hashes(&peer, infos);
            }
            request @ (PeerMessage::BlockHashRequest { .. }
            | PeerMessage::BlockRequest(_)
            | PeerMessage::NewBlockRequest(_)) => {
                let _ = self.request_tx.try_send((peer, request));
            }
        }
    }
}

/// Broadcasts the local height every tick
struct HeightSyncThread {
    config: SyncConfig,
    quit: Receiver<()>,
    cache: SharedBlockCache,
    network: Box<dyn PeerNetwork>,
}

impl HeightSyncThread {
    fn run(self) {
        loop {
            select! {
                recv(self.quit) -> _ => break,
                default(self.config.height_interval.to_duration()) => {
                    let height = self.cache.read().head().number();
                    if let Err(err) = self.network.broadcast(&PeerMessage::SyncHeight {
                        height,
                        time: now(),
                    }) {
                        debug!("height broadcast failed: {}", err);
                    }
                }
            }
        }
    }
}

/// The height window worth requesting right now: just above the head, no
/// further than the sync range, capped at the neighborhood height.
fn sync_range(
    cache: &SharedBlockCache,
    state: &Arc<RwLock<SyncState>>,
    config: &SyncConfig,
) -> Option<(u64, u64)> {
    let head = cache.read().head().number();
    let neighbor = state.read().neighbor_height(now());
    let start = head + 1;
    let end = head.saturating_add(config.max_sync_range).min(neighbor);
    if start > end {
        return None;
    }
    Some((start, end))
}

/// Requests block-hash ranges the node has not covered yet
struct BlockHashSyncThread {
    config: SyncConfig,
    quit: Receiver<()>,
    cache: SharedBlockCache,
    state: Arc<RwLock<SyncState>>,
    network: Box<dyn PeerNetwork>,
}

impl BlockHashSyncThread {
    fn run(self) {
        loop {
            select! {
                recv(self.quit) -> _ => break,
                default(self.config.hash_interval.to_duration()) => self.tick(),
            }
        }
    }

    fn tick(&self) {
        let Some((range_start, end)) = sync_range(&self.cache, &self.state, &self.config) else {
            return;
        };
        // skip the prefix that advertisements already cover
        let Some(start) = self.state.read().first_unknown_in(range_start, end) else {
            return;
        };
        let peers = self.state.read().peers_at_least(start, now());
        let Some(peer) = peers.choose(&mut rand::thread_rng()) else {
            return;
        };
        debug!("requesting block hashes [{}, {}] from {}", start, end, peer);
        if let Err(err) = self
            .network
            .send_to(peer, &PeerMessage::BlockHashRequest { start, end })
        {
            debug!("block hash request failed: {}", err);
        }
    }
}

/// Requests the blocks behind known hashes, and urgently fetches gossiped
/// hashes the node does not know yet
struct BlockSyncThread {
    config: SyncConfig,
    quit: Receiver<()>,
    gossip_rx: Receiver<(BlockInfo, PeerId)>,
    cache: SharedBlockCache,
    chain: Box<dyn ChainStore>,
    state: Arc<RwLock<SyncState>>,
    network: Box<dyn PeerNetwork>,
}

impl BlockSyncThread {
    fn run(self) {
        loop {
            select! {
                recv(self.quit) -> _ => break,
                recv(self.gossip_rx) -> gossip => {
                    let Ok((info, peer)) = gossip else { break };
                    self.fetch_gossiped(info, peer);
                }
                default(self.config.block_interval.to_duration()) => self.tick(),
            }
        }
    }

    fn have_block(&self, id: &BlockId) -> bool {
        self.cache.read().contains(id) || self.chain.contains(id)
    }

    fn fetch_gossiped(&self, info: BlockInfo, peer: PeerId) {
        if self.have_block(&info.id) || self.state.read().recently_requested(&info.id, now()) {
            return;
        }
        debug!("urgently fetching gossiped block {} from {}", info.id, peer);
        if let Err(err) = self
            .network
            .send_to(&peer, &PeerMessage::NewBlockRequest(info.id))
        {
            debug!("gossip block request failed: {}", err);
            return;
        }
        self.state.write().mark_requested(info.id, now());
    }

    fn tick(&self) {
        {
            let head = self.cache.read().head().number();
            self.state.write().forget_below(head + 1);
        }
        let Some((start, end)) = sync_range(&self.cache, &self.state, &self.config) else {
            return;
        };
        let wanted = self.state.read().hashes_in_range(start, end);
        if !wanted.is_empty() {
            info!("syncing blocks in [{}, {}]...", start, end);
        }
        for (number, id, peers) in wanted {
            if self.have_block(&id) {
                self.state.write().forget_hash(number);
                continue;
            }
            if self.state.read().recently_requested(&id, now()) {
                continue;
            }
            let Some(peer) = peers.choose(&mut rand::thread_rng()) else {
                continue;
            };
            if let Err(err) = self.network.send_to(peer, &PeerMessage::BlockRequest(id)) {
                debug!("block request failed: {}", err);
                continue;
            }
            self.state.write().mark_requested(id, now());
        }
    }
}

/// Serves inbound requests from local data
struct RequestHandlerThread {
    config: SyncConfig,
    quit: Receiver<()>,
    request_rx: Receiver<(PeerId, PeerMessage)>,
    cache: SharedBlockCache,
    chain: Box<dyn ChainStore>,
    network: Box<dyn PeerNetwork>,
}

impl RequestHandlerThread {
    fn run(self) {
        loop {
            select! {
                recv(self.quit) -> _ => break,
                recv(self.request_rx) -> request => {
                    let Ok((peer, request)) = request else { break };
                    self.serve(peer, request);
                }
            }
        }
    }

    fn serve(&self, peer: PeerId, request: PeerMessage) {
        match request {
            PeerMessage::BlockHashRequest { start, end } => {
                if end < start {
                    return;
                }
                let end = end.min(start.saturating_add(self.config.max_sync_range - 1));
                let mut infos = Vec::new();
                {
                    let cache = self.cache.read();
                    for number in start..=end {
                        if let Some(block) = cache.get_block_by_number(number) {
                            infos.push(BlockInfo {
                                number,
                                id: block.id(),
                            });
                        }
                    }
                }
                if infos.is_empty() {
                    return;
                }
                if let Err(err) = self
                    .network
                    .send_to(&peer, &PeerMessage::BlockHashResponse(infos))
                {
                    debug!("block hash response failed: {}", err);
                }
            }
            PeerMessage::BlockRequest(id) => {
                self.serve_block(&peer, &id, false);
            }
            PeerMessage::NewBlockRequest(id) => {
                self.serve_block(&peer, &id, true);
            }
            _ => warn!("request handler received a non-request message"),
        }
    }

    fn serve_block(&self, peer: &PeerId, id: &BlockId, urgent: bool) {
        let block = {
            let cache = self.cache.read();
            cache.get_block_by_hash(id)
        };
        let Some(block) = block else {
            debug!("peer {} asked for unknown block {}", peer, id);
            return;
        };
        let response = if urgent {
            PeerMessage::NewBlock(block.as_ref().clone())
        } else {
            PeerMessage::BlockResponse(block.as_ref().clone())
        };
        if let Err(err) = self.network.send_to(peer, &response) {
            debug!("block response failed: {}", err);
        }
    }
}

struct SyncManagerImpl {
    quit: Option<Sender<()>>,
    handles: Vec<JoinHandle<()>>,
}

impl SyncManager for SyncManagerImpl {
    fn stop(&mut self) {
        info!("stopping synchronizer...");
        drop(self.quit.take());
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
        info!("synchronizer stopped");
    }
}

/// Starts the synchronizer threads.
///
/// `inbound` is the channel the transport feeds raw `(peer, frame)` pairs
/// into; the returned controller exposes the incoming-block channel whose
/// sole consumer is the consensus verify loop.
pub fn start_sync_worker(
    config: SyncConfig,
    network: Box<dyn PeerNetwork>,
    inbound: PobReceiver<(PeerId, Vec<u8>)>,
    cache: SharedBlockCache,
    chain: Box<dyn ChainStore>,
) -> (Box<dyn SyncManager>, Box<dyn SyncController>) {
    let state = Arc::new(RwLock::new(SyncState::new(config)));
    let (quit_tx, quit_rx) = bounded::<()>(0);
    let (consumer_tx, consumer_rx) =
        PobChannel::new::<BlockMessage>("sync_incoming_block".to_string(), Some(config.channel_size));
    let (gossip_tx, gossip_rx) = bounded(config.channel_size);
    let (request_tx, request_rx) = bounded(config.channel_size);

    let mut handles = Vec::new();

    let dispatch = DispatchThread {
        inbound: (*inbound).clone(),
        quit: quit_rx.clone(),
        state: state.clone(),
        consumer_tx,
        gossip_tx,
        request_tx,
        deserializer: PeerMessageDeserializer::new(),
    };
    handles.push(
        std::thread::Builder::new()
            .name("sync-dispatch".into())
            .spawn(move || dispatch.run())
            .expect("failed to spawn thread: sync-dispatch"),
    );

    let height = HeightSyncThread {
        config,
        quit: quit_rx.clone(),
        cache: cache.clone(),
        network: network.clone(),
    };
    handles.push(
        std::thread::Builder::new()
            .name("sync-height".into())
            .spawn(move || height.run())
            .expect("failed to spawn thread: sync-height"),
    );

    let hashes = BlockHashSyncThread {
        config,
        quit: quit_rx.clone(),
        cache: cache.clone(),
        state: state.clone(),
        network: network.clone(),
    };
    handles.push(
        std::thread::Builder::new()
            .name("sync-block-hash".into())
            .spawn(move || hashes.run())
            .expect("failed to spawn thread: sync-block-hash"),
    );

    let blocks = BlockSyncThread {
        config,
        quit: quit_rx.clone(),
        gossip_rx,
        cache: cache.clone(),
        chain: chain.clone(),
        state: state.clone(),
        network: network.clone(),
    };
    handles.push(
        std::thread::Builder::new()
            .name("sync-block".into())
            .spawn(move || blocks.run())
            .expect("failed to spawn thread: sync-block"),
    );

    let requests = RequestHandlerThread {
        config,
        quit: quit_rx,
        request_rx,
        cache: cache.clone(),
        chain,
        network: network.clone(),
    };
    handles.push(
        std::thread::Builder::new()
            .name("sync-request-handler".into())
            .spawn(move || requests.run())
            .expect("failed to spawn thread: sync-request-handler"),
    );

    let controller = SyncControllerImpl {
        config,
        state,
        cache,
        network,
        consumer_rx,
    };
    let manager = SyncManagerImpl {
        quit: Some(quit_tx),
        handles,
    };
    (Box::new(manager), Box::new(controller))
}
