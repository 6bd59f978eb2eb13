// Copyright (c) 2022 MASSA LABS <info@massa.net>

use std::collections::{BTreeMap, HashMap};

use pob_models::block_id::BlockId;
use pob_models::prehash::PreHashMap;
use pob_sync_exports::{BlockInfo, PeerId, SyncConfig};
use pob_time::PobTime;

/// One advertised block hash and the peers that can serve it
pub(crate) struct KnownHash {
    pub(crate) id: BlockId,
    pub(crate) peers: Vec<PeerId>,
}

/// Table shared by the synchronizer loops
pub(crate) struct SyncState {
    config: SyncConfig,
    neighbor_heights: HashMap<PeerId, (u64, PobTime)>,
    known_hashes: BTreeMap<u64, KnownHash>,
    requested: PreHashMap<BlockId, PobTime>,
}

impl SyncState {
    pub(crate) fn new(config: SyncConfig) -> Self {
        Self {
            config,
            neighbor_heights: HashMap::new(),
            known_hashes: BTreeMap::new(),
            requested: Default::default(),
        }
    }

    pub(crate) fn record_height(&mut self, peer: PeerId, height: u64, now: PobTime) {
        self.neighbor_heights.insert(peer, (height, now));
    }

    /// Highest height reported within the expiry window
    pub(crate) fn neighbor_height(&self, now: PobTime) -> u64 {
        self.neighbor_heights
            .values()
            .filter(|(_, at)| now.saturating_sub(*at) <= self.config.height_expiry)
            .map(|(height, _)| *height)
            .max()
            .unwrap_or(0)
    }

    /// Peers that recently reported at least the given height
    pub(crate) fn peers_at_least(&self, height: u64, now: PobTime) -> Vec<PeerId> {
        self.neighbor_heights
            .iter()
            .filter(|(_, (peer_height, at))| {
                *peer_height >= height && now.saturating_sub(*at) <= self.config.height_expiry
            })
            .map(|(peer, _)| peer.clone())
            .collect()
    }

    pub(crate) fn record_hashes(&mut self, peer: &PeerId, infos: Vec<BlockInfo>) {
        for info in infos {
            let entry = self.known_hashes.entry(info.number).or_insert(KnownHash {
                id: info.id,
                peers: Vec::new(),
            });
            if entry.id == info.id && !entry.peers.contains(peer) {
                entry.peers.push(peer.clone());
            }
        }
    }

    /// Advertised hashes in a height range, in height order
    pub(crate) fn hashes_in_range(&self, start: u64, end: u64) -> Vec<(u64, BlockId, Vec<PeerId>)> {
        self.known_hashes
            .range(start..=end)
            .map(|(number, known)| (*number, known.id, known.peers.clone()))
            .collect()
    }

    /// First height in `[start, end]` with no advertisement yet, used to
    /// avoid re-requesting spans that are already satisfied
    pub(crate) fn first_unknown_in(&self, start: u64, end: u64) -> Option<u64> {
        (start..=end).find(|number| !self.known_hashes.contains_key(number))
    }

    pub(crate) fn forget_below(&mut self, height: u64) {
        self.known_hashes = self.known_hashes.split_off(&height);
    }

    pub(crate) fn forget_hash(&mut self, number: u64) {
        self.known_hashes.remove(&number);
    }

    pub(crate) fn mark_requested(&mut self, id: BlockId, now: PobTime) {
        self.requested.insert(id, now);
        // bound the outstanding-request table
        if self.requested.len() > (self.config.max_sync_range as usize) * 2 {
            let retry = self.config.request_retry;
            self.requested
                .retain(|_, at| now.saturating_sub(*at) <= retry);
        }
    }

    pub(crate) fn recently_requested(&self, id: &BlockId, now: PobTime) -> bool {
        match self.requested.get(id) {
            Some(at) => now.saturating_sub(*at) <= self.config.request_retry,
            None => false,
        }
    }
}
