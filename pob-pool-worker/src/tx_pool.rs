// Copyright (c) 2022 MASSA LABS <info@massa.net>

use std::collections::BTreeSet;

use pob_block_cache::SharedBlockCache;
use pob_models::block_id::BlockId;
use pob_models::prehash::{PreHashMap, PreHashSet};
use pob_models::transaction::SignedTransaction;
use pob_models::tx_id::TxId;
use pob_pool_exports::{BlockTxSummary, LinkedBlockNotification, PoolConfig, TxStatus};
use pob_storage::ChainStore;
use pob_time::PobTime;
use tracing::{debug, warn};

use crate::types::{build_cursor, PoolTxCursor};

struct BlockRecord {
    parent: BlockId,
    time: PobTime,
    txs: PreHashSet<TxId>,
}

impl From<&BlockTxSummary> for BlockRecord {
    fn from(summary: &BlockTxSummary) -> Self {
        BlockRecord {
            parent: summary.parent,
            time: summary.time,
            txs: summary.txs.iter().copied().collect(),
        }
    }
}

/// The pool state proper. One worker thread mutates it under the shared
/// write lock; controllers only read.
pub(crate) struct TxPool {
    config: PoolConfig,
    pending: PreHashMap<TxId, SignedTransaction>,
    sorted: BTreeSet<PoolTxCursor>,
    block_list: PreHashMap<BlockId, BlockRecord>,
    new_head: Option<BlockTxSummary>,
    old_head: Option<BlockTxSummary>,
    cache: SharedBlockCache,
    chain: Box<dyn ChainStore>,
}

impl TxPool {
    pub(crate) fn new(
        config: PoolConfig,
        cache: SharedBlockCache,
        chain: Box<dyn ChainStore>,
    ) -> Self {
        let mut pool = TxPool {
            config,
            pending: Default::default(),
            sorted: Default::default(),
            block_list: Default::default(),
            new_head: None,
            old_head: None,
            cache,
            chain,
        };
        pool.init_block_list();
        pool
    }

    /// Preloads the recent finalized blocks into the inclusion index so that
    /// duplicate filtering covers history from the first tick.
    fn init_block_list(&mut self) {
        let now = match PobTime::now() {
            Ok(now) => now,
            Err(_) => return,
        };
        let mut number = self.chain.head_number();
        loop {
            let Some(block) = self.chain.get_block_by_number(number) else {
                break;
            };
            if now.saturating_sub(block.time()) > self.config.filter_time {
                break;
            }
            let summary = BlockTxSummary::from(block.as_ref());
            self.block_list.insert(summary.id, BlockRecord::from(&summary));
            if number == 0 {
                break;
            }
            number -= 1;
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn contains(&self, id: &TxId) -> bool {
        self.pending.contains_key(id)
    }

    pub(crate) fn head_id(&self) -> Option<BlockId> {
        self.new_head.as_ref().map(|head| head.id)
    }

    /// Snapshot of the eligible transactions, best cursor first
    pub(crate) fn pending_snapshot(&self) -> (Vec<SignedTransaction>, Option<BlockId>) {
        let txs = self
            .sorted
            .iter()
            .filter_map(|cursor| self.pending.get(&cursor.get_id()).cloned())
            .collect();
        (txs, self.head_id())
    }

    pub(crate) fn transaction_status(&self, id: &TxId, at: Option<&BlockId>) -> TxStatus {
        if self.pending.contains_key(id) {
            return TxStatus::Pending;
        }
        let at = at.copied().or_else(|| self.head_id());
        match at {
            Some(at) if self.exists_on_branch(id, &at) => TxStatus::OnChain,
            _ => TxStatus::NotFound,
        }
    }

    fn tx_timed_out(&self, tx: &SignedTransaction, now: PobTime) -> bool {
        tx.content.expiration <= now
            || now.saturating_sub(tx.content.time) > self.config.tx_expiration
    }

    /// Admission: signature validity, expiry windows, then dedup against the
    /// pending set and the recent canonical branch.
    pub(crate) fn add_transaction(&mut self, tx: SignedTransaction, now: PobTime) {
        if self.tx_timed_out(&tx, now) {
            debug!("dropping timed out transaction {}", tx.id);
            return;
        }
        if let Err(err) = tx.verify_integrity() {
            warn!("dropping invalid transaction {}: {}", tx.id, err);
            return;
        }
        self.insert_pending(tx);
    }

    /// Inserts without re-validating; shared by admission and reorg replay
    fn insert_pending(&mut self, tx: SignedTransaction) {
        if self.pending.contains_key(&tx.id) {
            return;
        }
        if let Some(head) = self.head_id() {
            if self.exists_on_branch(&tx.id, &head) {
                return;
            }
        }
        self.sorted.insert(build_cursor(&tx));
        self.pending.insert(tx.id, tx);

        while self.pending.len() > self.config.max_pool_size {
            let worst = *self.sorted.iter().next_back().expect("sorted set drained");
            self.sorted.remove(&worst);
            self.pending.remove(&worst.get_id());
        }
    }

    fn remove_pending(&mut self, id: &TxId) {
        if let Some(tx) = self.pending.remove(id) {
            self.sorted.remove(&build_cursor(&tx));
        }
    }

    /// Walks the branch ending at `at` through the inclusion index, within
    /// the filter window of the branch tip.
    fn exists_on_branch(&self, id: &TxId, at: &BlockId) -> bool {
        let Some(tip) = self.block_list.get(at) else {
            return false;
        };
        let tip_time = tip.time;
        let mut cursor = *at;
        loop {
            let Some(record) = self.block_list.get(&cursor) else {
                return false;
            };
            if record.txs.contains(id) {
                return true;
            }
            if tip_time.saturating_sub(record.time) > self.config.filter_time {
                return false;
            }
            cursor = record.parent;
        }
    }

    fn record_block(&mut self, summary: &BlockTxSummary) {
        self.block_list
            .entry(summary.id)
            .or_insert_with(|| BlockRecord::from(summary));
    }

    /// Ensures a block is in the inclusion index, pulling it from the cache
    /// or the finalized store when the pool has not seen it; returns its
    /// parent and time.
    fn ensure_recorded(&mut self, id: &BlockId) -> Option<(BlockId, PobTime)> {
        if let Some(record) = self.block_list.get(id) {
            return Some((record.parent, record.time));
        }
        let block = {
            let cache = self.cache.read();
            cache.get_block_by_hash(id)
        }?;
        let summary = BlockTxSummary::from(block.as_ref());
        let result = (summary.parent, summary.time);
        self.record_block(&summary);
        Some(result)
    }

    /// Deepest common ancestor of two branch tips, searched no deeper than
    /// the filter window below either tip.
    fn find_fork_point(&mut self, new_id: &BlockId, old_id: &BlockId) -> Option<BlockId> {
        let (_, old_tip_time) = self.ensure_recorded(old_id)?;
        let mut old_branch = PreHashSet::default();
        let mut cursor = *old_id;
        loop {
            old_branch.insert(cursor);
            let Some((parent, time)) = self.ensure_recorded(&cursor) else {
                break;
            };
            if old_tip_time.saturating_sub(time) > self.config.filter_time
                || old_branch.contains(&parent)
            {
                break;
            }
            cursor = parent;
        }

        let (_, new_tip_time) = self.ensure_recorded(new_id)?;
        let mut cursor = *new_id;
        loop {
            if old_branch.contains(&cursor) {
                return Some(cursor);
            }
            let (parent, time) = self.ensure_recorded(&cursor)?;
            if new_tip_time.saturating_sub(time) > self.config.filter_time {
                return None;
            }
            cursor = parent;
        }
    }

    /// Straight extension: drop the txs the new canonical block includes
    fn apply_extension(&mut self, head: &BlockTxSummary) {
        for id in &head.txs {
            self.remove_pending(id);
        }
    }

    /// Reorg: replay the abandoned branch into the pending set, then drop
    /// everything the new branch includes.
    fn apply_reorg(&mut self, fork_point: BlockId, now: PobTime) {
        let (old_tip, new_tip) = match (&self.old_head, &self.new_head) {
            (Some(old), Some(new)) => (old.id, new.id),
            _ => return,
        };

        // replay txs of the abandoned branch
        let mut cursor = old_tip;
        while cursor != fork_point {
            let block = {
                let cache = self.cache.read();
                cache.get_block_by_hash(&cursor)
            };
            let Some(block) = block else {
                warn!("abandoned branch block {} unavailable, flushing pool", cursor);
                self.flush();
                return;
            };
            for tx in &block.transactions {
                if !self.tx_timed_out(tx, now) {
                    self.insert_pending(tx.clone());
                }
            }
            cursor = block.parent();
        }

        // drop txs now included on the new canonical branch
        let mut cursor = new_tip;
        while cursor != fork_point {
            let Some(record) = self.block_list.get(&cursor) else {
                warn!("new branch block {} unrecorded, flushing pool", cursor);
                self.flush();
                return;
            };
            let txs: Vec<TxId> = record.txs.iter().copied().collect();
            let parent = record.parent;
            for id in &txs {
                self.remove_pending(id);
            }
            cursor = parent;
        }
    }

    pub(crate) fn flush(&mut self) {
        self.pending.clear();
        self.sorted.clear();
    }

    /// Fork-aware bookkeeping on each linked block, the pool-side half of
    /// the consensus linking sequence.
    pub(crate) fn handle_linked(&mut self, notification: LinkedBlockNotification, now: PobTime) {
        self.record_block(&notification.linked);
        self.record_block(&notification.head);

        let head = notification.head;
        match self.new_head.take() {
            None => {
                self.apply_extension(&head);
                self.new_head = Some(head);
            }
            Some(previous) if previous.id == head.id => {
                // a side branch was linked, the canonical tip is unchanged
                self.new_head = Some(previous);
            }
            Some(previous) if previous.id == head.parent => {
                self.apply_extension(&head);
                self.new_head = Some(head);
            }
            Some(previous) => {
                let old_id = previous.id;
                self.old_head = Some(previous);
                self.new_head = Some(head.clone());
                match self.find_fork_point(&head.id, &old_id) {
                    Some(fork_point) => {
                        debug!(
                            "canonical branch changed, replaying from fork point {}",
                            fork_point
                        );
                        self.apply_reorg(fork_point, now);
                    }
                    None => {
                        warn!("fork point not found, flushing the pending set");
                        self.flush();
                    }
                }
            }
        }
    }

    /// Periodic sweep: expired transactions out of the pending set, stale
    /// records out of the inclusion index.
    pub(crate) fn sweep(&mut self, now: PobTime) {
        let expired: Vec<TxId> = self
            .pending
            .iter()
            .filter(|(_, tx)| self.tx_timed_out(tx, now))
            .map(|(id, _)| *id)
            .collect();
        for id in expired {
            self.remove_pending(&id);
        }

        let horizon = self
            .new_head
            .as_ref()
            .map(|head| head.time)
            .unwrap_or(now)
            .saturating_sub(self.config.filter_time);
        self.block_list.retain(|_, record| record.time >= horizon);
    }
}
