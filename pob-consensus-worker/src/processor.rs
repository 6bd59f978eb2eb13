// Copyright (c) 2022 MASSA LABS <info@massa.net>

use std::sync::Arc;

use pob_block_cache::{NodeKind, SharedBlockCache};
use pob_consensus_exports::{ConsensusChannels, ConsensusError, PobConfig};
use pob_execution_exports::StateView;
use pob_models::block::Block;
use pob_models::block_id::BlockId;
use pob_models::timeslots::{sub_slot_index, witness_of_time};
use pob_pool_exports::{BlockTxSummary, LinkedBlockNotification};
use pob_signature::PublicKey;
use pob_time::PobTime;
use tracing::{debug, info, warn};

/// Carries one block through verification, linking, LIB advancement and
/// pool notification. Shared by the verify loop and the producer's
/// self-ingest path so that self-produced blocks travel the same way as
/// received ones.
#[derive(Clone)]
pub(crate) struct BlockProcessor {
    pub(crate) config: PobConfig,
    pub(crate) channels: ConsensusChannels,
    pub(crate) cache: SharedBlockCache,
    pub(crate) our_key: PublicKey,
}

impl BlockProcessor {
    /// The ingest path every block takes: duplicate check, basic checks,
    /// insertion as Single, then linking if the parent is already linked.
    pub(crate) fn handle_recv_block(
        &self,
        block: Block,
        replay: bool,
    ) -> Result<(), ConsensusError> {
        let block = Arc::new(block);
        let id = block.id();

        if self.cache.read().contains(&id) {
            return Err(ConsensusError::Duplicate(id));
        }

        self.verify_basics(&block)?;

        let parent_linked = {
            let mut cache = self.cache.write();
            cache.add(block.clone())?;
            matches!(
                cache.find(&block.parent()).map(|node| node.kind),
                Some(NodeKind::Linked)
            )
        };
        if !parent_linked {
            return Err(ConsensusError::Single(id));
        }
        self.add_existing_block(id, replay)
    }

    /// Stateless checks: witness signature over the header hash, sub-slot
    /// alignment, and a bounded clock for gossip blocks.
    fn verify_basics(&self, block: &Block) -> Result<(), ConsensusError> {
        block
            .header
            .verify_signature()
            .map_err(|err| ConsensusError::VerifyBasics(format!("witness signature: {}", err)))?;
        if block.witness() != &block.header.creator_public_key {
            return Err(ConsensusError::VerifyBasics(
                "declared witness differs from the signing key".to_string(),
            ));
        }
        if block.time().to_nanos() % self.config.sub_slot_time.to_nanos() != 0 {
            return Err(ConsensusError::VerifyBasics(
                "block time is not a sub-slot boundary".to_string(),
            ));
        }
        let now = PobTime::now()?;
        if sub_slot_index(block.time()) > sub_slot_index(now) + 1 {
            return Err(ConsensusError::VerifyBasics(format!(
                "block time {} is in the future",
                block.time()
            )));
        }
        Ok(())
    }

    /// Links a block whose parent is linked, then recursively links every
    /// child that became linkable. The first block's error propagates;
    /// child failures are logged and skipped, their peers will resync.
    pub(crate) fn add_existing_block(
        &self,
        id: BlockId,
        replay: bool,
    ) -> Result<(), ConsensusError> {
        let mut queue = vec![id];
        let mut first = None;
        while let Some(next) = queue.pop() {
            match self.link_one(next, replay) {
                Ok(children) => queue.extend(children),
                Err(err) if next == id => first = Some(err),
                Err(err) => {
                    warn!("failed to link descendant block {}: {}", next, err);
                }
            }
        }
        match first {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn link_one(&self, id: BlockId, replay: bool) -> Result<Vec<BlockId>, ConsensusError> {
        let (block, parent_id, witness_list, serial_num) = {
            let cache = self.cache.read();
            let node = cache
                .find(&id)
                .ok_or(ConsensusError::BlockCacheError(
                    pob_block_cache::BlockCacheError::NotFound(id),
                ))?;
            let block = node.block.clone();
            let parent_id = block.parent();
            let parent = cache.find(&parent_id).ok_or(ConsensusError::Single(id))?;
            if parent.kind != NodeKind::Linked {
                return Err(ConsensusError::Single(id));
            }
            let serial_num = cache.serial_num_for(&block)?;
            (block, parent_id, parent.witness_list.clone(), serial_num)
        };

        // the parent's active witness set assigns the slot
        if witness_of_time(block.time(), witness_list.as_slice()) != Some(block.witness()) {
            self.cache.write().del(&id)?;
            return Err(ConsensusError::VerifyBasics(format!(
                "witness not scheduled at time {}",
                block.time()
            )));
        }

        if serial_num >= self.config.block_num_per_witness {
            // the node stays in the cache, permanently unlinked
            return Err(ConsensusError::OutOfLimit(id));
        }

        // replay the transactions unless the state store already carries a
        // commit for this block (the producer commits before self-ingest)
        if !self.channels.execution.has_commit(&id) {
            let mut view = self.channels.execution.checkout(&parent_id)?;
            self.channels.pool.freeze();
            let replayed = self.replay_transactions(view.as_mut(), &block);
            self.channels.pool.unfreeze();
            if let Err(err) = replayed {
                warn!(
                    "block verification failed, num: {}, id: {}: {}",
                    block.number(),
                    id,
                    err
                );
                self.cache.write().del(&id)?;
                return Err(err);
            }
            view.commit(&id)?;
        }

        let witness_update = self.channels.execution.active_witnesses(&id);
        let (children, head_block) = {
            let mut cache = self.cache.write();
            let children = cache.link(&id, serial_num, witness_update, replay)?;
            cache.update_lib()?;
            (children, cache.head().block.clone())
        };

        // the pool must see the link only after the LIB advanced
        self.channels.pool.notify_linked_block(LinkedBlockNotification {
            linked: BlockTxSummary::from(block.as_ref()),
            head: BlockTxSummary::from(head_block.as_ref()),
        })?;

        let on_overlay = {
            let cache = self.cache.read();
            cache.head().witness_list.contains(&self.our_key)
        };
        self.channels.sync.connect_bp_overlay(on_overlay);

        if block.witness() != &self.our_key {
            info!(
                "Rec block - @{} num:{}, t:{}, txs:{}, confirmed:{}",
                serial_num,
                block.number(),
                block.time(),
                block.transactions.len(),
                self.cache.read().linked_root().number(),
            );
        } else {
            debug!("linked own block num:{}, id:{}", block.number(), id);
        }

        Ok(children)
    }

    /// Re-executes the block's transactions on the parent state and checks
    /// the resulting roots against the header.
    fn replay_transactions(
        &self,
        view: &mut dyn StateView,
        block: &Block,
    ) -> Result<(), ConsensusError> {
        let mut gas_usage = 0u64;
        for tx in &block.transactions {
            tx.verify_integrity()
                .map_err(|err| ConsensusError::VerifyState(format!("transaction: {}", err)))?;
            if tx.content.expiration <= block.time() {
                return Err(ConsensusError::VerifyState(format!(
                    "transaction {} expired before the block time",
                    tx.id
                )));
            }
            let receipt = view.execute(tx, block.time())?;
            gas_usage = gas_usage.saturating_add(receipt.gas_used);
        }
        let (tx_root, receipt_root) = view.state_roots();
        if tx_root != block.header.content.tx_merkle_root {
            return Err(ConsensusError::VerifyState(
                "transaction merkle root mismatch".to_string(),
            ));
        }
        if receipt_root != block.header.content.receipt_merkle_root {
            return Err(ConsensusError::VerifyState(
                "receipt merkle root mismatch".to_string(),
            ));
        }
        Ok(())
    }
}
