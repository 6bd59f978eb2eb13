// Copyright (c) 2022 MASSA LABS <info@massa.net>

use std::sync::Arc;
use std::time::Instant;

use crossbeam::channel::{Receiver, RecvTimeoutError};
use parking_lot::RwLock;
use pob_consensus_exports::{ConsensusError, NodeMode};
use pob_models::block::{Block, BlockHeader, BlockHeaderSerializer};
use pob_models::block_id::BlockId;
use pob_models::prehash::PreHashSet;
use pob_models::signed::Signed;
use pob_models::timeslots::{next_sub_slot_time, slot_of_time, slot_start_time, witness_of_time};
use pob_models::transaction::SignedTransaction;
use pob_models::tx_id::TxId;
use pob_signature::KeyPair;
use pob_time::PobTime;
use tracing::{debug, info, warn};

use crate::processor::BlockProcessor;
use crate::worker::EngineShared;

/// The schedule loop: wakes on every sub-slot boundary and produces a burst
/// of blocks when this node's witness owns the slot.
pub(crate) struct ScheduleThread {
    pub(crate) processor: BlockProcessor,
    pub(crate) keypair: KeyPair,
    pub(crate) quit: Receiver<()>,
    pub(crate) shared: Arc<RwLock<EngineShared>>,
    /// held for write during a production burst, gating the verify loop
    pub(crate) produce_gate: Arc<RwLock<()>>,
}

enum Waiting {
    Reached,
    Quit,
}

impl ScheduleThread {
    /// Waits until `deadline` unless the engine stops first
    fn wait_until(&self, deadline: Instant) -> Waiting {
        match self.quit.recv_deadline(deadline) {
            Ok(()) => Waiting::Quit,
            Err(RecvTimeoutError::Timeout) => Waiting::Reached,
            Err(RecvTimeoutError::Disconnected) => Waiting::Quit,
        }
    }

    fn next_schedule(&self) -> Result<Instant, ConsensusError> {
        let now = PobTime::now()?;
        Ok(next_sub_slot_time(now).estimate_instant()?)
    }

    pub(crate) fn run(self) {
        let our_key = self.keypair.get_public_key();
        let mut slot_flag: Option<u64> = None;
        loop {
            let deadline = match self.next_schedule() {
                Ok(deadline) => deadline,
                Err(err) => {
                    warn!("could not compute the next schedule: {}", err);
                    return;
                }
            };
            if let Waiting::Quit = self.wait_until(deadline) {
                return;
            }
            // step just past the boundary so slot arithmetic lands inside it
            std::thread::sleep(std::time::Duration::from_millis(1));

            let catching_up = self.processor.channels.sync.is_catching_up();
            self.shared.write().mode = if catching_up {
                NodeMode::Sync
            } else {
                NodeMode::Normal
            };
            if catching_up {
                continue;
            }

            let Ok(now) = PobTime::now() else { continue };
            let window = slot_of_time(now).window;
            if slot_flag == Some(window) {
                continue;
            }

            // the active set is frozen at the slot's first sub-slot
            let (head_id, witness_list) = {
                let cache = self.processor.cache.read();
                let head = cache.head();
                (cache.head_id(), head.witness_list.clone())
            };
            if witness_of_time(now, witness_list.as_slice()) != Some(&our_key) {
                continue;
            }

            slot_flag = Some(window);
            let _gate = self.produce_gate.write();
            self.produce_burst(head_id, &our_key);
        }
    }

    /// Produces up to `block_num_per_witness` blocks, one per sub-slot,
    /// re-checking the schedule between blocks.
    pub(crate) fn produce_burst(&self, mut head_id: BlockId, our_key: &pob_signature::PublicKey) {
        let config = &self.processor.config;
        let mut burst_included: PreHashSet<TxId> = Default::default();
        let (mut pending, pool_head) = self.processor.channels.pool.pending_snapshot();
        if let Some(pool_head) = pool_head {
            if self.processor.cache.read().contains(&pool_head) {
                head_id = pool_head;
            }
        }

        for num in 0..config.block_num_per_witness {
            match self.produce_one(num, head_id, &pending, &mut burst_included) {
                Ok(id) => head_id = id,
                Err(err) => {
                    warn!("block production failed at sub-slot {}: {}", num, err);
                    break;
                }
            }
            if num == config.block_num_per_witness - 1 {
                break;
            }

            let deadline = match self.next_schedule() {
                Ok(deadline) => deadline,
                Err(_) => break,
            };
            if let Waiting::Quit = self.wait_until(deadline) {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(1));

            let (refreshed, _) = self.processor.channels.pool.pending_snapshot();
            pending = refreshed;
            let witness_list = {
                let cache = self.processor.cache.read();
                cache.head().witness_list.clone()
            };
            let Ok(now) = PobTime::now() else { break };
            if witness_of_time(now, witness_list.as_slice()) != Some(our_key) {
                // the slot moved on without us
                break;
            }
        }
    }

    /// Builds, signs, broadcasts and self-ingests one block on `head_id`.
    pub(crate) fn produce_one(
        &self,
        num: u64,
        head_id: BlockId,
        pending: &[SignedTransaction],
        burst_included: &mut PreHashSet<TxId>,
    ) -> Result<BlockId, ConsensusError> {
        let config = &self.processor.config;
        let channels = &self.processor.channels;
        let limit = if num >= config.block_num_per_witness - 2 {
            config.last2_gen_block_time
        } else {
            config.gen_block_time
        };

        let head_block = {
            let cache = self.processor.cache.read();
            cache
                .find(&head_id)
                .map(|node| node.block.clone())
                .ok_or(ConsensusError::ChannelError(
                    "production head vanished from the cache".to_string(),
                ))?
        };

        let now = PobTime::now()?;
        let started = Instant::now();
        let mut view = channels.execution.checkout(&head_id)?;
        channels.pool.freeze();
        let mut included = Vec::new();
        let mut gas_usage = 0u64;
        for tx in pending {
            if started.elapsed() >= limit.to_duration() {
                break;
            }
            if burst_included.contains(&tx.id) || tx.content.expiration <= now {
                continue;
            }
            match view.execute(tx, now) {
                Ok(receipt) => {
                    gas_usage = gas_usage.saturating_add(receipt.gas_used);
                    burst_included.insert(tx.id);
                    included.push(tx.clone());
                }
                Err(err) => {
                    debug!("skipping failing transaction {}: {}", tx.id, err);
                }
            }
        }
        channels.pool.unfreeze();

        let (tx_merkle_root, receipt_merkle_root) = view.state_roots();
        let time = slot_start_time(slot_of_time(now));
        let header = BlockHeader {
            number: head_block.number() + 1,
            parent: head_id,
            witness: self.keypair.get_public_key(),
            time,
            tx_merkle_root,
            receipt_merkle_root,
            gas_usage,
            info: Vec::new(),
        };
        let block = Block {
            header: Signed::new_signed(header, &BlockHeaderSerializer::new(), &self.keypair)?,
            transactions: included,
        };
        let id = block.id();

        // commit under the new id first: the self-ingest below then skips
        // re-execution
        view.commit(&id)?;

        channels.sync.broadcast_block(&block)?;
        info!(
            "Gen block - @{} num:{}, t:{}, txs:{}, confirmed:{}",
            num,
            block.number(),
            block.time(),
            block.transactions.len(),
            self.processor.cache.read().linked_root().number(),
        );
        self.processor.handle_recv_block(block, false)?;
        Ok(id)
    }
}
