// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! Deterministic in-memory execution backend.
//!
//! Executing a transaction appends its id to the view; the state roots are
//! merkle roots over the executed ids and receipt digests. Two nodes feeding
//! the same transactions in the same order therefore agree on every root,
//! which is all the consensus core needs from its execution collaborator.

use std::sync::Arc;

use parking_lot::RwLock;
use pob_hash::Hash;
use pob_models::block::compute_merkle_root;
use pob_models::block_id::BlockId;
use pob_models::prehash::PreHashMap;
use pob_models::signed::Id;
use pob_models::transaction::SignedTransaction;
use pob_signature::PublicKey;
use pob_time::PobTime;

use crate::{ExecutionController, ExecutionError, ReceiptStatus, StateView, TxReceipt};

#[derive(Debug, Clone, Default)]
struct SimSnapshot {
    tx_hashes: Vec<Hash>,
    receipt_hashes: Vec<Hash>,
    witnesses: Option<Vec<PublicKey>>,
}

#[derive(Default)]
struct SimInner {
    commits: PreHashMap<BlockId, SimSnapshot>,
}

/// Deterministic in-memory implementation of [`ExecutionController`]
#[derive(Clone)]
pub struct SimExecutionController {
    inner: Arc<RwLock<SimInner>>,
}

impl SimExecutionController {
    /// Creates a controller with an initial commit for the given root block
    pub fn new(root: BlockId, witnesses: Vec<PublicKey>) -> Self {
        let mut inner = SimInner::default();
        inner.commits.insert(
            root,
            SimSnapshot {
                witnesses: Some(witnesses),
                ..Default::default()
            },
        );
        Self {
            inner: Arc::new(RwLock::new(inner)),
        }
    }

    /// Registers a witness rotation taking effect at the state committed for
    /// `id`. Meant for tests driving epoch changes.
    pub fn set_witnesses_at(&self, id: BlockId, witnesses: Vec<PublicKey>) {
        let mut inner = self.inner.write();
        inner
            .commits
            .entry(id)
            .or_insert_with(Default::default)
            .witnesses = Some(witnesses);
    }
}

impl ExecutionController for SimExecutionController {
    fn checkout(&self, id: &BlockId) -> Result<Box<dyn StateView>, ExecutionError> {
        let inner = self.inner.read();
        if !inner.commits.contains_key(id) {
            return Err(ExecutionError::CheckoutError(format!("{}", id)));
        }
        Ok(Box::new(SimStateView {
            controller: self.inner.clone(),
            snapshot: SimSnapshot::default(),
        }))
    }

    fn has_commit(&self, id: &BlockId) -> bool {
        self.inner.read().commits.contains_key(id)
    }

    fn active_witnesses(&self, id: &BlockId) -> Option<Vec<PublicKey>> {
        self.inner
            .read()
            .commits
            .get(id)
            .and_then(|snapshot| snapshot.witnesses.clone())
    }

    fn clone_box(&self) -> Box<dyn ExecutionController> {
        Box::new(self.clone())
    }
}

struct SimStateView {
    controller: Arc<RwLock<SimInner>>,
    snapshot: SimSnapshot,
}

impl StateView for SimStateView {
    fn execute(
        &mut self,
        tx: &SignedTransaction,
        _time: PobTime,
    ) -> Result<TxReceipt, ExecutionError> {
        let receipt = TxReceipt {
            tx_id: tx.id,
            status: ReceiptStatus::Success,
            gas_used: tx.content.gas_limit / 2,
        };
        self.snapshot.tx_hashes.push(*tx.id.get_hash());
        self.snapshot.receipt_hashes.push(receipt.digest());
        Ok(receipt)
    }

    fn state_roots(&self) -> (Hash, Hash) {
        (
            compute_merkle_root(&self.snapshot.tx_hashes),
            compute_merkle_root(&self.snapshot.receipt_hashes),
        )
    }

    fn commit(&mut self, id: &BlockId) -> Result<(), ExecutionError> {
        let mut inner = self.controller.write();
        match inner.commits.get_mut(id) {
            // keep a witness rotation registered ahead of the commit
            Some(existing) => {
                existing.tx_hashes = self.snapshot.tx_hashes.clone();
                existing.receipt_hashes = self.snapshot.receipt_hashes.clone();
            }
            None => {
                inner.commits.insert(*id, self.snapshot.clone());
            }
        }
        Ok(())
    }
}
