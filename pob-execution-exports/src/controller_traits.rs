// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::{ExecutionError, TxReceipt};
use pob_hash::Hash;
use pob_models::block_id::BlockId;
use pob_models::transaction::SignedTransaction;
use pob_signature::PublicKey;
use pob_time::PobTime;

/// A writable state view rooted at a committed snapshot.
///
/// The verifier and the producer each hold their own views; views never share
/// uncommitted writes.
pub trait StateView: Send {
    /// Executes one transaction in this view at the given block time
    fn execute(
        &mut self,
        tx: &SignedTransaction,
        time: PobTime,
    ) -> Result<TxReceipt, ExecutionError>;

    /// `(transaction merkle root, receipt merkle root)` over what this view
    /// executed since checkout
    fn state_roots(&self) -> (Hash, Hash);

    /// Commits the view under a block id, making it checkout-able
    fn commit(&mut self, id: &BlockId) -> Result<(), ExecutionError>;
}

/// Interface to the versioned execution state store
pub trait ExecutionController: Send + Sync {
    /// Opens a fresh writable view rooted at the snapshot committed for `id`
    fn checkout(&self, id: &BlockId) -> Result<Box<dyn StateView>, ExecutionError>;

    /// Whether a snapshot is already committed for `id`; lets the verifier
    /// skip re-execution of blocks it produced itself
    fn has_commit(&self, id: &BlockId) -> bool;

    /// The active witness list recorded by the state committed at `id`, if
    /// that commit changed it
    fn active_witnesses(&self, id: &BlockId) -> Option<Vec<PublicKey>>;

    /// Returns a boxed clone of self.
    /// Useful to allow cloning `Box<dyn ExecutionController>`.
    fn clone_box(&self) -> Box<dyn ExecutionController>;
}

impl Clone for Box<dyn ExecutionController> {
    fn clone(&self) -> Box<dyn ExecutionController> {
        self.clone_box()
    }
}
