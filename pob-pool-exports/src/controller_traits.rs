// Copyright (c) 2022 MASSA LABS <info@massa.net>

use pob_models::block_id::BlockId;
use pob_models::transaction::SignedTransaction;
use pob_models::tx_id::TxId;

use crate::{LinkedBlockNotification, PoolError, TxStatus};

/// Trait defining a pool controller
pub trait PoolController: Send + Sync {
    /// Enqueues a transaction for validation and admission; never blocks
    fn add_transaction(&self, tx: SignedTransaction) -> Result<(), PoolError>;

    /// Notifies the pool that a block was linked; drives fork-aware
    /// inclusion bookkeeping
    fn notify_linked_block(&self, notification: LinkedBlockNotification) -> Result<(), PoolError>;

    /// Snapshot of the eligible transactions, best first, along with the
    /// head the snapshot is consistent with
    fn pending_snapshot(&self) -> (Vec<SignedTransaction>, Option<BlockId>);

    /// Looks a transaction up in the pending set, then on the canonical
    /// branch ending at `at` within the filter window, then in finalized
    /// history
    fn transaction_status(&self, id: &TxId, at: Option<&BlockId>) -> TxStatus;

    /// Holds the pool still while a block is generated or verified
    fn freeze(&self);

    /// Releases a [`PoolController::freeze`] hold
    fn unfreeze(&self);

    /// Number of pending transactions
    fn len(&self) -> usize;

    /// Whether the pending set is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a transaction is pending
    fn contains(&self, id: &TxId) -> bool;

    /// Returns a boxed clone of self.
    /// Useful to allow cloning `Box<dyn PoolController>`.
    fn clone_box(&self) -> Box<dyn PoolController>;
}

/// Allow cloning `Box<dyn PoolController>`
/// Uses `PoolController::clone_box` internally
impl Clone for Box<dyn PoolController> {
    fn clone(&self) -> Box<dyn PoolController> {
        self.clone_box()
    }
}

/// Pool manager used to stop the pool thread
pub trait PoolManager {
    /// Stop the pool thread
    fn stop(&mut self);
}
