// Copyright (c) 2022 MASSA LABS <info@massa.net>

use std::cmp::Reverse;

use pob_models::transaction::SignedTransaction;
use pob_models::tx_id::TxId;
use pob_time::PobTime;

/// Ordering key of a pending transaction: highest gas price first, then
/// oldest, then id as the final tie break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PoolTxCursor {
    inner: (Reverse<u64>, PobTime, TxId),
}

impl PoolTxCursor {
    /// The id of the transaction the cursor points at
    pub fn get_id(&self) -> TxId {
        self.inner.2
    }
}

/// Builds the pool cursor of a transaction
pub fn build_cursor(tx: &SignedTransaction) -> PoolTxCursor {
    PoolTxCursor {
        inner: (Reverse(tx.content.gas_price), tx.content.time, tx.id),
    }
}
