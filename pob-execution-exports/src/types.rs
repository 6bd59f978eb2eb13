// Copyright (c) 2022 MASSA LABS <info@massa.net>

use pob_hash::Hash;
use pob_models::tx_id::TxId;

/// Outcome of one transaction execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiptStatus {
    /// executed successfully
    Success,
    /// execution failed, the reason is recorded on chain
    Failed(String),
}

/// Receipt of one transaction execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    /// executed transaction
    pub tx_id: TxId,
    /// outcome
    pub status: ReceiptStatus,
    /// gas consumed
    pub gas_used: u64,
}

impl TxReceipt {
    /// Stable digest of the receipt, the leaf of the receipt merkle tree
    pub fn digest(&self) -> Hash {
        let mut data = Vec::with_capacity(64);
        data.extend_from_slice(self.tx_id.to_bytes());
        match &self.status {
            ReceiptStatus::Success => data.push(0),
            ReceiptStatus::Failed(reason) => {
                data.push(1);
                data.extend_from_slice(reason.as_bytes());
            }
        }
        data.extend_from_slice(&self.gas_used.to_be_bytes());
        Hash::compute_from(&data)
    }
}
