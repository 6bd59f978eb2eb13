// Copyright (c) 2022 MASSA LABS <info@massa.net>

use pob_models::block::Block;
use pob_models::block_id::BlockId;
use pob_models::tx_id::TxId;
use pob_time::PobTime;

/// Where a transaction was found when queried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    /// unknown to the pool and the recent canonical branch
    NotFound,
    /// waiting in the pending set
    Pending,
    /// included on the recent canonical branch or in finalized history
    OnChain,
}

/// Inclusion summary of one block, what the pool tracks per block
#[derive(Debug, Clone)]
pub struct BlockTxSummary {
    /// block id
    pub id: BlockId,
    /// parent block id
    pub parent: BlockId,
    /// block height
    pub number: u64,
    /// block production time
    pub time: PobTime,
    /// ids of the transactions the block includes
    pub txs: Vec<TxId>,
}

impl From<&Block> for BlockTxSummary {
    fn from(block: &Block) -> Self {
        BlockTxSummary {
            id: block.id(),
            parent: block.parent(),
            number: block.number(),
            time: block.time(),
            txs: block.tx_ids(),
        }
    }
}

/// Sent by the consensus engine after a block was linked and the LIB updated
#[derive(Debug, Clone)]
pub struct LinkedBlockNotification {
    /// the newly linked block
    pub linked: BlockTxSummary,
    /// the cache head after the link
    pub head: BlockTxSummary,
}
