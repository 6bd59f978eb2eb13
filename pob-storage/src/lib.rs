// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! Interface to the finalized-history store, plus a shared in-memory
//! implementation.
//!
//! The real node persists finalized blocks in an on-disk store that lives
//! outside the consensus core; the core only depends on the small surface
//! below. `MemChainStore` backs tests and disk-less nodes.

#![warn(missing_docs)]

use std::collections::BTreeMap;
use std::sync::Arc;

use displaydoc::Display;
use parking_lot::RwLock;
use pob_models::block::Block;
use pob_models::block_id::BlockId;
use pob_models::prehash::PreHashMap;
use thiserror::Error;

/// Errors of the chain store
#[non_exhaustive]
#[derive(Display, Error, Debug, Clone)]
pub enum StorageError {
    /// finalized block {0} does not extend the stored history
    DiscontinuousHistory(String),
    /// io error: {0}
    IoError(String),
}

/// Interface to the store of finalized blocks
pub trait ChainStore: Send + Sync {
    /// Height of the latest finalized block
    fn head_number(&self) -> u64;

    /// A finalized block by id
    fn get_block(&self, id: &BlockId) -> Option<Arc<Block>>;

    /// A finalized block by height
    fn get_block_by_number(&self, number: u64) -> Option<Arc<Block>>;

    /// Whether a finalized block with this id exists
    fn contains(&self, id: &BlockId) -> bool;

    /// Appends newly finalized blocks, in chain order
    fn push_finalized(&self, blocks: Vec<Arc<Block>>) -> Result<(), StorageError>;

    /// Returns a boxed clone of self.
    /// Useful to allow cloning `Box<dyn ChainStore>`.
    fn clone_box(&self) -> Box<dyn ChainStore>;
}

impl Clone for Box<dyn ChainStore> {
    fn clone(&self) -> Box<dyn ChainStore> {
        self.clone_box()
    }
}

#[derive(Default)]
struct ChainIndexes {
    by_id: PreHashMap<BlockId, Arc<Block>>,
    by_number: BTreeMap<u64, BlockId>,
}

/// Shared in-memory implementation of [`ChainStore`]
#[derive(Clone, Default)]
pub struct MemChainStore {
    inner: Arc<RwLock<ChainIndexes>>,
}

impl MemChainStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Default::default()
    }

    /// Creates a store seeded with a genesis block
    pub fn with_genesis(genesis: Arc<Block>) -> Self {
        let store = Self::new();
        let mut inner = store.inner.write();
        inner.by_number.insert(genesis.number(), genesis.id());
        inner.by_id.insert(genesis.id(), genesis);
        drop(inner);
        store
    }
}

impl ChainStore for MemChainStore {
    fn head_number(&self) -> u64 {
        self.inner
            .read()
            .by_number
            .last_key_value()
            .map(|(number, _)| *number)
            .unwrap_or(0)
    }

    fn get_block(&self, id: &BlockId) -> Option<Arc<Block>> {
        self.inner.read().by_id.get(id).cloned()
    }

    fn get_block_by_number(&self, number: u64) -> Option<Arc<Block>> {
        let inner = self.inner.read();
        inner
            .by_number
            .get(&number)
            .and_then(|id| inner.by_id.get(id).cloned())
    }

    fn contains(&self, id: &BlockId) -> bool {
        self.inner.read().by_id.contains_key(id)
    }

    fn push_finalized(&self, blocks: Vec<Arc<Block>>) -> Result<(), StorageError> {
        let mut inner = self.inner.write();
        for block in blocks {
            if let Some((last_number, last_id)) = inner.by_number.last_key_value() {
                if block.number() != last_number + 1 || block.parent() != *last_id {
                    return Err(StorageError::DiscontinuousHistory(format!(
                        "block {} at height {}",
                        block.id(),
                        block.number()
                    )));
                }
            }
            inner.by_number.insert(block.number(), block.id());
            inner.by_id.insert(block.id(), block);
        }
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn ChainStore> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pob_models::block::{BlockHeader, BlockHeaderSerializer};
    use pob_models::signed::Signed;
    use pob_signature::{Algorithm, KeyPair};
    use pob_time::PobTime;

    fn make_block(keypair: &KeyPair, number: u64, parent: BlockId) -> Arc<Block> {
        let header = BlockHeader {
            number,
            parent,
            witness: keypair.get_public_key(),
            time: PobTime::from_millis(number * 500),
            tx_merkle_root: pob_models::block::compute_merkle_root(&[]),
            receipt_merkle_root: pob_models::block::compute_merkle_root(&[]),
            gas_usage: 0,
            info: Vec::new(),
        };
        Arc::new(Block {
            header: Signed::new_signed(header, &BlockHeaderSerializer::new(), keypair).unwrap(),
            transactions: Vec::new(),
        })
    }

    #[test]
    fn test_push_and_lookup() {
        let keypair = KeyPair::generate(Algorithm::Ed25519);
        let genesis = Block::genesis(&keypair, PobTime::from_millis(0)).unwrap();
        let genesis = Arc::new(genesis);
        let store = MemChainStore::with_genesis(genesis.clone());

        let b1 = make_block(&keypair, 1, genesis.id());
        store.push_finalized(vec![b1.clone()]).unwrap();

        assert_eq!(store.head_number(), 1);
        assert!(store.contains(&b1.id()));
        assert_eq!(store.get_block(&b1.id()).unwrap().id(), b1.id());
        assert_eq!(store.get_block_by_number(1).unwrap().id(), b1.id());
    }

    #[test]
    fn test_rejects_gap() {
        let keypair = KeyPair::generate(Algorithm::Ed25519);
        let genesis = Arc::new(Block::genesis(&keypair, PobTime::from_millis(0)).unwrap());
        let store = MemChainStore::with_genesis(genesis.clone());

        let b2 = make_block(&keypair, 2, genesis.id());
        assert!(store.push_finalized(vec![b2]).is_err());
    }

    #[test]
    fn test_shared_view() {
        let keypair = KeyPair::generate(Algorithm::Ed25519);
        let genesis = Arc::new(Block::genesis(&keypair, PobTime::from_millis(0)).unwrap());
        let store = MemChainStore::with_genesis(genesis.clone());
        let cloned = store.clone_box();

        let b1 = make_block(&keypair, 1, genesis.id());
        store.push_finalized(vec![b1.clone()]).unwrap();
        assert!(cloned.contains(&b1.id()));
    }
}
