// Copyright (c) 2022 MASSA LABS <info@massa.net>

use std::sync::Arc;

use parking_lot::RwLock;
use pob_block_cache::{BlockCache, BlockCacheConfig, SharedBlockCache};
use pob_models::block::{compute_merkle_root, Block, BlockHeader, BlockHeaderSerializer};
use pob_models::block_id::BlockId;
use pob_models::signed::{Id, Signed};
use pob_models::transaction::{
    SignedTransaction, Transaction, TransactionSerializer,
};
use pob_pool_exports::{BlockTxSummary, PoolConfig};
use pob_signature::{Algorithm, KeyPair};
use pob_storage::{ChainStore, MemChainStore};
use pob_time::PobTime;

use crate::tx_pool::TxPool;

/// Base absolute time used by the deterministic pool tests
pub fn base_time() -> PobTime {
    PobTime::from_secs(1_000_000)
}

/// Transaction generator in the style of the block production path
pub struct TxGenerator {
    keypair: KeyPair,
    gas_price: u64,
    time: PobTime,
    expiration: PobTime,
}

impl Default for TxGenerator {
    fn default() -> Self {
        Self {
            keypair: KeyPair::generate(Algorithm::Ed25519),
            gas_price: 100,
            time: base_time(),
            expiration: base_time().saturating_add(PobTime::from_secs(60)),
        }
    }
}

impl TxGenerator {
    pub fn gas_price(mut self, gas_price: u64) -> Self {
        self.gas_price = gas_price;
        self
    }

    pub fn time(mut self, time: PobTime) -> Self {
        self.time = time;
        self
    }

    pub fn expiration(mut self, expiration: PobTime) -> Self {
        self.expiration = expiration;
        self
    }

    pub fn generate(&self) -> SignedTransaction {
        Signed::new_signed(
            Transaction {
                time: self.time,
                expiration: self.expiration,
                gas_price: self.gas_price,
                gas_limit: 10_000,
                delay: 0,
                actions: vec![],
                signers: vec![],
                signatures: vec![],
            },
            &TransactionSerializer::new(),
            &self.keypair,
        )
        .unwrap()
    }
}

pub struct PoolTestEnv {
    pub keypair: KeyPair,
    pub genesis: Arc<Block>,
    pub cache: SharedBlockCache,
    pub store: MemChainStore,
    pub _wal_dir: tempfile::TempDir,
}

pub fn pool_env() -> (PoolTestEnv, TxPool) {
    let keypair = KeyPair::generate(Algorithm::Ed25519);
    let genesis = Arc::new(Block::genesis(&keypair, base_time()).unwrap());
    let store = MemChainStore::with_genesis(genesis.clone());
    let wal_dir = tempfile::tempdir().unwrap();
    let (cache, _) = BlockCache::open(
        BlockCacheConfig {
            wal_path: wal_dir.path().to_path_buf(),
            wal_segment_entries: 64,
        },
        store.clone_box(),
        genesis.clone(),
        vec![keypair.get_public_key()],
    )
    .unwrap();
    let cache: SharedBlockCache = Arc::new(RwLock::new(cache));
    let pool = TxPool::new(PoolConfig::default(), cache.clone(), store.clone_box());
    (
        PoolTestEnv {
            keypair,
            genesis,
            cache,
            store,
            _wal_dir: wal_dir,
        },
        pool,
    )
}

/// Builds a block carrying the given transactions and registers it in the
/// block cache so the pool can fetch its body during reorg replay.
pub fn make_block(
    env: &PoolTestEnv,
    parent: BlockId,
    number: u64,
    time: PobTime,
    txs: Vec<SignedTransaction>,
) -> Arc<Block> {
    let tx_hashes: Vec<_> = txs.iter().map(|tx| *tx.id.get_hash()).collect();
    let header = BlockHeader {
        number,
        parent,
        witness: env.keypair.get_public_key(),
        time,
        tx_merkle_root: compute_merkle_root(&tx_hashes),
        receipt_merkle_root: compute_merkle_root(&[]),
        gas_usage: 0,
        info: Vec::new(),
    };
    let block = Arc::new(Block {
        header: Signed::new_signed(header, &BlockHeaderSerializer::new(), &env.keypair).unwrap(),
        transactions: txs,
    });
    env.cache.write().add(block.clone()).unwrap();
    block
}

pub fn summary(block: &Block) -> BlockTxSummary {
    BlockTxSummary::from(block)
}
