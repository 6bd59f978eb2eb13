// Copyright (c) 2022 MASSA LABS <info@massa.net>

use std::sync::Arc;

use parking_lot::RwLock;
use pob_block_cache::{BlockCache, BlockCacheConfig, SharedBlockCache};
use pob_channel::{sender::PobSender, PobChannel};
use pob_consensus_exports::{ConsensusChannels, PobConfig};
use pob_execution_exports::sim::SimExecutionController;
use pob_execution_exports::{ExecutionController, ReceiptStatus, TxReceipt};
use pob_hash::Hash;
use pob_models::block::{compute_merkle_root, Block, BlockHeader, BlockHeaderSerializer};
use pob_models::block_id::BlockId;
use pob_models::signed::{Id, Signed};
use pob_models::slot::Slot;
use pob_models::timeslots::slot_start_time;
use pob_models::transaction::{SignedTransaction, Transaction, TransactionSerializer};
use pob_pool_exports::{PoolConfig, PoolController, PoolManager};
use pob_pool_worker::start_pool_controller;
use pob_signature::{Algorithm, KeyPair, PublicKey};
use pob_storage::{ChainStore, MemChainStore};
use pob_sync_exports::{test_exports::LoopbackNetwork, PeerId, SyncConfig, SyncController};
use pob_sync_worker::start_sync_worker;
use pob_time::PobTime;

use crate::processor::BlockProcessor;

pub struct EngineTestEnv {
    pub keypairs: Vec<KeyPair>,
    pub witnesses: Vec<PublicKey>,
    pub genesis: Arc<Block>,
    pub store: MemChainStore,
    pub cache: SharedBlockCache,
    pub cache_config: BlockCacheConfig,
    pub execution: SimExecutionController,
    pub pool: Box<dyn PoolController>,
    pub pool_manager: Box<dyn PoolManager>,
    pub sync: Box<dyn SyncController>,
    pub network: LoopbackNetwork,
    pub inbound: PobSender<(PeerId, Vec<u8>)>,
    pub processor: BlockProcessor,
    pub channels: ConsensusChannels,
    pub sync_manager: Option<Box<dyn pob_sync_exports::SyncManager>>,
    _wal_dir: tempfile::TempDir,
}

impl EngineTestEnv {
    pub fn stop(&mut self) {
        if let Some(mut sync_manager) = self.sync_manager.take() {
            sync_manager.stop();
        }
        self.pool_manager.stop();
    }
}

/// Builds a full engine environment around `witness_count` witnesses, real
/// pool and synchronizer workers, the sim execution backend and a loopback
/// transport.
pub fn engine_env(witness_count: usize) -> EngineTestEnv {
    let keypairs: Vec<KeyPair> = (0..witness_count)
        .map(|_| KeyPair::generate(Algorithm::Ed25519))
        .collect();
    let witnesses: Vec<PublicKey> = keypairs.iter().map(|kp| kp.get_public_key()).collect();
    let genesis = Arc::new(Block::genesis(&keypairs[0], PobTime::from_millis(0)).unwrap());
    let store = MemChainStore::with_genesis(genesis.clone());

    let wal_dir = tempfile::tempdir().unwrap();
    let cache_config = BlockCacheConfig {
        wal_path: wal_dir.path().to_path_buf(),
        wal_segment_entries: 64,
    };
    let (cache, _) = BlockCache::open(
        cache_config.clone(),
        store.clone_box(),
        genesis.clone(),
        witnesses.clone(),
    )
    .unwrap();
    let cache: SharedBlockCache = Arc::new(RwLock::new(cache));

    let execution = SimExecutionController::new(genesis.id(), witnesses.clone());

    let (pool_manager, pool) =
        start_pool_controller(PoolConfig::default(), cache.clone(), store.clone_box());

    let network = LoopbackNetwork::new();
    let (inbound, inbound_rx) =
        PobChannel::new::<(PeerId, Vec<u8>)>("engine_test_inbound".to_string(), None);
    let (sync_manager, sync) = start_sync_worker(
        SyncConfig::default(),
        Box::new(network.clone()),
        inbound_rx,
        cache.clone(),
        store.clone_box(),
    );

    let channels = ConsensusChannels {
        pool: pool.clone(),
        execution: execution.clone_box(),
        chain: store.clone_box(),
        sync: sync.clone(),
    };
    let processor = BlockProcessor {
        config: PobConfig::default(),
        channels: channels.clone(),
        cache: cache.clone(),
        our_key: keypairs[0].get_public_key(),
    };

    EngineTestEnv {
        keypairs,
        witnesses,
        genesis,
        store,
        cache,
        cache_config,
        execution,
        pool,
        pool_manager,
        sync,
        network,
        inbound,
        processor,
        channels,
        sync_manager: Some(sync_manager),
        _wal_dir: wal_dir,
    }
}

/// A transaction with wall-clock validity, so the pool accepts it whenever
/// the test runs.
pub fn live_tx(keypair: &KeyPair) -> SignedTransaction {
    let now = PobTime::now().unwrap();
    Signed::new_signed(
        Transaction {
            time: now,
            expiration: now.saturating_add(PobTime::from_secs(60)),
            gas_price: 100,
            gas_limit: 10_000,
            delay: 0,
            actions: vec![],
            signers: vec![],
            signatures: vec![],
        },
        &TransactionSerializer::new(),
        keypair,
    )
    .unwrap()
}

/// Merkle roots the sim execution backend computes for these transactions
pub fn sim_roots(txs: &[SignedTransaction]) -> (Hash, Hash) {
    let tx_hashes: Vec<Hash> = txs.iter().map(|tx| *tx.id.get_hash()).collect();
    let receipt_hashes: Vec<Hash> = txs
        .iter()
        .map(|tx| {
            TxReceipt {
                tx_id: tx.id,
                status: ReceiptStatus::Success,
                gas_used: tx.content.gas_limit / 2,
            }
            .digest()
        })
        .collect();
    (
        compute_merkle_root(&tx_hashes),
        compute_merkle_root(&receipt_hashes),
    )
}

/// Builds a schedule-consistent block: the producing keypair must be the
/// witness the window maps to (`window % witness_count == witness index`).
pub fn make_block(
    keypair: &KeyPair,
    parent: &Block,
    window: u64,
    sub_slot: u8,
    txs: Vec<SignedTransaction>,
) -> Block {
    let (tx_merkle_root, receipt_merkle_root) = sim_roots(&txs);
    let header = BlockHeader {
        number: parent.number() + 1,
        parent: parent.id(),
        witness: keypair.get_public_key(),
        time: slot_start_time(Slot::new(window, sub_slot)),
        tx_merkle_root,
        receipt_merkle_root,
        gas_usage: txs.iter().map(|tx| tx.content.gas_limit / 2).sum(),
        info: Vec::new(),
    };
    Block {
        header: Signed::new_signed(header, &BlockHeaderSerializer::new(), keypair).unwrap(),
        transactions: txs,
    }
}
