// Copyright (c) 2022 MASSA LABS <info@massa.net>

use std::path::Path;
use std::sync::Arc;

use pob_models::block::{Block, BlockHeader, BlockHeaderSerializer, compute_merkle_root};
use pob_models::block_id::BlockId;
use pob_models::signed::Signed;
use pob_models::slot::Slot;
use pob_models::timeslots::slot_start_time;
use pob_signature::{Algorithm, KeyPair, PublicKey};
use pob_storage::{ChainStore, MemChainStore};
use pob_time::PobTime;

use crate::{BlockCache, BlockCacheConfig};

pub struct TestSetup {
    pub keypairs: Vec<KeyPair>,
    pub witnesses: Vec<PublicKey>,
    pub store: MemChainStore,
    pub genesis: Arc<Block>,
}

pub fn setup(witness_count: usize) -> TestSetup {
    let keypairs: Vec<KeyPair> = (0..witness_count)
        .map(|_| KeyPair::generate(Algorithm::Ed25519))
        .collect();
    let witnesses: Vec<PublicKey> = keypairs.iter().map(|kp| kp.get_public_key()).collect();
    let genesis = Arc::new(Block::genesis(&keypairs[0], PobTime::from_millis(0)).unwrap());
    let store = MemChainStore::with_genesis(genesis.clone());
    TestSetup {
        keypairs,
        witnesses,
        store,
        genesis,
    }
}

pub fn make_block(
    keypair: &KeyPair,
    parent: BlockId,
    number: u64,
    window: u64,
    sub_slot: u8,
) -> Arc<Block> {
    let header = BlockHeader {
        number,
        parent,
        witness: keypair.get_public_key(),
        time: slot_start_time(Slot::new(window, sub_slot)),
        tx_merkle_root: compute_merkle_root(&[]),
        receipt_merkle_root: compute_merkle_root(&[]),
        gas_usage: 0,
        info: Vec::new(),
    };
    Arc::new(Block {
        header: Signed::new_signed(header, &BlockHeaderSerializer::new(), keypair).unwrap(),
        transactions: Vec::new(),
    })
}

pub fn open_cache(wal_dir: &Path, setup: &TestSetup) -> (BlockCache, Vec<Block>) {
    BlockCache::open(
        BlockCacheConfig {
            wal_path: wal_dir.to_path_buf(),
            wal_segment_entries: 4,
        },
        setup.store.clone_box(),
        setup.genesis.clone(),
        setup.witnesses.clone(),
    )
    .unwrap()
}

/// Adds and links a block built on an already linked parent.
pub fn add_and_link(cache: &mut BlockCache, block: Arc<Block>) {
    cache.add(block.clone()).unwrap();
    let serial = cache.serial_num_for(&block).unwrap();
    cache.link(&block.id(), serial, None, false).unwrap();
}
