// Copyright (c) 2022 MASSA LABS <info@massa.net>

use std::time::Duration;

use pob_consensus_exports::ConsensusError;
use pob_models::block::Block;
use pob_storage::ChainStore;
use serial_test::serial;

use super::tools::{engine_env, live_tx, make_block};
use crate::worker::recover_block_cache;

#[test]
#[serial]
fn test_duplicate_ingestion() {
    let mut env = engine_env(3);
    let block = make_block(&env.keypairs[1], &env.genesis, 1, 0, vec![]);

    let before = env.cache.read().len();
    env.processor.handle_recv_block(block.clone(), false).unwrap();
    assert!(matches!(
        env.processor.handle_recv_block(block, false),
        Err(ConsensusError::Duplicate(_))
    ));
    assert_eq!(env.cache.read().len(), before + 1);
    env.stop();
}

#[test]
#[serial]
fn test_out_of_order_arrival() {
    let mut env = engine_env(3);
    let b10 = make_block(&env.keypairs[1], &env.genesis, 1, 0, vec![]);
    let b11 = make_block(&env.keypairs[2], &b10, 2, 0, vec![]);

    // the child arrives first and is retained as Single
    assert!(matches!(
        env.processor.handle_recv_block(b11.clone(), false),
        Err(ConsensusError::Single(_))
    ));

    // the parent arrives: both link, the head advances to the child
    env.processor.handle_recv_block(b10, false).unwrap();
    assert_eq!(env.cache.read().head_id(), b11.id());
    assert_eq!(env.cache.read().head().number(), 2);
    env.stop();
}

#[test]
#[serial]
fn test_unscheduled_witness_rejected() {
    let mut env = engine_env(3);
    // window 1 belongs to witness 1, witness 2 tries to take it
    let block = make_block(&env.keypairs[2], &env.genesis, 1, 0, vec![]);

    assert!(matches!(
        env.processor.handle_recv_block(block.clone(), false),
        Err(ConsensusError::VerifyBasics(_))
    ));
    // the failed node was removed from the cache
    assert!(!env.cache.read().contains(&block.id()));
    env.stop();
}

#[test]
#[serial]
fn test_state_mismatch_deletes_node() {
    let mut env = engine_env(3);
    let tx = live_tx(&env.keypairs[0]);
    let mut block = make_block(&env.keypairs[1], &env.genesis, 1, 0, vec![tx]);
    // claim an empty transaction root although the block carries one
    block.transactions.clear();

    assert!(matches!(
        env.processor.handle_recv_block(block.clone(), false),
        Err(ConsensusError::VerifyState(_))
    ));
    assert!(!env.cache.read().contains(&block.id()));
    env.stop();
}

#[test]
#[serial]
fn test_fork_and_reorg_updates_pool() {
    // five witnesses so the three-block branch does not yet advance the LIB
    let mut env = engine_env(5);
    let only_in_a = live_tx(&env.keypairs[0]);
    let shared = live_tx(&env.keypairs[1]);
    let only_in_b = live_tx(&env.keypairs[2]);

    // branch A: windows 6 and 7 (witnesses 1 and 2)
    let b10a = make_block(
        &env.keypairs[1],
        &env.genesis,
        6,
        0,
        vec![only_in_a.clone(), shared.clone()],
    );
    let b11a = make_block(&env.keypairs[2], &b10a, 7, 0, vec![]);
    // branch B: windows 8, 9, 10 (witnesses 3, 4 and 0)
    let b10b = make_block(&env.keypairs[3], &env.genesis, 8, 0, vec![shared.clone()]);
    let b11b = make_block(&env.keypairs[4], &b10b, 9, 0, vec![only_in_b.clone()]);
    let b12b = make_block(&env.keypairs[0], &b11b, 10, 0, vec![]);

    for block in [&b10a, &b11a, &b10b, &b11b, &b12b] {
        env.processor.handle_recv_block(block.clone(), false).unwrap();
    }
    assert_eq!(env.cache.read().head_id(), b12b.id());

    // give the pool worker time to process the notifications
    std::thread::sleep(Duration::from_millis(300));
    assert!(env.pool.contains(&only_in_a.id));
    assert!(!env.pool.contains(&shared.id));
    assert!(!env.pool.contains(&only_in_b.id));
    env.stop();
}

#[test]
#[serial]
fn test_lib_advance_finalizes_branch() {
    let mut env = engine_env(3);
    // three consecutive witnesses: the first block becomes irreversible
    let b1 = make_block(&env.keypairs[1], &env.genesis, 1, 0, vec![]);
    let b2 = make_block(&env.keypairs[2], &b1, 2, 0, vec![]);
    let b3 = make_block(&env.keypairs[0], &b2, 3, 0, vec![]);

    for block in [&b1, &b2, &b3] {
        env.processor.handle_recv_block(block.clone(), false).unwrap();
    }
    assert_eq!(env.cache.read().linked_root_id(), b1.id());
    assert!(env.store.contains(&b1.id()));
    env.stop();
}

#[test]
#[serial]
fn test_wal_replay_restores_tree() {
    let mut env = engine_env(3);
    let b1 = make_block(&env.keypairs[1], &env.genesis, 1, 0, vec![]);
    let b2 = make_block(&env.keypairs[2], &b1, 2, 0, vec![]);
    env.processor.handle_recv_block(b1.clone(), false).unwrap();
    env.processor.handle_recv_block(b2.clone(), false).unwrap();
    let head_before = env.cache.read().head_id();

    // reopen the cache from disk and replay the log through a fresh engine
    let (reopened, replay) = pob_block_cache::BlockCache::open(
        env.cache_config.clone(),
        pob_storage::ChainStore::clone_box(&env.store),
        env.genesis.clone(),
        env.witnesses.clone(),
    )
    .unwrap();
    let reopened: pob_block_cache::SharedBlockCache =
        std::sync::Arc::new(parking_lot::RwLock::new(reopened));
    let replay: Vec<Block> = replay;
    assert_eq!(replay.len(), 2);

    let fresh_execution = pob_execution_exports::sim::SimExecutionController::new(
        env.genesis.id(),
        env.witnesses.clone(),
    );
    let mut channels = env.channels.clone();
    channels.execution = pob_execution_exports::ExecutionController::clone_box(&fresh_execution);
    let processor = crate::processor::BlockProcessor {
        config: env.processor.config,
        channels,
        cache: reopened.clone(),
        our_key: env.keypairs[0].get_public_key(),
    };
    recover_block_cache(&processor, &env.cache_config, replay);

    assert_eq!(reopened.read().head_id(), head_before);
    assert_eq!(reopened.read().head().number(), 2);
    env.stop();
}

#[test]
#[serial]
fn test_self_loopback_is_duplicate_only() {
    let mut env = engine_env(3);
    let block = make_block(&env.keypairs[1], &env.genesis, 1, 0, vec![]);
    env.processor.handle_recv_block(block.clone(), false).unwrap();
    // the second reception of a self-handled block can only be a duplicate
    assert!(matches!(
        env.processor.handle_recv_block(block, false),
        Err(ConsensusError::Duplicate(_))
    ));
    env.stop();
}
