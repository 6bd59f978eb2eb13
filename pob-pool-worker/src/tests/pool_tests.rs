// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! # Internal pool unit tests
//!
//! The pool state is driven directly with explicit clocks, so nothing here
//! depends on wall-clock scheduling. One controller-level test exercises the
//! worker thread and the freeze latch end to end.

use std::time::Duration;

use pob_models::config::FILTER_TIME;
use pob_pool_exports::{LinkedBlockNotification, PoolConfig, TxStatus};
use pob_storage::ChainStore;
use pob_time::PobTime;

use super::tools::{base_time, make_block, pool_env, summary, TxGenerator};
use crate::worker::start_pool_controller;

#[test]
fn test_admission_and_ordering() {
    let (_env, mut pool) = pool_env();
    let now = base_time();

    let cheap = TxGenerator::default().gas_price(10).generate();
    let dear = TxGenerator::default().gas_price(500).generate();
    let old = TxGenerator::default()
        .gas_price(500)
        .time(now.saturating_sub(PobTime::from_secs(1)))
        .generate();

    pool.add_transaction(cheap.clone(), now);
    pool.add_transaction(dear.clone(), now);
    pool.add_transaction(old.clone(), now);
    assert_eq!(pool.len(), 3);

    // gas price descending, then time ascending
    let (snapshot, _) = pool.pending_snapshot();
    let ids: Vec<_> = snapshot.iter().map(|tx| tx.id).collect();
    assert_eq!(ids, vec![old.id, dear.id, cheap.id]);
}

#[test]
fn test_invalid_signature_rejected() {
    let (_env, mut pool) = pool_env();
    let other = pob_signature::KeyPair::generate(pob_signature::Algorithm::Ed25519);

    let mut tx = TxGenerator::default().generate();
    // claim a different creator: the signature no longer matches
    tx.creator_public_key = other.get_public_key();

    pool.add_transaction(tx, base_time());
    assert_eq!(pool.len(), 0);
}

#[test]
fn test_expired_rejected() {
    let (_env, mut pool) = pool_env();
    let now = base_time();

    let expired = TxGenerator::default().expiration(now).generate();
    pool.add_transaction(expired, now);

    let stale = TxGenerator::default()
        .time(now.saturating_sub(PobTime::from_secs(120)))
        .generate();
    pool.add_transaction(stale, now);

    assert_eq!(pool.len(), 0);
}

#[test]
fn test_extension_removes_included() {
    let (env, mut pool) = pool_env();
    let now = base_time();

    let included = TxGenerator::default().generate();
    let waiting = TxGenerator::default().generate();
    pool.add_transaction(included.clone(), now);
    pool.add_transaction(waiting.clone(), now);

    let b1 = make_block(&env, env.genesis.id(), 1, now, vec![included.clone()]);
    pool.handle_linked(
        LinkedBlockNotification {
            linked: summary(&b1),
            head: summary(&b1),
        },
        now,
    );

    assert!(!pool.contains(&included.id));
    assert!(pool.contains(&waiting.id));
    assert_eq!(pool.transaction_status(&included.id, None), TxStatus::OnChain);
    assert_eq!(pool.transaction_status(&waiting.id, None), TxStatus::Pending);
}

#[test]
fn test_readmission_blocked_by_canonical_inclusion() {
    let (env, mut pool) = pool_env();
    let now = base_time();

    let included = TxGenerator::default().generate();
    let b1 = make_block(&env, env.genesis.id(), 1, now, vec![included.clone()]);
    pool.handle_linked(
        LinkedBlockNotification {
            linked: summary(&b1),
            head: summary(&b1),
        },
        now,
    );

    // the canonical branch already carries it within the filter window
    pool.add_transaction(included.clone(), now);
    assert!(!pool.contains(&included.id));
}

#[test]
fn test_fork_and_reorg_replays_abandoned_txs() {
    let (env, mut pool) = pool_env();
    let now = base_time();
    let step = PobTime::from_millis(500);

    let only_in_a = TxGenerator::default().generate();
    let in_both = TxGenerator::default().generate();
    let only_in_b = TxGenerator::default().generate();

    // branch A: two blocks
    let b10a = make_block(
        &env,
        env.genesis.id(),
        1,
        now,
        vec![only_in_a.clone(), in_both.clone()],
    );
    let b11a = make_block(&env, b10a.id(), 2, now.saturating_add(step), vec![]);
    // branch B: three blocks, wins the reorg
    let b10b = make_block(&env, env.genesis.id(), 1, now, vec![in_both.clone()]);
    let b11b = make_block(
        &env,
        b10b.id(),
        2,
        now.saturating_add(step),
        vec![only_in_b.clone()],
    );
    let b12b = make_block(&env, b11b.id(), 3, now.saturating_add(step.saturating_mul(2)), vec![]);

    // canonical follows A first
    pool.handle_linked(
        LinkedBlockNotification {
            linked: summary(&b10a),
            head: summary(&b10a),
        },
        now,
    );
    pool.handle_linked(
        LinkedBlockNotification {
            linked: summary(&b11a),
            head: summary(&b11a),
        },
        now,
    );

    // B's blocks link as a side branch, head unchanged
    pool.handle_linked(
        LinkedBlockNotification {
            linked: summary(&b10b),
            head: summary(&b11a),
        },
        now,
    );
    pool.handle_linked(
        LinkedBlockNotification {
            linked: summary(&b11b),
            head: summary(&b11a),
        },
        now,
    );

    // B12b takes the head: reorg point is the genesis
    pool.handle_linked(
        LinkedBlockNotification {
            linked: summary(&b12b),
            head: summary(&b12b),
        },
        now,
    );

    // txs only on the abandoned branch come back, txs on the new branch stay out
    assert!(pool.contains(&only_in_a.id));
    assert!(!pool.contains(&in_both.id));
    assert!(!pool.contains(&only_in_b.id));
}

#[test]
fn test_unresolvable_fork_flushes() {
    let (env, mut pool) = pool_env();
    let now = base_time();

    let waiting = TxGenerator::default().generate();
    pool.add_transaction(waiting.clone(), now);

    let b1 = make_block(&env, env.genesis.id(), 1, now, vec![]);
    pool.handle_linked(
        LinkedBlockNotification {
            linked: summary(&b1),
            head: summary(&b1),
        },
        now,
    );

    // a head whose ancestry the pool cannot resolve: unknown parent id
    let orphan_parent = pob_models::block_id::BlockId(pob_hash::Hash::compute_from(b"unknown"));
    let foreign = make_block(&env, orphan_parent, 5, now, vec![]);
    pool.handle_linked(
        LinkedBlockNotification {
            linked: summary(&foreign),
            head: summary(&foreign),
        },
        now,
    );

    assert_eq!(pool.len(), 0);
}

#[test]
fn test_sweep_expires_and_prunes() {
    let (env, mut pool) = pool_env();
    let now = base_time();

    let short = TxGenerator::default()
        .expiration(now.saturating_add(PobTime::from_secs(5)))
        .generate();
    let long = TxGenerator::default().generate();
    pool.add_transaction(short.clone(), now);
    pool.add_transaction(long.clone(), now);

    let b1 = make_block(&env, env.genesis.id(), 1, now, vec![]);
    pool.handle_linked(
        LinkedBlockNotification {
            linked: summary(&b1),
            head: summary(&b1),
        },
        now,
    );

    let later = now.saturating_add(PobTime::from_secs(10));
    pool.sweep(later);
    assert!(!pool.contains(&short.id));
    assert!(pool.contains(&long.id));

    // a head far in the future prunes the old inclusion records
    let far = now.saturating_add(FILTER_TIME).saturating_add(PobTime::from_secs(1));
    let b2 = make_block(&env, b1.id(), 2, far, vec![]);
    pool.handle_linked(
        LinkedBlockNotification {
            linked: summary(&b2),
            head: summary(&b2),
        },
        far,
    );
    pool.sweep(far);
    // the b1 inclusion record fell out of the filter window
    assert_eq!(
        pool.transaction_status(&short.id, Some(&b1.id())),
        TxStatus::NotFound
    );
}

#[test]
fn test_max_size_evicts_worst() {
    let (env, _) = pool_env();
    let config = PoolConfig {
        max_pool_size: 2,
        ..Default::default()
    };
    let mut pool = crate::tx_pool::TxPool::new(config, env.cache.clone(), env.store.clone_box());
    let now = base_time();

    let low = TxGenerator::default().gas_price(1).generate();
    let mid = TxGenerator::default().gas_price(10).generate();
    let high = TxGenerator::default().gas_price(100).generate();
    pool.add_transaction(low.clone(), now);
    pool.add_transaction(mid.clone(), now);
    pool.add_transaction(high.clone(), now);

    assert_eq!(pool.len(), 2);
    assert!(!pool.contains(&low.id));
    assert!(pool.contains(&mid.id));
    assert!(pool.contains(&high.id));
}

#[test]
fn test_controller_roundtrip_and_freeze() {
    let (env, _) = pool_env();
    let (mut manager, controller) =
        start_pool_controller(PoolConfig::default(), env.cache.clone(), env.store.clone_box());

    let tx = TxGenerator::default()
        .time(PobTime::now().unwrap())
        .expiration(PobTime::now().unwrap().saturating_add(PobTime::from_secs(60)))
        .generate();

    // frozen pool defers admission
    controller.freeze();
    controller.add_transaction(tx.clone()).unwrap();
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(controller.len(), 0);

    controller.unfreeze();
    std::thread::sleep(Duration::from_millis(200));
    assert_eq!(controller.len(), 1);
    assert!(controller.contains(&tx.id));

    manager.stop();
}
