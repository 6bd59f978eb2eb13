// Copyright (c) 2022 MASSA LABS <info@massa.net>

use super::tools::{add_and_link, make_block, open_cache, setup};
use crate::{BlockCacheError, NodeKind};
use pob_storage::ChainStore;

#[test]
fn test_add_and_find() {
    let env = setup(3);
    let dir = tempfile::tempdir().unwrap();
    let (mut cache, _) = open_cache(dir.path(), &env);

    let b1 = make_block(&env.keypairs[1], env.genesis.id(), 1, 1, 0);
    cache.add(b1.clone()).unwrap();
    let node = cache.find(&b1.id()).unwrap();
    assert_eq!(node.kind, NodeKind::Single);
    assert_eq!(node.number(), 1);
}

#[test]
fn test_duplicate_add_rejected() {
    let env = setup(3);
    let dir = tempfile::tempdir().unwrap();
    let (mut cache, _) = open_cache(dir.path(), &env);

    let b1 = make_block(&env.keypairs[1], env.genesis.id(), 1, 1, 0);
    cache.add(b1.clone()).unwrap();
    let before = cache.len();
    assert!(matches!(
        cache.add(b1),
        Err(BlockCacheError::Duplicate(_))
    ));
    assert_eq!(cache.len(), before);
}

#[test]
fn test_out_of_order_arrival() {
    let env = setup(3);
    let dir = tempfile::tempdir().unwrap();
    let (mut cache, _) = open_cache(dir.path(), &env);

    let b10 = make_block(&env.keypairs[1], env.genesis.id(), 1, 1, 0);
    let b11 = make_block(&env.keypairs[2], b10.id(), 2, 2, 0);

    // child first: stays an orphan Single
    cache.add(b11.clone()).unwrap();
    assert_eq!(cache.find(&b11.id()).unwrap().kind, NodeKind::Single);

    // parent arrives and is spliced in front of the waiting child
    cache.add(b10.clone()).unwrap();
    let parent = cache.find(&b10.id()).unwrap();
    assert!(parent.children.contains(&b11.id()));
    assert_eq!(cache.find(&b11.id()).unwrap().parent, Some(b10.id()));

    // linking the parent reports the child as a candidate
    let serial = cache.serial_num_for(&b10).unwrap();
    let candidates = cache.link(&b10.id(), serial, None, false).unwrap();
    assert_eq!(candidates, vec![b11.id()]);

    // linking the candidate advances the head to it
    let serial = cache.serial_num_for(&b11).unwrap();
    cache.link(&b11.id(), serial, None, false).unwrap();
    assert_eq!(cache.head_id(), b11.id());
}

#[test]
fn test_serial_num_rule() {
    let env = setup(3);
    let dir = tempfile::tempdir().unwrap();
    let (mut cache, _) = open_cache(dir.path(), &env);

    // witness 1 produces consecutively inside window 1
    let b1 = make_block(&env.keypairs[1], env.genesis.id(), 1, 1, 0);
    add_and_link(&mut cache, b1.clone());
    assert_eq!(cache.find(&b1.id()).unwrap().serial_num, 0);

    let b2 = make_block(&env.keypairs[1], b1.id(), 2, 1, 1);
    assert_eq!(cache.serial_num_for(&b2).unwrap(), 1);
    add_and_link(&mut cache, b2.clone());

    // same witness, next window: reset
    let b3 = make_block(&env.keypairs[1], b2.id(), 3, 4, 0);
    assert_eq!(cache.serial_num_for(&b3).unwrap(), 0);

    // different witness, same window: reset
    let b3b = make_block(&env.keypairs[2], b2.id(), 3, 1, 2);
    assert_eq!(cache.serial_num_for(&b3b).unwrap(), 0);
}

#[test]
fn test_head_selection() {
    let env = setup(3);
    let dir = tempfile::tempdir().unwrap();
    let (mut cache, _) = open_cache(dir.path(), &env);

    // two linked children at the same height: the earlier time wins
    let early = make_block(&env.keypairs[1], env.genesis.id(), 1, 1, 0);
    let late = make_block(&env.keypairs[2], env.genesis.id(), 1, 2, 0);
    add_and_link(&mut cache, late.clone());
    assert_eq!(cache.head_id(), late.id());
    add_and_link(&mut cache, early.clone());
    assert_eq!(cache.head_id(), early.id());

    // a higher block beats both regardless of time
    let taller = make_block(&env.keypairs[0], late.id(), 2, 3, 0);
    add_and_link(&mut cache, taller.clone());
    assert_eq!(cache.head_id(), taller.id());
}

#[test]
fn test_head_tie_breaks_on_greater_id() {
    let env = setup(3);
    let dir = tempfile::tempdir().unwrap();
    let (mut cache, _) = open_cache(dir.path(), &env);

    // same height, same production time: the greater id wins
    let a = make_block(&env.keypairs[1], env.genesis.id(), 1, 1, 0);
    let b = make_block(&env.keypairs[2], env.genesis.id(), 1, 1, 0);
    let winner = if a.id().to_bytes() > b.id().to_bytes() {
        a.id()
    } else {
        b.id()
    };

    add_and_link(&mut cache, a);
    add_and_link(&mut cache, b);
    assert_eq!(cache.head_id(), winner);
}

#[test]
fn test_update_lib_confirms_and_prunes() {
    let env = setup(3);
    let dir = tempfile::tempdir().unwrap();
    let (mut cache, _) = open_cache(dir.path(), &env);

    // a sibling branch that should disappear once the LIB advances past it
    let stale = make_block(&env.keypairs[2], env.genesis.id(), 1, 2, 0);
    add_and_link(&mut cache, stale.clone());

    // the canonical branch: three witnesses build on each other
    let b1 = make_block(&env.keypairs[1], env.genesis.id(), 1, 1, 0);
    add_and_link(&mut cache, b1.clone());
    let b2 = make_block(&env.keypairs[2], b1.id(), 2, 5, 0);
    add_and_link(&mut cache, b2.clone());
    assert!(cache.update_lib().unwrap().is_none());

    let b3 = make_block(&env.keypairs[0], b2.id(), 3, 6, 0);
    add_and_link(&mut cache, b3.clone());

    // [b1..head] carries all three witnesses: b1 is now irreversible
    let new_lib = cache.update_lib().unwrap();
    assert_eq!(new_lib, Some(b1.id()));
    assert_eq!(cache.linked_root_id(), b1.id());
    assert!(cache.linked_root().confirmed);

    // the sibling branch is gone, the finalized span is in the store
    assert!(cache.find(&stale.id()).is_none());
    assert!(env.store.contains(&b1.id()));
    assert!(!env.store.contains(&b2.id()));
    assert_eq!(cache.head_id(), b3.id());
}

#[test]
fn test_del_removes_subtree() {
    let env = setup(3);
    let dir = tempfile::tempdir().unwrap();
    let (mut cache, _) = open_cache(dir.path(), &env);

    let b1 = make_block(&env.keypairs[1], env.genesis.id(), 1, 1, 0);
    cache.add(b1.clone()).unwrap();
    let b2 = make_block(&env.keypairs[2], b1.id(), 2, 2, 0);
    cache.add(b2.clone()).unwrap();

    cache.del(&b1.id()).unwrap();
    assert!(cache.find(&b1.id()).is_none());
    assert!(cache.find(&b2.id()).is_none());
    assert!(!cache
        .linked_root()
        .children
        .contains(&b1.id()));
}

#[test]
fn test_get_block_falls_back_to_store() {
    let env = setup(3);
    let dir = tempfile::tempdir().unwrap();
    let (cache, _) = open_cache(dir.path(), &env);

    // the genesis block is the cache root and also in the finalized store
    assert!(cache.get_block_by_hash(&env.genesis.id()).is_some());
    assert!(cache.get_block_by_number(0).is_some());
}

#[test]
fn test_linked_parent_invariant() {
    let env = setup(3);
    let dir = tempfile::tempdir().unwrap();
    let (mut cache, _) = open_cache(dir.path(), &env);

    let b1 = make_block(&env.keypairs[1], env.genesis.id(), 1, 1, 0);
    let b2 = make_block(&env.keypairs[2], b1.id(), 2, 2, 0);
    cache.add(b1.clone()).unwrap();
    cache.add(b2.clone()).unwrap();

    // linking a child under a Single parent is refused
    assert!(matches!(
        cache.link(&b2.id(), 0, None, false),
        Err(BlockCacheError::InvalidLink(..))
    ));
}
