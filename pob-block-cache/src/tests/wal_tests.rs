// Copyright (c) 2022 MASSA LABS <info@massa.net>

use std::io::Write;

use super::tools::{add_and_link, make_block, open_cache, setup};
use crate::wal::Wal;

#[test]
fn test_replay_restores_linked_blocks() {
    let env = setup(3);
    let dir = tempfile::tempdir().unwrap();

    let b1 = make_block(&env.keypairs[1], env.genesis.id(), 1, 1, 0);
    let b2 = make_block(&env.keypairs[2], b1.id(), 2, 2, 0);
    {
        let (mut cache, replay) = open_cache(dir.path(), &env);
        assert!(replay.is_empty());
        add_and_link(&mut cache, b1.clone());
        add_and_link(&mut cache, b2.clone());
    }

    // reopening replays the linked blocks in link order
    let (_, replay) = open_cache(dir.path(), &env);
    let ids: Vec<_> = replay.iter().map(|block| block.id()).collect();
    assert_eq!(ids, vec![b1.id(), b2.id()]);
}

#[test]
fn test_corrupted_wal_rotated() {
    let env = setup(3);
    let dir = tempfile::tempdir().unwrap();

    {
        let (mut cache, _) = open_cache(dir.path(), &env);
        add_and_link(
            &mut cache,
            make_block(&env.keypairs[1], env.genesis.id(), 1, 1, 0),
        );
    }

    // truncate the tail of the only segment
    let segment = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .find(|entry| entry.file_name().to_string_lossy().starts_with("wal-"))
        .unwrap()
        .path();
    let bytes = std::fs::read(&segment).unwrap();
    let mut file = std::fs::File::create(&segment).unwrap();
    file.write_all(&bytes[..bytes.len() - 3]).unwrap();
    drop(file);

    // the cache opens empty and the damaged directory is moved aside
    let (cache, replay) = open_cache(dir.path(), &env);
    assert!(replay.is_empty());
    assert!(cache.is_empty());
    assert!(dir.path().with_extension("corrupted").exists());
}

#[test]
fn test_segments_roll_and_prune() {
    let dir = tempfile::tempdir().unwrap();
    let env = setup(3);
    let (mut wal, replay) = Wal::open(dir.path(), 2).unwrap();
    assert!(replay.is_empty());

    let b1 = make_block(&env.keypairs[1], env.genesis.id(), 1, 1, 0);
    let b2 = make_block(&env.keypairs[2], b1.id(), 2, 2, 0);
    let b3 = make_block(&env.keypairs[0], b2.id(), 3, 3, 0);

    wal.append(&b1).unwrap();
    wal.append(&b2).unwrap();
    // third append rolls into a second segment
    wal.append(&b3).unwrap();
    assert_eq!(wal.segment_count(), 2);

    // pruning below height 3 drops the first full segment only
    wal.prune(3).unwrap();
    assert_eq!(wal.segment_count(), 1);

    drop(wal);
    let (_, replay) = Wal::open(dir.path(), 2).unwrap();
    let ids: Vec<_> = replay.iter().map(|block| block.id()).collect();
    assert_eq!(ids, vec![b3.id()]);
}
