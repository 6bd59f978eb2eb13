// Copyright (c) 2022 MASSA LABS <info@massa.net>

use std::time::Duration;

use pob_models::config::MAX_SYNC_RANGE;
use pob_sync_exports::{BlockInfo, BlockMessageKind, PeerMessage};
use pob_time::PobTime;
use serial_test::serial;

use super::tools::{fast_config, frame, make_block, peer, sync_env};

fn wait() {
    std::thread::sleep(Duration::from_millis(150));
}

#[test]
#[serial]
fn test_height_broadcast() {
    let mut env = sync_env(fast_config());
    wait();
    let heights: Vec<u64> = env
        .network
        .take_broadcasts()
        .into_iter()
        .filter_map(|message| match message {
            PeerMessage::SyncHeight { height, .. } => Some(height),
            _ => None,
        })
        .collect();
    assert!(!heights.is_empty());
    assert!(heights.iter().all(|height| *height == 0));
    env.manager.stop();
}

#[test]
#[serial]
fn test_neighbor_height_drives_catching_up() {
    let mut env = sync_env(fast_config());
    assert!(!env.controller.is_catching_up());

    env.inbound
        .send((
            peer("p1"),
            frame(&PeerMessage::SyncHeight {
                height: 5_000,
                time: PobTime::now().unwrap(),
            }),
        ))
        .unwrap();
    wait();

    assert_eq!(env.controller.neighbor_height(), 5_000);
    // head 0 lags 5000 by far more than the threshold
    assert!(env.controller.is_catching_up());
    env.manager.stop();
}

#[test]
#[serial]
fn test_hash_request_window_is_clamped() {
    let mut env = sync_env(fast_config());
    env.inbound
        .send((
            peer("p1"),
            frame(&PeerMessage::SyncHeight {
                height: 5_000,
                time: PobTime::now().unwrap(),
            }),
        ))
        .unwrap();
    wait();

    let requests: Vec<(u64, u64)> = env
        .network
        .take_unicasts()
        .into_iter()
        .filter_map(|(_, message)| match message {
            PeerMessage::BlockHashRequest { start, end } => Some((start, end)),
            _ => None,
        })
        .collect();
    assert!(!requests.is_empty());
    for (start, end) in requests {
        assert_eq!(start, 1);
        // capped at MAX_SYNC_RANGE ahead of the head even though the
        // neighborhood is at 5000
        assert_eq!(end, MAX_SYNC_RANGE);
    }
    env.manager.stop();
}

#[test]
#[serial]
fn test_advertised_blocks_are_requested_and_delivered() {
    let mut env = sync_env(fast_config());
    let advertiser = peer("p1");
    let block = make_block(&env.keypair, env.genesis.id(), 1);

    env.inbound
        .send((
            advertiser.clone(),
            frame(&PeerMessage::SyncHeight {
                height: 10,
                time: PobTime::now().unwrap(),
            }),
        ))
        .unwrap();
    env.inbound
        .send((
            advertiser.clone(),
            frame(&PeerMessage::BlockHashResponse(vec![BlockInfo {
                number: 1,
                id: block.id(),
            }])),
        ))
        .unwrap();
    wait();

    // the advertised block was requested from its advertiser
    let requested: Vec<_> = env
        .network
        .take_unicasts()
        .into_iter()
        .filter_map(|(to, message)| match message {
            PeerMessage::BlockRequest(id) => Some((to, id)),
            _ => None,
        })
        .collect();
    assert!(requested.iter().any(|(to, id)| *to == advertiser && *id == block.id()));

    // the response reaches the consumer channel tagged as a sync response
    env.inbound
        .send((
            advertiser,
            frame(&PeerMessage::BlockResponse(block.as_ref().clone())),
        ))
        .unwrap();
    let incoming = env.controller.incoming_blocks();
    let message = incoming.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(message.kind, BlockMessageKind::SyncResponse);
    assert_eq!(message.block.id(), block.id());
    env.manager.stop();
}

#[test]
#[serial]
fn test_new_block_reaches_consumer() {
    let mut env = sync_env(fast_config());
    let block = make_block(&env.keypair, env.genesis.id(), 1);

    env.inbound
        .send((
            peer("p1"),
            frame(&PeerMessage::NewBlock(block.as_ref().clone())),
        ))
        .unwrap();

    let incoming = env.controller.incoming_blocks();
    let message = incoming.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(message.kind, BlockMessageKind::NewBlock);
    assert_eq!(message.block.id(), block.id());
    env.manager.stop();
}

#[test]
#[serial]
fn test_gossiped_hash_is_fetched_urgently() {
    let mut env = sync_env(fast_config());
    let gossiper = peer("p1");
    let block = make_block(&env.keypair, env.genesis.id(), 1);

    env.inbound
        .send((
            gossiper.clone(),
            frame(&PeerMessage::NewBlockHash(BlockInfo {
                number: 1,
                id: block.id(),
            })),
        ))
        .unwrap();
    wait();

    let urgent: Vec<_> = env
        .network
        .take_unicasts()
        .into_iter()
        .filter_map(|(to, message)| match message {
            PeerMessage::NewBlockRequest(id) => Some((to, id)),
            _ => None,
        })
        .collect();
    assert_eq!(urgent.len(), 1);
    assert_eq!(urgent[0], (gossiper, block.id()));
    env.manager.stop();
}

#[test]
#[serial]
fn test_request_handler_serves_local_data() {
    let mut env = sync_env(fast_config());
    let asker = peer("p1");

    env.inbound
        .send((
            asker.clone(),
            frame(&PeerMessage::BlockHashRequest { start: 0, end: 10 }),
        ))
        .unwrap();
    env.inbound
        .send((
            asker.clone(),
            frame(&PeerMessage::BlockRequest(env.genesis.id())),
        ))
        .unwrap();
    wait();

    let unicasts = env.network.take_unicasts();
    let hash_responses: Vec<_> = unicasts
        .iter()
        .filter_map(|(to, message)| match message {
            PeerMessage::BlockHashResponse(infos) => Some((to.clone(), infos.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(hash_responses.len(), 1);
    assert_eq!(hash_responses[0].0, asker);
    assert_eq!(
        hash_responses[0].1,
        vec![BlockInfo {
            number: 0,
            id: env.genesis.id()
        }]
    );

    assert!(unicasts.iter().any(|(to, message)| {
        *to == asker
            && matches!(message, PeerMessage::BlockResponse(block) if block.id() == env.genesis.id())
    }));
    env.manager.stop();
}
