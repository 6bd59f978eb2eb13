// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! The PoB node binary: reads the settings, boots the chain stores, then
//! starts the pool, the synchronizer and the consensus engine in dependency
//! order. Stopping reverses that order.

use std::str::FromStr;
use std::sync::Arc;

use crossbeam::channel::bounded;
use parking_lot::RwLock;
use pob_block_cache::{BlockCache, BlockCacheConfig, SharedBlockCache};
use pob_channel::PobChannel;
use pob_consensus_exports::ConsensusChannels;
use pob_consensus_worker::start_pob_worker;
use pob_execution_exports::sim::SimExecutionController;
use pob_execution_exports::ExecutionController;
use pob_models::block::Block;
use pob_pool_worker::start_pool_controller;
use pob_signature::{KeyPair, PublicKey};
use pob_storage::{ChainStore, MemChainStore};
use pob_sync_exports::{NullNetwork, PeerId};
use pob_sync_worker::start_sync_worker;
use pob_time::PobTime;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod settings;
use settings::SETTINGS;

fn load_keypair() -> KeyPair {
    let account = &SETTINGS.account;
    if account.secret_key.is_empty() {
        info!("no secret key configured, generating an ephemeral account");
        return KeyPair::generate(account.algorithm);
    }
    match KeyPair::from_bs58_check(&account.secret_key, account.algorithm) {
        Ok(keypair) => keypair,
        Err(err) => {
            error!("cannot build the account keypair: {}", err);
            std::process::exit(1);
        }
    }
}

fn load_witnesses(our_key: &PublicKey) -> Vec<PublicKey> {
    let configured = &SETTINGS.chain.witnesses;
    if configured.is_empty() {
        info!("no witness set configured, booting a development chain");
        return vec![*our_key];
    }
    configured
        .iter()
        .map(|encoded| match PublicKey::from_str(encoded) {
            Ok(key) => key,
            Err(err) => {
                error!("invalid witness public key {}: {}", encoded, err);
                std::process::exit(1);
            }
        })
        .collect()
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let keypair = load_keypair();
    let our_key = keypair.get_public_key();
    info!("node account: {}", our_key);
    let witnesses = load_witnesses(&our_key);

    // genesis bootstrap proper lives outside the core; a deterministic
    // development genesis keeps a fresh node able to start alone
    let genesis = match Block::genesis(&keypair, PobTime::from_nanos(SETTINGS.chain.genesis_time))
    {
        Ok(genesis) => Arc::new(genesis),
        Err(err) => {
            error!("cannot build the genesis block: {}", err);
            std::process::exit(1);
        }
    };
    let store = MemChainStore::with_genesis(genesis.clone());

    let cache_config = BlockCacheConfig {
        wal_path: SETTINGS.chain.wal_path.clone(),
        wal_segment_entries: SETTINGS.chain.wal_segment_entries,
    };
    let (cache, wal_replay) = match BlockCache::open(
        cache_config.clone(),
        store.clone_box(),
        genesis.clone(),
        witnesses.clone(),
    ) {
        Ok(opened) => opened,
        Err(err) => {
            error!("cannot open the block cache: {}", err);
            std::process::exit(1);
        }
    };
    let cache: SharedBlockCache = Arc::new(RwLock::new(cache));

    let execution = SimExecutionController::new(genesis.id(), witnesses);

    let (mut pool_manager, pool) =
        start_pool_controller(SETTINGS.pool, cache.clone(), store.clone_box());

    // the wire-level transport is an external collaborator; without one the
    // node runs on the null transport and its own production only
    let (_inbound_tx, inbound_rx) =
        PobChannel::new::<(PeerId, Vec<u8>)>("network_inbound".to_string(), None);
    let (sync_manager, sync) = start_sync_worker(
        SETTINGS.sync,
        Box::new(NullNetwork),
        inbound_rx,
        cache.clone(),
        store.clone_box(),
    );

    let channels = ConsensusChannels {
        pool,
        execution: execution.clone_box(),
        chain: store.clone_box(),
        sync,
    };
    let (consensus, mut consensus_manager) = start_pob_worker(
        SETTINGS.consensus,
        cache_config,
        keypair,
        channels,
        cache,
        wal_replay,
        sync_manager,
    );

    let (stop_tx, stop_rx) = bounded::<()>(1);
    if let Err(err) = ctrlc::set_handler(move || {
        let _ = stop_tx.try_send(());
    }) {
        error!("cannot install the shutdown handler: {}", err);
        std::process::exit(1);
    }

    info!("node started in mode {}", consensus.mode());
    loop {
        crossbeam::select! {
            recv(stop_rx) -> _ => break,
            default(std::time::Duration::from_secs(30)) => {
                let (head_id, head_number) = consensus.head_info();
                let (_, lib_number) = consensus.lib_info();
                info!(
                    "mode {}, head {} at {}, confirmed {}",
                    consensus.mode(),
                    head_id,
                    head_number,
                    lib_number
                );
            }
        }
    }

    info!("shutting down...");
    consensus_manager.stop();
    pool_manager.stop();
    info!("node stopped");
}
