// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! Build here the node settings from the TOML configuration file.

use std::path::PathBuf;

use pob_consensus_exports::PobConfig;
use pob_pool_exports::PoolConfig;
use pob_signature::Algorithm;
use pob_sync_exports::SyncConfig;
use serde::Deserialize;

lazy_static::lazy_static! {
    pub static ref SETTINGS: Settings = build_settings();
}

/// Signing account of this node
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AccountSettings {
    /// bs58check secret key; empty means an ephemeral key is generated
    pub secret_key: String,
    /// signature algorithm of the secret key
    pub algorithm: Algorithm,
}

impl Default for AccountSettings {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            algorithm: Algorithm::Ed25519,
        }
    }
}

/// Chain bootstrap and block cache persistence
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChainSettings {
    /// directory of the block cache write-ahead log
    pub wal_path: PathBuf,
    /// appends per WAL segment before rolling to a new file
    pub wal_segment_entries: u64,
    /// genesis time in nanoseconds
    pub genesis_time: u64,
    /// initial witness set as bs58check public keys; empty means this
    /// node's own key boots a development chain
    pub witnesses: Vec<String>,
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            wal_path: PathBuf::from("storage/blockcache_wal"),
            wal_segment_entries: 512,
            genesis_time: 0,
            witnesses: Vec::new(),
        }
    }
}

/// Whole node settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub account: AccountSettings,
    pub chain: ChainSettings,
    pub pool: PoolConfig,
    pub sync: SyncConfig,
    pub consensus: PobConfig,
}

fn build_settings() -> Settings {
    let path = std::env::var("POB_CONFIG_PATH").unwrap_or_else(|_| "pob_node.toml".to_string());
    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => settings,
            Err(err) => {
                eprintln!("invalid configuration file {}: {}", path, err);
                std::process::exit(1);
            }
        },
        Err(_) => Settings::default(),
    }
}
