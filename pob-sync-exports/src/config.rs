//! Copyright (c) 2022 MASSA LABS <info@massa.net>

use pob_models::config::{CHANNEL_SIZE, MAX_SYNC_RANGE, SYNC_LAG_THRESHOLD};
use pob_time::PobTime;
use serde::{Deserialize, Serialize};

/// Synchronizer configuration
#[derive(Debug, Deserialize, Serialize, Clone, Copy)]
pub struct SyncConfig {
    /// period of the height broadcast loop
    pub height_interval: PobTime,
    /// period of the block-hash range loop
    pub hash_interval: PobTime,
    /// period of the scheduled block-request loop
    pub block_interval: PobTime,
    /// a neighbor height report older than this is discarded
    pub height_expiry: PobTime,
    /// how long a block request stays outstanding before it may be reissued
    pub request_retry: PobTime,
    /// maximum number of blocks requested ahead of the head
    pub max_sync_range: u64,
    /// head lag beyond which the node reports catching up
    pub lag_threshold: u64,
    /// capacity of the internal channels
    pub channel_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            height_interval: PobTime::from_secs(1),
            hash_interval: PobTime::from_secs(2),
            block_interval: PobTime::from_secs(2),
            height_expiry: PobTime::from_secs(10),
            request_retry: PobTime::from_secs(4),
            max_sync_range: MAX_SYNC_RANGE,
            lag_threshold: SYNC_LAG_THRESHOLD,
            channel_size: CHANNEL_SIZE,
        }
    }
}
