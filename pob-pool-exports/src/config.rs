//! Copyright (c) 2022 MASSA LABS <info@massa.net>

use pob_models::config::{CHANNEL_SIZE, CLEAR_INTERVAL, FILTER_TIME, TX_EXPIRATION};
use pob_time::PobTime;
use serde::{Deserialize, Serialize};

/// Pool configuration
#[derive(Debug, Deserialize, Serialize, Clone, Copy)]
pub struct PoolConfig {
    /// maximum number of pending transactions kept
    pub max_pool_size: usize,
    /// a transaction older than this is dropped
    pub tx_expiration: PobTime,
    /// window over which canonical blocks are consulted for duplicates
    pub filter_time: PobTime,
    /// period of the expiry sweep
    pub clear_interval: PobTime,
    /// capacity of the pool command channel
    pub channel_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_pool_size: 100_000,
            tx_expiration: TX_EXPIRATION,
            filter_time: FILTER_TIME,
            clear_interval: CLEAR_INTERVAL,
            channel_size: CHANNEL_SIZE,
        }
    }
}
