//! Copyright (c) 2022 MASSA LABS <info@massa.net>

use pob_models::config::{
    BLOCK_NUM_PER_WITNESS, CHANNEL_SIZE, GEN_BLOCK_TIME, LAST2_GEN_BLOCK_TIME,
    MAX_BLOCK_NUMBER_AHEAD, SUB_SLOT_TIME,
};
use pob_time::PobTime;
use serde::{Deserialize, Serialize};

/// Consensus engine configuration
#[derive(Debug, Deserialize, Serialize, Clone, Copy)]
pub struct PobConfig {
    /// consecutive blocks one witness may produce within its slot
    pub block_num_per_witness: u64,
    /// blocks further ahead of the head than this are dropped unprocessed
    pub max_block_ahead: u64,
    /// duration of one sub-slot
    pub sub_slot_time: PobTime,
    /// transaction-drain budget of a produced block
    pub gen_block_time: PobTime,
    /// reduced drain budget of the last two sub-slots
    pub last2_gen_block_time: PobTime,
    /// capacity of the engine channels
    pub channel_size: usize,
}

impl Default for PobConfig {
    fn default() -> Self {
        Self {
            block_num_per_witness: BLOCK_NUM_PER_WITNESS,
            max_block_ahead: MAX_BLOCK_NUMBER_AHEAD,
            sub_slot_time: SUB_SLOT_TIME,
            gen_block_time: GEN_BLOCK_TIME,
            last2_gen_block_time: LAST2_GEN_BLOCK_TIME,
            channel_size: CHANNEL_SIZE,
        }
    }
}
