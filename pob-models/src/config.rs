// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! Protocol constants. These are consensus-critical: changing any of them
//! forks the chain.

use pob_time::PobTime;

/// Number of consecutive blocks a witness may produce within its slot
pub const BLOCK_NUM_PER_WITNESS: u64 = 6;
/// Blocks further ahead of the head than this are dropped unprocessed
pub const MAX_BLOCK_NUMBER_AHEAD: u64 = 10_000;
/// Duration of a sub-slot: one block per sub-slot
pub const SUB_SLOT_TIME: PobTime = PobTime::from_millis(500);
/// Duration of a full witness slot
pub const SLOT_TIME: PobTime = PobTime::from_millis(500 * BLOCK_NUM_PER_WITNESS as u64);
/// Time budget for filling a produced block with transactions
pub const GEN_BLOCK_TIME: PobTime = PobTime::from_millis(400);
/// Reduced time budget for the last two sub-slots of a production burst,
/// leaving propagation headroom
pub const LAST2_GEN_BLOCK_TIME: PobTime = PobTime::from_millis(50);
/// Maximum number of blocks requested ahead of the head while synchronizing
pub const MAX_SYNC_RANGE: u64 = 1_000;
/// The node is catching up while its head lags neighbors by more than this
pub const SYNC_LAG_THRESHOLD: u64 = 120;
/// A transaction older than this is dropped from the pool
pub const TX_EXPIRATION: PobTime = PobTime::from_secs(60);
/// Window over which canonical blocks are consulted for duplicate
/// transaction filtering
pub const FILTER_TIME: PobTime = PobTime::from_secs(90);
/// Period of the pool expiry sweep
pub const CLEAR_INTERVAL: PobTime = PobTime::from_secs(10);
/// Default bounded channel capacity
pub const CHANNEL_SIZE: usize = 1_024;

/// Maximum number of actions in one transaction, checked at deserialization
pub const MAX_TX_ACTIONS: u32 = 1_024;
/// Maximum number of signers of one transaction, checked at deserialization
pub const MAX_TX_SIGNERS: u32 = 128;
/// Maximum byte length of an action field, checked at deserialization
pub const MAX_ACTION_DATA_LEN: u32 = 65_536;
/// Maximum byte length of the opaque header extension field
pub const MAX_HEADER_INFO_LEN: u32 = 65_536;
/// Maximum number of transactions in one block, checked at deserialization
pub const MAX_BLOCK_TXS: u32 = 10_000;
