// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! In-memory fork tree of recently seen blocks with last-irreversible-block
//! advancement and a crash-recovery write-ahead log.

#![warn(missing_docs)]

mod block_cache;
mod error;
/// write-ahead log of linked blocks
pub mod wal;

pub use block_cache::{
    BlockCache, BlockCacheConfig, CacheNode, NodeKind, SharedBlockCache,
};
pub use error::BlockCacheError;

#[cfg(test)]
mod tests;
