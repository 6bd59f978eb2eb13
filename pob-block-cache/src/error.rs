// Copyright (c) 2022 MASSA LABS <info@massa.net>

use displaydoc::Display;
use pob_models::block_id::BlockId;
use thiserror::Error;

/// Errors of the block cache
#[non_exhaustive]
#[derive(Display, Error, Debug)]
pub enum BlockCacheError {
    /// block {0} is already in the cache
    Duplicate(BlockId),
    /// block {0} not found
    NotFound(BlockId),
    /// cannot link block {0}: {1}
    InvalidLink(BlockId, String),
    /// write-ahead log corrupted: {0}
    WalCorrupt(String),
    /// io error: {0}
    IoError(#[from] std::io::Error),
    /// serialization error: {0}
    SerializeError(#[from] pob_serialization::SerializeError),
    /// models error: {0}
    ModelsError(#[from] pob_models::ModelsError),
    /// storage error: {0}
    StorageError(#[from] pob_storage::StorageError),
}
