// Copyright (c) 2022 MASSA LABS <info@massa.net>

use displaydoc::Display;
use thiserror::Error;

/// Errors of the synchronizer
#[non_exhaustive]
#[derive(Display, Error, Debug, Clone)]
pub enum SyncError {
    /// network error: {0}
    NetworkError(String),
    /// channel error: {0}
    ChannelError(String),
    /// serialization error: {0}
    SerializeError(#[from] pob_serialization::SerializeError),
    /// message deserialization error: {0}
    DeserializeError(String),
}
