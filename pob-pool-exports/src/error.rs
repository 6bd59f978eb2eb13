// Copyright (c) 2022 MASSA LABS <info@massa.net>

use displaydoc::Display;
use thiserror::Error;

/// Errors of the transaction pool
#[non_exhaustive]
#[derive(Display, Error, Debug, Clone)]
pub enum PoolError {
    /// channel error: {0}
    ChannelError(String),
    /// the pool is shutting down
    ShuttingDown,
}
