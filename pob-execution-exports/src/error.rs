// Copyright (c) 2022 MASSA LABS <info@massa.net>

use displaydoc::Display;
use thiserror::Error;

/// Errors of the execution interface
#[non_exhaustive]
#[derive(Display, Error, Debug, Clone)]
pub enum ExecutionError {
    /// no committed state for block {0}
    CheckoutError(String),
    /// vm error: {0}
    VmError(String),
    /// commit failed: {0}
    CommitError(String),
}
