// Copyright (c) 2022 MASSA LABS <info@massa.net>

use displaydoc::Display;
use thiserror::Error;

/// Time error
#[non_exhaustive]
#[derive(Display, Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeError {
    /// time overflow
    TimeOverflowError,
    /// time conversion error
    ConversionError,
    /// checked operation error: {0}
    CheckedOperationError(String),
}
