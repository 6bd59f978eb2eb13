// Copyright (c) 2022 MASSA LABS <info@massa.net>

use displaydoc::Display;
use thiserror::Error;

/// Errors of the signature component
#[non_exhaustive]
#[derive(Display, Error, Debug, Clone)]
pub enum PobSignatureError {
    /// parsing error: {0}
    ParsingError(String),
    /// signature verification failed: {0}
    VerificationError(String),
    /// unknown signature algorithm: {0}
    UnknownAlgorithm(String),
}
