// Copyright (c) 2022 MASSA LABS <info@massa.net>

use displaydoc::Display;
use thiserror::Error;

/// models error
#[non_exhaustive]
#[derive(Display, Error, Debug, Clone)]
pub enum ModelsError {
    /// hashing error
    HashError,
    /// Serialization error: {0}
    SerializeError(#[from] pob_serialization::SerializeError),
    /// Deserialization error: {0}
    DeserializeError(String),
    /// block id parsing error
    BlockIdParseError,
    /// transaction id parsing error
    TxIdParseError,
    /// signature error: {0}
    SignatureError(#[from] pob_signature::PobSignatureError),
    /// time error: {0}
    TimeError(#[from] pob_time::TimeError),
    /// invalid structure: {0}
    InvalidStructure(String),
}
