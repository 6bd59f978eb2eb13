// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! Unsigned nanosecond time management.
//!
//! The consensus protocol clocks sub-slots in nanoseconds, so the scalar kept
//! here is nanoseconds since 01/01/1970 rather than a coarser unit.

#![warn(missing_docs)]

mod error;
pub use error::TimeError;

use nom::error::{context, ContextError, ParseError};
use nom::IResult;
use pob_serialization::{
    Deserializer, SerializeError, Serializer, U64VarIntDeserializer, U64VarIntSerializer,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Bound;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Time structure used everywhere.
/// Nanoseconds since 01/01/1970.
#[derive(
    Debug, Default, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct PobTime(u64);

impl PobTime {
    /// Smallest time interval
    pub const EPSILON: PobTime = PobTime(1);

    /// Gets the current UNIX time in nanoseconds
    pub fn now() -> Result<Self, TimeError> {
        let nanos: u64 = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| TimeError::TimeOverflowError)?
            .as_nanos()
            .try_into()
            .map_err(|_| TimeError::TimeOverflowError)?;
        Ok(PobTime(nanos))
    }

    /// From nanoseconds
    pub const fn from_nanos(nanos: u64) -> Self {
        PobTime(nanos)
    }

    /// From milliseconds
    pub const fn from_millis(millis: u64) -> Self {
        PobTime(millis * 1_000_000)
    }

    /// From seconds
    pub const fn from_secs(secs: u64) -> Self {
        PobTime(secs * 1_000_000_000)
    }

    /// To nanoseconds
    pub const fn to_nanos(self) -> u64 {
        self.0
    }

    /// To milliseconds, truncating
    pub const fn to_millis(self) -> u64 {
        self.0 / 1_000_000
    }

    /// To seconds, truncating
    pub const fn to_secs(self) -> u64 {
        self.0 / 1_000_000_000
    }

    /// Conversion to `std::time::Duration`
    pub const fn to_duration(self) -> Duration {
        Duration::from_nanos(self.0)
    }

    /// Saturating addition
    #[must_use]
    pub const fn saturating_add(self, t: PobTime) -> Self {
        PobTime(self.0.saturating_add(t.0))
    }

    /// Saturating subtraction
    #[must_use]
    pub const fn saturating_sub(self, t: PobTime) -> Self {
        PobTime(self.0.saturating_sub(t.0))
    }

    /// Checked addition
    pub fn checked_add(self, t: PobTime) -> Result<Self, TimeError> {
        self.0
            .checked_add(t.0)
            .map(PobTime)
            .ok_or_else(|| TimeError::CheckedOperationError("time addition overflow".to_string()))
    }

    /// Checked subtraction
    pub fn checked_sub(self, t: PobTime) -> Result<Self, TimeError> {
        self.0
            .checked_sub(t.0)
            .map(PobTime)
            .ok_or_else(|| TimeError::CheckedOperationError("time subtraction underflow".to_string()))
    }

    /// Saturating multiplication by a scalar
    #[must_use]
    pub const fn saturating_mul(self, n: u64) -> Self {
        PobTime(self.0.saturating_mul(n))
    }

    /// Estimates the `Instant` at which this absolute time will (or did) occur.
    ///
    /// Times in the past are clamped to the current instant.
    pub fn estimate_instant(self) -> Result<Instant, TimeError> {
        let now = PobTime::now()?;
        let now_instant = Instant::now();
        if self >= now {
            now_instant
                .checked_add(Duration::from_nanos(self.0 - now.0))
                .ok_or(TimeError::TimeOverflowError)
        } else {
            Ok(now_instant)
        }
    }
}

impl fmt::Display for PobTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Serializer for `PobTime`
#[derive(Clone, Default)]
pub struct PobTimeSerializer {
    u64_serializer: U64VarIntSerializer,
}

impl PobTimeSerializer {
    /// Creates a `PobTimeSerializer`
    pub const fn new() -> Self {
        Self {
            u64_serializer: U64VarIntSerializer::new(),
        }
    }
}

impl Serializer<PobTime> for PobTimeSerializer {
    fn serialize(&self, value: &PobTime, buffer: &mut Vec<u8>) -> Result<(), SerializeError> {
        self.u64_serializer.serialize(&value.to_nanos(), buffer)
    }
}

/// Deserializer for `PobTime`
#[derive(Clone)]
pub struct PobTimeDeserializer {
    u64_deserializer: U64VarIntDeserializer,
}

impl PobTimeDeserializer {
    /// Creates a `PobTimeDeserializer`
    pub const fn new() -> Self {
        Self {
            u64_deserializer: U64VarIntDeserializer::new(
                Bound::Included(0),
                Bound::Included(u64::MAX),
            ),
        }
    }
}

impl Default for PobTimeDeserializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Deserializer<PobTime> for PobTimeDeserializer {
    fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], PobTime, E> {
        context("Failed PobTime deserialization", |input| {
            self.u64_deserializer
                .deserialize(input)
                .map(|(rest, res)| (rest, PobTime::from_nanos(res)))
        })(buffer)
    }
}
