// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! Binary serialization primitives shared by every crate that touches the
//! wire or the write-ahead log.

#![warn(missing_docs)]

use std::{
    collections::VecDeque,
    fmt::{Debug, Display},
};

use displaydoc::Display;
use thiserror::Error;

use nom::{
    error::{ContextError, ParseError},
    IResult,
};

/// Error while serializing a value into bytes
#[non_exhaustive]
#[derive(Display, Error, Debug, Clone)]
pub enum SerializeError {
    /// Number {0} is too big to be serialized
    NumberTooBig(String),
    /// General error {0}
    GeneralError(String),
}

/// Error while deserializing bytes, keeping a chain of parsing contexts
#[derive(Clone, Error)]
pub struct DeserializeError<'a> {
    errors: VecDeque<(&'a [u8], String)>,
}

impl<'a> ContextError<&'a [u8]> for DeserializeError<'a> {
    fn add_context(input: &'a [u8], ctx: &'static str, mut other: Self) -> Self {
        other.errors.push_front((input, ctx.to_string()));
        other
    }
}

impl<'a> ParseError<&'a [u8]> for DeserializeError<'a> {
    fn append(input: &'a [u8], kind: nom::error::ErrorKind, mut other: Self) -> Self {
        other
            .errors
            .push_front((input, kind.description().to_string()));
        other
    }
    fn from_error_kind(input: &'a [u8], kind: nom::error::ErrorKind) -> Self {
        let mut errors = VecDeque::new();
        errors.push_front((input, kind.description().to_string()));
        Self { errors }
    }
    fn from_char(input: &'a [u8], _: char) -> Self {
        Self::from_error_kind(input, nom::error::ErrorKind::Char)
    }
    fn or(self, other: Self) -> Self {
        other
    }
}

impl<'a> Display for DeserializeError<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for error in &self.errors {
            write!(f, "{} / ", error.1)?;
        }
        Ok(())
    }
}

impl<'a> Debug for DeserializeError<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut last_input = None;
        for error in &self.errors {
            write!(f, "{} / ", error.1)?;
            last_input = Some(error.0);
        }
        if let Some(last_input) = last_input {
            writeln!(f, "Input: {:?}", last_input)?;
        }
        Ok(())
    }
}

/// Serializes a value `T` into a byte buffer.
///
/// One serializer struct per type, so that serializers can carry
/// sub-serializers and be reused across calls without re-allocating them.
pub trait Serializer<T> {
    /// Appends the serialized form of `value` to `buffer`.
    fn serialize(&self, value: &T, buffer: &mut Vec<u8>) -> Result<(), SerializeError>;
}

/// Deserializes a value `T` from a byte buffer.
///
/// Implementations are nom parsers: they return the unconsumed rest of the
/// input along with the decoded value, and may carry range constraints.
pub trait Deserializer<T> {
    /// Deserializes `T` from the beginning of `buffer`.
    fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], T, E>;
}

macro_rules! gen_varint {
    ($($type:ident, $s:ident, $bs:ident, $ds:ident, $d:expr);*) => {
        use std::ops::{Bound, RangeBounds};
        use nom::error::context;
        use unsigned_varint::nom as unsigned_nom;
        $(
            use unsigned_varint::encode::{$type, $bs};
            #[doc = " Serializer for "]
            #[doc = $d]
            #[doc = " in varint form."]
            #[derive(Clone)]
            pub struct $s;

            impl $s {
                #[doc = "Creates a serializer for "]
                #[doc = $d]
                #[doc = " in varint form."]
                #[allow(dead_code)]
                pub const fn new() -> Self {
                    Self
                }
            }

            impl Default for $s {
                fn default() -> $s {
                    $s::new()
                }
            }

            impl Serializer<$type> for $s {
                fn serialize(&self, value: &$type, buffer: &mut Vec<u8>) -> Result<(), SerializeError> {
                    buffer.extend_from_slice($type(*value, &mut $bs()));
                    Ok(())
                }
            }

            #[doc = " Deserializer for "]
            #[doc = $d]
            #[doc = " in varint form."]
            #[derive(Clone)]
            pub struct $ds {
                range: (Bound<$type>, Bound<$type>)
            }

            impl $ds {
                #[doc = "Creates a range-checked deserializer for "]
                #[doc = $d]
                #[doc = " in varint form."]
                #[allow(dead_code)]
                pub const fn new(min: Bound<$type>, max: Bound<$type>) -> Self {
                    Self {
                        range: (min, max)
                    }
                }
            }

            impl Deserializer<$type> for $ds {
                fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(&self, buffer: &'a [u8]) -> IResult<&'a [u8], $type, E> {
                    context(concat!("Failed ", stringify!($type), " deserialization"), |input: &'a [u8]| {
                        let (rest, value) = unsigned_nom::$type(input).map_err(|_| nom::Err::Error(ParseError::from_error_kind(input, nom::error::ErrorKind::Fail)))?;
                        if !self.range.contains(&value) {
                            return Err(nom::Err::Error(ParseError::from_error_kind(input, nom::error::ErrorKind::Fail)));
                        }
                        Ok((rest, value))
                    })(buffer)
                }
            }
        )*
    };
}

gen_varint! {
u32, U32VarIntSerializer, u32_buffer, U32VarIntDeserializer, "`u32`";
u64, U64VarIntSerializer, u64_buffer, U64VarIntDeserializer, "`u64`"
}

/// Serializer for a length-prefixed byte blob
#[derive(Clone, Default)]
pub struct VecU8Serializer {
    len_serializer: U32VarIntSerializer,
}

impl VecU8Serializer {
    /// Creates a `VecU8Serializer`
    pub const fn new() -> Self {
        Self {
            len_serializer: U32VarIntSerializer::new(),
        }
    }
}

impl Serializer<Vec<u8>> for VecU8Serializer {
    fn serialize(&self, value: &Vec<u8>, buffer: &mut Vec<u8>) -> Result<(), SerializeError> {
        let len: u32 = value.len().try_into().map_err(|_| {
            SerializeError::NumberTooBig("byte blob too long to be serialized".to_string())
        })?;
        self.len_serializer.serialize(&len, buffer)?;
        buffer.extend_from_slice(value);
        Ok(())
    }
}

/// Deserializer for a length-prefixed byte blob
#[derive(Clone)]
pub struct VecU8Deserializer {
    len_deserializer: U32VarIntDeserializer,
}

impl VecU8Deserializer {
    /// Creates a `VecU8Deserializer` with a maximum blob length
    pub const fn new(max_len: Bound<u32>) -> Self {
        Self {
            len_deserializer: U32VarIntDeserializer::new(Bound::Included(0), max_len),
        }
    }
}

impl Deserializer<Vec<u8>> for VecU8Deserializer {
    fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], Vec<u8>, E> {
        context("Failed byte blob deserialization", |input: &'a [u8]| {
            let (rest, len) = self.len_deserializer.deserialize(input)?;
            let len = len as usize;
            if rest.len() < len {
                return Err(nom::Err::Error(ParseError::from_error_kind(
                    input,
                    nom::error::ErrorKind::Eof,
                )));
            }
            Ok((&rest[len..], rest[..len].to_vec()))
        })(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ops::Bound::Included;

    #[test]
    fn test_u64_varint_roundtrip() {
        let ser = U64VarIntSerializer::new();
        let deser = U64VarIntDeserializer::new(Included(0), Included(u64::MAX));
        for value in [0u64, 1, 127, 128, 300, u32::MAX as u64, u64::MAX] {
            let mut buffer = Vec::new();
            ser.serialize(&value, &mut buffer).unwrap();
            let (rest, out) = deser.deserialize::<DeserializeError>(&buffer).unwrap();
            assert!(rest.is_empty());
            assert_eq!(out, value);
        }
    }

    #[test]
    fn test_u64_varint_range_check() {
        let ser = U64VarIntSerializer::new();
        let deser = U64VarIntDeserializer::new(Included(0), Included(100));
        let mut buffer = Vec::new();
        ser.serialize(&101u64, &mut buffer).unwrap();
        assert!(deser.deserialize::<DeserializeError>(&buffer).is_err());
    }

    #[test]
    fn test_vec_u8_roundtrip() {
        let ser = VecU8Serializer::new();
        let deser = VecU8Deserializer::new(Included(1024));
        let blob = vec![5u8; 100];
        let mut buffer = Vec::new();
        ser.serialize(&blob, &mut buffer).unwrap();
        buffer.extend_from_slice(b"rest");
        let (rest, out) = deser.deserialize::<DeserializeError>(&buffer).unwrap();
        assert_eq!(rest, b"rest");
        assert_eq!(out, blob);
    }

    #[test]
    fn test_vec_u8_truncated_input() {
        let ser = VecU8Serializer::new();
        let deser = VecU8Deserializer::new(Included(1024));
        let blob = vec![7u8; 32];
        let mut buffer = Vec::new();
        ser.serialize(&blob, &mut buffer).unwrap();
        buffer.truncate(buffer.len() - 1);
        assert!(deser.deserialize::<DeserializeError>(&buffer).is_err());
    }
}
