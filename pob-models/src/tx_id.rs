// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::error::ModelsError;
use crate::prehash::PreHashed;
use crate::signed::Id;
use nom::error::{context, ContextError, ParseError};
use nom::IResult;
use pob_hash::{Hash, HashDeserializer};
use pob_serialization::{Deserializer, SerializeError, Serializer};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use std::str::FromStr;

/// Size in bytes of a serialized transaction id
pub const TX_ID_SIZE_BYTES: usize = pob_hash::HASH_SIZE_BYTES;

/// Transaction identifier: the hash of the serialized transaction
#[derive(
    Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, SerializeDisplay, DeserializeFromStr,
)]
pub struct TxId(pub Hash);

impl PreHashed for TxId {}

impl Id for TxId {
    fn new(hash: Hash) -> Self {
        TxId(hash)
    }

    fn get_hash(&self) -> &Hash {
        &self.0
    }
}

const TXID_PREFIX: char = 'T';

impl std::fmt::Display for TxId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}{}",
            TXID_PREFIX,
            bs58::encode(self.0.to_bytes()).with_check().into_string()
        )
    }
}

impl std::fmt::Debug for TxId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

impl FromStr for TxId {
    type Err = ModelsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match chars.next() {
            Some(prefix) if prefix == TXID_PREFIX => {
                let data = chars.collect::<String>();
                let decoded_bs58_check = bs58::decode(data)
                    .with_check(None)
                    .into_vec()
                    .map_err(|_| ModelsError::TxIdParseError)?;
                Ok(TxId(Hash::from_bytes(
                    &decoded_bs58_check
                        .as_slice()
                        .try_into()
                        .map_err(|_| ModelsError::TxIdParseError)?,
                )))
            }
            _ => Err(ModelsError::TxIdParseError),
        }
    }
}

impl TxId {
    /// transaction id to bytes
    pub fn to_bytes(&self) -> &[u8; TX_ID_SIZE_BYTES] {
        self.0.to_bytes()
    }

    /// transaction id from bytes
    pub fn from_bytes(data: &[u8; TX_ID_SIZE_BYTES]) -> TxId {
        TxId(Hash::from_bytes(data))
    }
}

/// Serializer for `TxId`
#[derive(Default, Clone)]
pub struct TxIdSerializer;

impl TxIdSerializer {
    /// Creates a serializer for `TxId`
    pub const fn new() -> Self {
        Self
    }
}

impl Serializer<TxId> for TxIdSerializer {
    fn serialize(&self, value: &TxId, buffer: &mut Vec<u8>) -> Result<(), SerializeError> {
        buffer.extend_from_slice(value.to_bytes());
        Ok(())
    }
}

/// Deserializer for `TxId`
#[derive(Default, Clone)]
pub struct TxIdDeserializer {
    hash_deserializer: HashDeserializer,
}

impl TxIdDeserializer {
    /// Creates a deserializer for `TxId`
    pub const fn new() -> Self {
        Self {
            hash_deserializer: HashDeserializer::new(),
        }
    }
}

impl Deserializer<TxId> for TxIdDeserializer {
    fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], TxId, E> {
        context("Failed transaction id deserialization", |input| {
            self.hash_deserializer
                .deserialize(input)
                .map(|(rest, hash)| (rest, TxId(hash)))
        })(buffer)
    }
}
