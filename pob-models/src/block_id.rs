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

/// Size in bytes of a serialized block id
pub const BLOCK_ID_SIZE_BYTES: usize = pob_hash::HASH_SIZE_BYTES;

/// Block identifier: the hash of the serialized block header
#[derive(
    Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, SerializeDisplay, DeserializeFromStr,
)]
pub struct BlockId(pub Hash);

impl PreHashed for BlockId {}

impl Id for BlockId {
    fn new(hash: Hash) -> Self {
        BlockId(hash)
    }

    fn get_hash(&self) -> &Hash {
        &self.0
    }
}

const BLOCKID_PREFIX: char = 'B';

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}{}",
            BLOCKID_PREFIX,
            bs58::encode(self.0.to_bytes()).with_check().into_string()
        )
    }
}

impl std::fmt::Debug for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

impl FromStr for BlockId {
    type Err = ModelsError;
    /// ## Example
    /// ```rust
    /// # use pob_hash::Hash;
    /// # use std::str::FromStr;
    /// # use pob_models::block_id::BlockId;
    /// # let hash = Hash::compute_from(b"test");
    /// # let block_id = BlockId(hash);
    /// let ser = block_id.to_string();
    /// let res_block_id = BlockId::from_str(&ser).unwrap();
    /// assert_eq!(block_id, res_block_id);
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match chars.next() {
            Some(prefix) if prefix == BLOCKID_PREFIX => {
                let data = chars.collect::<String>();
                let decoded_bs58_check = bs58::decode(data)
                    .with_check(None)
                    .into_vec()
                    .map_err(|_| ModelsError::BlockIdParseError)?;
                Ok(BlockId(Hash::from_bytes(
                    &decoded_bs58_check
                        .as_slice()
                        .try_into()
                        .map_err(|_| ModelsError::BlockIdParseError)?,
                )))
            }
            _ => Err(ModelsError::BlockIdParseError),
        }
    }
}

impl BlockId {
    /// block id to bytes
    pub fn to_bytes(&self) -> &[u8; BLOCK_ID_SIZE_BYTES] {
        self.0.to_bytes()
    }

    /// block id from bytes
    pub fn from_bytes(data: &[u8; BLOCK_ID_SIZE_BYTES]) -> BlockId {
        BlockId(Hash::from_bytes(data))
    }
}

/// Serializer for `BlockId`
#[derive(Default, Clone)]
pub struct BlockIdSerializer;

impl BlockIdSerializer {
    /// Creates a serializer for `BlockId`
    pub const fn new() -> Self {
        Self
    }
}

impl Serializer<BlockId> for BlockIdSerializer {
    fn serialize(&self, value: &BlockId, buffer: &mut Vec<u8>) -> Result<(), SerializeError> {
        buffer.extend_from_slice(value.to_bytes());
        Ok(())
    }
}

/// Deserializer for `BlockId`
#[derive(Default, Clone)]
pub struct BlockIdDeserializer {
    hash_deserializer: HashDeserializer,
}

impl BlockIdDeserializer {
    /// Creates a deserializer for `BlockId`
    pub const fn new() -> Self {
        Self {
            hash_deserializer: HashDeserializer::new(),
        }
    }
}

impl Deserializer<BlockId> for BlockIdDeserializer {
    fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], BlockId, E> {
        context("Failed block id deserialization", |input| {
            self.hash_deserializer
                .deserialize(input)
                .map(|(rest, hash)| (rest, BlockId(hash)))
        })(buffer)
    }
}
