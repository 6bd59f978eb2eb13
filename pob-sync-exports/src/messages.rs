// Copyright (c) 2022 MASSA LABS <info@massa.net>

use std::ops::Bound::Included;

use nom::error::{context, ContextError, ParseError};
use nom::IResult;
use pob_models::block::{Block, BlockDeserializer, BlockSerializer};
use pob_models::block_id::{BlockId, BlockIdDeserializer, BlockIdSerializer};
use pob_models::config::MAX_SYNC_RANGE;
use pob_serialization::{
    Deserializer, SerializeError, Serializer, U32VarIntDeserializer, U32VarIntSerializer,
    U64VarIntDeserializer, U64VarIntSerializer,
};
use pob_time::{PobTime, PobTimeDeserializer, PobTimeSerializer};

/// Opaque peer identifier handed over by the transport
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(pub String);

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `(number, id)` advertisement of one block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    /// block height
    pub number: u64,
    /// block id
    pub id: BlockId,
}

/// Messages exchanged with peers, tagged by message id on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerMessage {
    /// periodic height advertisement
    SyncHeight {
        /// local head height
        height: u64,
        /// sender clock
        time: PobTime,
    },
    /// urgent broadcast of a freshly produced block
    NewBlock(Block),
    /// urgent broadcast of a freshly linked block id
    NewBlockHash(BlockInfo),
    /// request the block ids of a height range
    BlockHashRequest {
        /// first height, inclusive
        start: u64,
        /// last height, inclusive
        end: u64,
    },
    /// advertisements answering a `BlockHashRequest`
    BlockHashResponse(Vec<BlockInfo>),
    /// request one block while synchronizing
    BlockRequest(BlockId),
    /// block answering a `BlockRequest`
    BlockResponse(Block),
    /// urgent fetch of a gossiped hash
    NewBlockRequest(BlockId),
}

const SYNC_HEIGHT_ID: u64 = 0;
const NEW_BLOCK_ID: u64 = 1;
const NEW_BLOCK_HASH_ID: u64 = 2;
const BLOCK_HASH_REQUEST_ID: u64 = 3;
const BLOCK_HASH_RESPONSE_ID: u64 = 4;
const BLOCK_REQUEST_ID: u64 = 5;
const BLOCK_RESPONSE_ID: u64 = 6;
const NEW_BLOCK_REQUEST_ID: u64 = 7;

/// How a block reached this node; the only signal crossing the sync to
/// consensus channel besides the block itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockMessageKind {
    /// broadcast by its producer
    NewBlock,
    /// answer to a synchronization request
    SyncResponse,
}

/// A block handed to the consensus verify loop
#[derive(Debug, Clone)]
pub struct BlockMessage {
    /// the block
    pub block: Block,
    /// how it arrived
    pub kind: BlockMessageKind,
}

/// Serializer for `PeerMessage`
#[derive(Clone)]
pub struct PeerMessageSerializer {
    id_serializer: U64VarIntSerializer,
    u64_serializer: U64VarIntSerializer,
    len_serializer: U32VarIntSerializer,
    time_serializer: PobTimeSerializer,
    block_serializer: BlockSerializer,
    block_id_serializer: BlockIdSerializer,
}

impl PeerMessageSerializer {
    /// Creates a serializer for `PeerMessage`
    pub const fn new() -> Self {
        Self {
            id_serializer: U64VarIntSerializer::new(),
            u64_serializer: U64VarIntSerializer::new(),
            len_serializer: U32VarIntSerializer::new(),
            time_serializer: PobTimeSerializer::new(),
            block_serializer: BlockSerializer::new(),
            block_id_serializer: BlockIdSerializer::new(),
        }
    }

    fn serialize_block_info(
        &self,
        info: &BlockInfo,
        buffer: &mut Vec<u8>,
    ) -> Result<(), SerializeError> {
        self.u64_serializer.serialize(&info.number, buffer)?;
        self.block_id_serializer.serialize(&info.id, buffer)
    }
}

impl Default for PeerMessageSerializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Serializer<PeerMessage> for PeerMessageSerializer {
    fn serialize(&self, value: &PeerMessage, buffer: &mut Vec<u8>) -> Result<(), SerializeError> {
        match value {
            PeerMessage::SyncHeight { height, time } => {
                self.id_serializer.serialize(&SYNC_HEIGHT_ID, buffer)?;
                self.u64_serializer.serialize(height, buffer)?;
                self.time_serializer.serialize(time, buffer)
            }
            PeerMessage::NewBlock(block) => {
                self.id_serializer.serialize(&NEW_BLOCK_ID, buffer)?;
                self.block_serializer.serialize(block, buffer)
            }
            PeerMessage::NewBlockHash(info) => {
                self.id_serializer.serialize(&NEW_BLOCK_HASH_ID, buffer)?;
                self.serialize_block_info(info, buffer)
            }
            PeerMessage::BlockHashRequest { start, end } => {
                self.id_serializer.serialize(&BLOCK_HASH_REQUEST_ID, buffer)?;
                self.u64_serializer.serialize(start, buffer)?;
                self.u64_serializer.serialize(end, buffer)
            }
            PeerMessage::BlockHashResponse(infos) => {
                self.id_serializer
                    .serialize(&BLOCK_HASH_RESPONSE_ID, buffer)?;
                let len: u32 = infos.len().try_into().map_err(|_| {
                    SerializeError::NumberTooBig("too many block infos".to_string())
                })?;
                self.len_serializer.serialize(&len, buffer)?;
                for info in infos {
                    self.serialize_block_info(info, buffer)?;
                }
                Ok(())
            }
            PeerMessage::BlockRequest(id) => {
                self.id_serializer.serialize(&BLOCK_REQUEST_ID, buffer)?;
                self.block_id_serializer.serialize(id, buffer)
            }
            PeerMessage::BlockResponse(block) => {
                self.id_serializer.serialize(&BLOCK_RESPONSE_ID, buffer)?;
                self.block_serializer.serialize(block, buffer)
            }
            PeerMessage::NewBlockRequest(id) => {
                self.id_serializer.serialize(&NEW_BLOCK_REQUEST_ID, buffer)?;
                self.block_id_serializer.serialize(id, buffer)
            }
        }
    }
}

/// Deserializer for `PeerMessage`
#[derive(Clone)]
pub struct PeerMessageDeserializer {
    id_deserializer: U64VarIntDeserializer,
    u64_deserializer: U64VarIntDeserializer,
    len_deserializer: U32VarIntDeserializer,
    time_deserializer: PobTimeDeserializer,
    block_deserializer: BlockDeserializer,
    block_id_deserializer: BlockIdDeserializer,
}

impl PeerMessageDeserializer {
    /// Creates a deserializer for `PeerMessage`
    pub const fn new() -> Self {
        Self {
            id_deserializer: U64VarIntDeserializer::new(
                Included(0),
                Included(NEW_BLOCK_REQUEST_ID),
            ),
            u64_deserializer: U64VarIntDeserializer::new(Included(0), Included(u64::MAX)),
            len_deserializer: U32VarIntDeserializer::new(
                Included(0),
                Included(MAX_SYNC_RANGE as u32),
            ),
            time_deserializer: PobTimeDeserializer::new(),
            block_deserializer: BlockDeserializer::new(),
            block_id_deserializer: BlockIdDeserializer::new(),
        }
    }

    fn deserialize_block_info<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], BlockInfo, E> {
        let (rest, number) = self.u64_deserializer.deserialize(buffer)?;
        let (rest, id) = self.block_id_deserializer.deserialize(rest)?;
        Ok((rest, BlockInfo { number, id }))
    }
}

impl Default for PeerMessageDeserializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Deserializer<PeerMessage> for PeerMessageDeserializer {
    fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], PeerMessage, E> {
        context("Failed peer message deserialization", |input: &'a [u8]| {
            let (rest, id) = self.id_deserializer.deserialize(input)?;
            match id {
                SYNC_HEIGHT_ID => {
                    let (rest, height) = self.u64_deserializer.deserialize(rest)?;
                    let (rest, time) = self.time_deserializer.deserialize(rest)?;
                    Ok((rest, PeerMessage::SyncHeight { height, time }))
                }
                NEW_BLOCK_ID => {
                    let (rest, block) = self.block_deserializer.deserialize(rest)?;
                    Ok((rest, PeerMessage::NewBlock(block)))
                }
                NEW_BLOCK_HASH_ID => {
                    let (rest, info) = self.deserialize_block_info(rest)?;
                    Ok((rest, PeerMessage::NewBlockHash(info)))
                }
                BLOCK_HASH_REQUEST_ID => {
                    let (rest, start) = self.u64_deserializer.deserialize(rest)?;
                    let (rest, end) = self.u64_deserializer.deserialize(rest)?;
                    Ok((rest, PeerMessage::BlockHashRequest { start, end }))
                }
                BLOCK_HASH_RESPONSE_ID => {
                    let (mut rest, len) = self.len_deserializer.deserialize(rest)?;
                    let mut infos = Vec::with_capacity(len as usize);
                    for _ in 0..len {
                        let (r, info) = self.deserialize_block_info(rest)?;
                        rest = r;
                        infos.push(info);
                    }
                    Ok((rest, PeerMessage::BlockHashResponse(infos)))
                }
                BLOCK_REQUEST_ID => {
                    let (rest, id) = self.block_id_deserializer.deserialize(rest)?;
                    Ok((rest, PeerMessage::BlockRequest(id)))
                }
                BLOCK_RESPONSE_ID => {
                    let (rest, block) = self.block_deserializer.deserialize(rest)?;
                    Ok((rest, PeerMessage::BlockResponse(block)))
                }
                NEW_BLOCK_REQUEST_ID => {
                    let (rest, id) = self.block_id_deserializer.deserialize(rest)?;
                    Ok((rest, PeerMessage::NewBlockRequest(id)))
                }
                _ => Err(nom::Err::Error(ParseError::from_error_kind(
                    input,
                    nom::error::ErrorKind::Fail,
                ))),
            }
        })(buffer)
    }
}
