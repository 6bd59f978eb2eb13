// Copyright (c) 2022 MASSA LABS <info@massa.net>

use std::ops::Bound::Included;

use crate::block_id::{BlockId, BlockIdDeserializer, BlockIdSerializer};
use crate::config::{MAX_BLOCK_TXS, MAX_HEADER_INFO_LEN};
use crate::error::ModelsError;
use crate::signed::{Signed, SignedDeserializer, SignedSerializer};
use crate::transaction::{
    SignedTransaction, Transaction, TransactionDeserializer,
};
use crate::tx_id::TxId;
use nom::error::{context, ContextError, ParseError};
use nom::IResult;
use pob_hash::{Hash, HashDeserializer};
use pob_serialization::{
    Deserializer, SerializeError, Serializer, U32VarIntDeserializer, U32VarIntSerializer,
    U64VarIntDeserializer, U64VarIntSerializer, VecU8Deserializer, VecU8Serializer,
};
use pob_signature::{KeyPair, PublicKey, PublicKeyDeserializer};
use pob_time::{PobTime, PobTimeDeserializer, PobTimeSerializer};

/// The header of a block.
///
/// The `info` field is an opaque length-prefixed extension blob: nodes carry
/// it through codec round-trips byte for byte without interpreting it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    /// height of the block in the chain
    pub number: u64,
    /// id of the parent block
    pub parent: BlockId,
    /// public key of the producing witness
    pub witness: PublicKey,
    /// production time, the start of the producing sub-slot
    pub time: PobTime,
    /// merkle root of the executed transaction ids
    pub tx_merkle_root: Hash,
    /// merkle root of the execution receipts
    pub receipt_merkle_root: Hash,
    /// total gas used by the block
    pub gas_usage: u64,
    /// opaque extension blob
    pub info: Vec<u8>,
}

impl std::fmt::Display for BlockHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "BlockHeader {{ number: {}, parent: {}, witness: {}, time: {} }}",
            self.number, self.parent, self.witness, self.time
        )
    }
}

/// A block header wrapped with the witness signature; its id is the block id
pub type SignedHeader = Signed<BlockHeader, BlockId>;

/// Deserializer type for `SignedHeader`
pub type SignedHeaderDeserializer = SignedDeserializer<BlockHeader, BlockHeaderDeserializer>;

/// A full block: signed header plus the carried transactions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// signed header
    pub header: SignedHeader,
    /// transactions, in execution order
    pub transactions: Vec<SignedTransaction>,
}

impl Block {
    /// The block id, the hash of the serialized header
    pub fn id(&self) -> BlockId {
        self.header.id
    }

    /// Height of the block
    pub fn number(&self) -> u64 {
        self.header.content.number
    }

    /// Id of the parent block
    pub fn parent(&self) -> BlockId {
        self.header.content.parent
    }

    /// Producing witness
    pub fn witness(&self) -> &PublicKey {
        &self.header.content.witness
    }

    /// Production time
    pub fn time(&self) -> PobTime {
        self.header.content.time
    }

    /// Ids of the carried transactions, in order
    pub fn tx_ids(&self) -> Vec<TxId> {
        self.transactions.iter().map(|tx| tx.id).collect()
    }

    /// Builds and signs a genesis block for an initial witness set.
    ///
    /// Deterministic given the same time and keypair, so every node of a
    /// network derives the same genesis id from its configuration.
    pub fn genesis(keypair: &KeyPair, time: PobTime) -> Result<Block, ModelsError> {
        let header = BlockHeader {
            number: 0,
            parent: BlockId(Hash::compute_from(b"genesis-parent")),
            witness: keypair.get_public_key(),
            time,
            tx_merkle_root: compute_merkle_root(&[]),
            receipt_merkle_root: compute_merkle_root(&[]),
            gas_usage: 0,
            info: Vec::new(),
        };
        Ok(Block {
            header: Signed::new_signed(header, &BlockHeaderSerializer::new(), keypair)?,
            transactions: Vec::new(),
        })
    }
}

impl std::fmt::Display for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Block id: {}", self.id())?;
        write!(f, "{}", self.header)?;
        writeln!(f, "Transactions: {}", self.transactions.len())?;
        Ok(())
    }
}

/// Computes a binary merkle root over a list of hashes.
///
/// The empty list maps to the hash of no bytes; odd levels duplicate their
/// last element.
pub fn compute_merkle_root(hashes: &[Hash]) -> Hash {
    if hashes.is_empty() {
        return Hash::compute_from(&[]);
    }
    let mut level: Vec<Hash> = hashes.to_vec();
    while level.len() > 1 {
        let mut next = Vec::with_capacity((level.len() + 1) / 2);
        for pair in level.chunks(2) {
            let mut data = Vec::with_capacity(pob_hash::HASH_SIZE_BYTES * 2);
            data.extend_from_slice(pair[0].to_bytes());
            data.extend_from_slice(pair.get(1).unwrap_or(&pair[0]).to_bytes());
            next.push(Hash::compute_from(&data));
        }
        level = next;
    }
    level[0]
}

/// Serializer for `BlockHeader`
#[derive(Clone)]
pub struct BlockHeaderSerializer {
    u64_serializer: U64VarIntSerializer,
    block_id_serializer: BlockIdSerializer,
    time_serializer: PobTimeSerializer,
    info_serializer: VecU8Serializer,
}

impl BlockHeaderSerializer {
    /// Creates a serializer for `BlockHeader`
    pub const fn new() -> Self {
        Self {
            u64_serializer: U64VarIntSerializer::new(),
            block_id_serializer: BlockIdSerializer::new(),
            time_serializer: PobTimeSerializer::new(),
            info_serializer: VecU8Serializer::new(),
        }
    }
}

impl Default for BlockHeaderSerializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Serializer<BlockHeader> for BlockHeaderSerializer {
    fn serialize(&self, value: &BlockHeader, buffer: &mut Vec<u8>) -> Result<(), SerializeError> {
        self.u64_serializer.serialize(&value.number, buffer)?;
        self.block_id_serializer.serialize(&value.parent, buffer)?;
        buffer.extend(value.witness.to_bytes());
        self.time_serializer.serialize(&value.time, buffer)?;
        buffer.extend_from_slice(value.tx_merkle_root.to_bytes());
        buffer.extend_from_slice(value.receipt_merkle_root.to_bytes());
        self.u64_serializer.serialize(&value.gas_usage, buffer)?;
        self.info_serializer.serialize(&value.info, buffer)?;
        Ok(())
    }
}

/// Deserializer for `BlockHeader`
#[derive(Clone)]
pub struct BlockHeaderDeserializer {
    u64_deserializer: U64VarIntDeserializer,
    block_id_deserializer: BlockIdDeserializer,
    public_key_deserializer: PublicKeyDeserializer,
    time_deserializer: PobTimeDeserializer,
    hash_deserializer: HashDeserializer,
    info_deserializer: VecU8Deserializer,
}

impl BlockHeaderDeserializer {
    /// Creates a deserializer for `BlockHeader`
    pub const fn new() -> Self {
        Self {
            u64_deserializer: U64VarIntDeserializer::new(Included(0), Included(u64::MAX)),
            block_id_deserializer: BlockIdDeserializer::new(),
            public_key_deserializer: PublicKeyDeserializer::new(),
            time_deserializer: PobTimeDeserializer::new(),
            hash_deserializer: HashDeserializer::new(),
            info_deserializer: VecU8Deserializer::new(Included(MAX_HEADER_INFO_LEN)),
        }
    }
}

impl Default for BlockHeaderDeserializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Deserializer<BlockHeader> for BlockHeaderDeserializer {
    fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], BlockHeader, E> {
        context("Failed block header deserialization", |input: &'a [u8]| {
            let (rest, number) = self.u64_deserializer.deserialize(input)?;
            let (rest, parent) = self.block_id_deserializer.deserialize(rest)?;
            let (rest, witness) = self.public_key_deserializer.deserialize(rest)?;
            let (rest, time) = self.time_deserializer.deserialize(rest)?;
            let (rest, tx_merkle_root) = self.hash_deserializer.deserialize(rest)?;
            let (rest, receipt_merkle_root) = self.hash_deserializer.deserialize(rest)?;
            let (rest, gas_usage) = self.u64_deserializer.deserialize(rest)?;
            let (rest, info) = self.info_deserializer.deserialize(rest)?;
            Ok((
                rest,
                BlockHeader {
                    number,
                    parent,
                    witness,
                    time,
                    tx_merkle_root,
                    receipt_merkle_root,
                    gas_usage,
                    info,
                },
            ))
        })(buffer)
    }
}

/// Serializer for `Block`
#[derive(Clone)]
pub struct BlockSerializer {
    signed_serializer: SignedSerializer,
    len_serializer: U32VarIntSerializer,
}

impl BlockSerializer {
    /// Creates a serializer for `Block`
    pub const fn new() -> Self {
        Self {
            signed_serializer: SignedSerializer::new(),
            len_serializer: U32VarIntSerializer::new(),
        }
    }
}

impl Default for BlockSerializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Serializer<Block> for BlockSerializer {
    fn serialize(&self, value: &Block, buffer: &mut Vec<u8>) -> Result<(), SerializeError> {
        self.signed_serializer.serialize(&value.header, buffer)?;
        let txs_len: u32 = value
            .transactions
            .len()
            .try_into()
            .map_err(|_| SerializeError::NumberTooBig("too many transactions".to_string()))?;
        self.len_serializer.serialize(&txs_len, buffer)?;
        for tx in &value.transactions {
            self.signed_serializer.serialize(tx, buffer)?;
        }
        Ok(())
    }
}

/// Deserializer for `Block`
#[derive(Clone)]
pub struct BlockDeserializer {
    header_deserializer: SignedHeaderDeserializer,
    tx_deserializer: SignedDeserializer<Transaction, TransactionDeserializer>,
    len_deserializer: U32VarIntDeserializer,
}

impl BlockDeserializer {
    /// Creates a deserializer for `Block`
    pub const fn new() -> Self {
        Self {
            header_deserializer: SignedDeserializer::new(BlockHeaderDeserializer::new()),
            tx_deserializer: SignedDeserializer::new(TransactionDeserializer::new()),
            len_deserializer: U32VarIntDeserializer::new(Included(0), Included(MAX_BLOCK_TXS)),
        }
    }
}

impl Default for BlockDeserializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Deserializer<Block> for BlockDeserializer {
    fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], Block, E> {
        context("Failed block deserialization", |input: &'a [u8]| {
            let (rest, header) = self.header_deserializer.deserialize(input)?;
            let (mut rest, txs_len) = self.len_deserializer.deserialize(rest)?;
            let mut transactions = Vec::with_capacity(txs_len as usize);
            for _ in 0..txs_len {
                let (r, tx) = self.tx_deserializer.deserialize(rest)?;
                rest = r;
                transactions.push(tx);
            }
            Ok((
                rest,
                Block {
                    header,
                    transactions,
                },
            ))
        })(buffer)
    }
}
