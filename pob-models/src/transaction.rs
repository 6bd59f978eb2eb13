// Copyright (c) 2022 MASSA LABS <info@massa.net>

use std::ops::Bound::Included;

use crate::config::{MAX_ACTION_DATA_LEN, MAX_TX_ACTIONS, MAX_TX_SIGNERS};
use crate::error::ModelsError;
use crate::signed::{Signed, SignedDeserializer, SignedSerializer};
use crate::tx_id::TxId;
use nom::error::{context, ContextError, ParseError};
use nom::IResult;
use pob_serialization::{
    Deserializer, SerializeError, Serializer, U32VarIntDeserializer, U32VarIntSerializer,
    U64VarIntDeserializer, U64VarIntSerializer, VecU8Deserializer, VecU8Serializer,
};
use pob_signature::{
    PublicKey, PublicKeyDeserializer, Signature, SignatureDeserializer,
};
use pob_time::{PobTime, PobTimeDeserializer, PobTimeSerializer};

/// A single contract call carried by a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    /// target contract
    pub contract: String,
    /// entry point inside the contract
    pub action_name: String,
    /// call arguments, contract-defined encoding
    pub data: String,
}

/// A transaction as published to the network.
///
/// Signer signatures are part of the content and therefore of the
/// transaction identity; the publisher's signature wraps the whole content
/// through [`SignedTransaction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// publication time, nanoseconds
    pub time: PobTime,
    /// absolute expiration time, nanoseconds
    pub expiration: PobTime,
    /// gas price offered per unit
    pub gas_price: u64,
    /// gas ceiling for the whole transaction
    pub gas_limit: u64,
    /// execution delay, nanoseconds after `time` (0 for immediate)
    pub delay: u64,
    /// contract calls, executed in order
    pub actions: Vec<Action>,
    /// required co-signers
    pub signers: Vec<PublicKey>,
    /// co-signer signatures over the base hash
    pub signatures: Vec<Signature>,
}

impl std::fmt::Display for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Transaction {{ time: {}, expiration: {}, gas_price: {}, gas_limit: {}, actions: {} }}",
            self.time,
            self.expiration,
            self.gas_price,
            self.gas_limit,
            self.actions.len()
        )
    }
}

/// A transaction wrapped with its publisher's signature
pub type SignedTransaction = Signed<Transaction, TxId>;

/// Deserializer type for `SignedTransaction`
pub type SignedTransactionDeserializer = SignedDeserializer<Transaction, TransactionDeserializer>;

impl Transaction {
    /// Hash of the transaction without its co-signer signatures.
    ///
    /// Co-signers sign this hash; their signatures then become part of the
    /// content the publisher signs, so the two cannot be computed over the
    /// same bytes.
    pub fn base_hash(&self) -> Result<pob_hash::Hash, ModelsError> {
        let mut buffer = Vec::new();
        TransactionSerializer::new().serialize_base(self, &mut buffer)?;
        Ok(pob_hash::Hash::compute_from(&buffer))
    }

    /// Appends a co-signer signature over the base hash
    pub fn sign_as_signer(&mut self, keypair: &pob_signature::KeyPair) -> Result<(), ModelsError> {
        let signature = keypair.sign(&self.base_hash()?)?;
        self.signatures.push(signature);
        Ok(())
    }
}

impl SignedTransaction {
    /// Full self-contained check: publisher signature over the content hash,
    /// plus every co-signer signature over the base hash.
    pub fn verify_integrity(&self) -> Result<(), ModelsError> {
        self.verify_signature()?;
        if self.content.signers.len() != self.content.signatures.len() {
            return Err(ModelsError::InvalidStructure(
                "signer and signature counts differ".to_string(),
            ));
        }
        let base_hash = self.content.base_hash()?;
        for (signer, signature) in self
            .content
            .signers
            .iter()
            .zip(self.content.signatures.iter())
        {
            signer.verify_signature(&base_hash, signature)?;
        }
        Ok(())
    }
}

/// Serializer for `Transaction`
#[derive(Clone)]
pub struct TransactionSerializer {
    time_serializer: PobTimeSerializer,
    u64_serializer: U64VarIntSerializer,
    len_serializer: U32VarIntSerializer,
    blob_serializer: VecU8Serializer,
}

impl TransactionSerializer {
    /// Creates a serializer for `Transaction`
    pub const fn new() -> Self {
        Self {
            time_serializer: PobTimeSerializer::new(),
            u64_serializer: U64VarIntSerializer::new(),
            len_serializer: U32VarIntSerializer::new(),
            blob_serializer: VecU8Serializer::new(),
        }
    }

    fn serialize_string(&self, value: &str, buffer: &mut Vec<u8>) -> Result<(), SerializeError> {
        self.blob_serializer
            .serialize(&value.as_bytes().to_vec(), buffer)
    }

    /// Serializes every field except the co-signer signatures
    pub fn serialize_base(
        &self,
        value: &Transaction,
        buffer: &mut Vec<u8>,
    ) -> Result<(), SerializeError> {
        self.time_serializer.serialize(&value.time, buffer)?;
        self.time_serializer.serialize(&value.expiration, buffer)?;
        self.u64_serializer.serialize(&value.gas_price, buffer)?;
        self.u64_serializer.serialize(&value.gas_limit, buffer)?;
        self.u64_serializer.serialize(&value.delay, buffer)?;
        let actions_len: u32 = value.actions.len().try_into().map_err(|_| {
            SerializeError::NumberTooBig("too many actions in transaction".to_string())
        })?;
        self.len_serializer.serialize(&actions_len, buffer)?;
        for action in &value.actions {
            self.serialize_string(&action.contract, buffer)?;
            self.serialize_string(&action.action_name, buffer)?;
            self.serialize_string(&action.data, buffer)?;
        }
        let signers_len: u32 = value.signers.len().try_into().map_err(|_| {
            SerializeError::NumberTooBig("too many signers in transaction".to_string())
        })?;
        self.len_serializer.serialize(&signers_len, buffer)?;
        for signer in &value.signers {
            buffer.extend(signer.to_bytes());
        }
        Ok(())
    }
}

impl Default for TransactionSerializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Serializer<Transaction> for TransactionSerializer {
    fn serialize(&self, value: &Transaction, buffer: &mut Vec<u8>) -> Result<(), SerializeError> {
        self.serialize_base(value, buffer)?;
        let signatures_len: u32 = value.signatures.len().try_into().map_err(|_| {
            SerializeError::NumberTooBig("too many signatures in transaction".to_string())
        })?;
        self.len_serializer.serialize(&signatures_len, buffer)?;
        for signature in &value.signatures {
            buffer.extend(signature.to_bytes());
        }
        Ok(())
    }
}

/// Deserializer for `Transaction`
#[derive(Clone)]
pub struct TransactionDeserializer {
    time_deserializer: PobTimeDeserializer,
    u64_deserializer: U64VarIntDeserializer,
    actions_len_deserializer: U32VarIntDeserializer,
    signers_len_deserializer: U32VarIntDeserializer,
    blob_deserializer: VecU8Deserializer,
    public_key_deserializer: PublicKeyDeserializer,
    signature_deserializer: SignatureDeserializer,
}

impl TransactionDeserializer {
    /// Creates a deserializer for `Transaction`
    pub const fn new() -> Self {
        Self {
            time_deserializer: PobTimeDeserializer::new(),
            u64_deserializer: U64VarIntDeserializer::new(Included(0), Included(u64::MAX)),
            actions_len_deserializer: U32VarIntDeserializer::new(
                Included(0),
                Included(MAX_TX_ACTIONS),
            ),
            signers_len_deserializer: U32VarIntDeserializer::new(
                Included(0),
                Included(MAX_TX_SIGNERS),
            ),
            blob_deserializer: VecU8Deserializer::new(Included(MAX_ACTION_DATA_LEN)),
            public_key_deserializer: PublicKeyDeserializer::new(),
            signature_deserializer: SignatureDeserializer::new(),
        }
    }

    fn deserialize_string<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], String, E> {
        let (rest, bytes) = self.blob_deserializer.deserialize(buffer)?;
        let value = String::from_utf8(bytes).map_err(|_| {
            nom::Err::Error(ParseError::from_error_kind(
                buffer,
                nom::error::ErrorKind::Fail,
            ))
        })?;
        Ok((rest, value))
    }
}

impl Default for TransactionDeserializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Deserializer<Transaction> for TransactionDeserializer {
    fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], Transaction, E> {
        context("Failed transaction deserialization", |input: &'a [u8]| {
            let (rest, time) = self.time_deserializer.deserialize(input)?;
            let (rest, expiration) = self.time_deserializer.deserialize(rest)?;
            let (rest, gas_price) = self.u64_deserializer.deserialize(rest)?;
            let (rest, gas_limit) = self.u64_deserializer.deserialize(rest)?;
            let (rest, delay) = self.u64_deserializer.deserialize(rest)?;
            let (mut rest, actions_len) = self.actions_len_deserializer.deserialize(rest)?;
            let mut actions = Vec::with_capacity(actions_len as usize);
            for _ in 0..actions_len {
                let (r, contract) = self.deserialize_string(rest)?;
                let (r, action_name) = self.deserialize_string(r)?;
                let (r, data) = self.deserialize_string(r)?;
                rest = r;
                actions.push(Action {
                    contract,
                    action_name,
                    data,
                });
            }
            let (mut rest, signers_len) = self.signers_len_deserializer.deserialize(rest)?;
            let mut signers = Vec::with_capacity(signers_len as usize);
            for _ in 0..signers_len {
                let (r, signer) = self.public_key_deserializer.deserialize(rest)?;
                rest = r;
                signers.push(signer);
            }
            let (mut rest, signatures_len) = self.signers_len_deserializer.deserialize(rest)?;
            let mut signatures = Vec::with_capacity(signatures_len as usize);
            for _ in 0..signatures_len {
                let (r, signature) = self.signature_deserializer.deserialize(rest)?;
                rest = r;
                signatures.push(signature);
            }
            Ok((
                rest,
                Transaction {
                    time,
                    expiration,
                    gas_price,
                    gas_limit,
                    delay,
                    actions,
                    signers,
                    signatures,
                },
            ))
        })(buffer)
    }
}

/// Serializer usable for both bare and signed transactions
pub type SignedTransactionSerializer = SignedSerializer;
