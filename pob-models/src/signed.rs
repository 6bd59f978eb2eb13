// Copyright (c) 2022 MASSA LABS <info@massa.net>

use std::fmt::Display;
use std::marker::PhantomData;

use crate::error::ModelsError;
use nom::{
    error::{context, ContextError, ParseError},
    sequence::tuple,
    IResult,
};
use pob_hash::Hash;
use pob_serialization::{
    Deserializer, SerializeError, Serializer,
};
use pob_signature::{
    KeyPair, PublicKey, PublicKeyDeserializer, Signature, SignatureDeserializer,
};

/// Identifier derived from a content hash
pub trait Id: Clone + Copy {
    /// New id from a hash
    fn new(hash: Hash) -> Self;
    /// A reference to the underlying hash
    fn get_hash(&self) -> &Hash;
}

/// A content of type `T` along with the signature of its creator.
///
/// The identity of the structure is the hash of the serialized content; the
/// signature covers that hash. The exact bytes the content was serialized
/// from (or deserialized to) are retained so that re-encoding a received
/// structure reproduces it byte for byte, opaque extensions included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signed<T, U>
where
    T: Display,
    U: Id,
{
    /// content
    pub content: T,
    /// signature of the creator over the content hash
    pub signature: Signature,
    /// the content creator public key
    pub creator_public_key: PublicKey,
    /// id, the hash of the serialized content
    pub id: U,
    /// content serialized
    pub serialized_data: Vec<u8>,
}

impl<T, U> Signed<T, U>
where
    T: Display,
    U: Id,
{
    /// Creates a signed version of the content
    pub fn new_signed<SC: Serializer<T>>(
        content: T,
        content_serializer: &SC,
        keypair: &KeyPair,
    ) -> Result<Self, ModelsError> {
        let mut serialized_data = Vec::new();
        content_serializer.serialize(&content, &mut serialized_data)?;
        let hash = Hash::compute_from(&serialized_data);
        Ok(Signed {
            signature: keypair.sign(&hash)?,
            creator_public_key: keypair.get_public_key(),
            content,
            id: U::new(hash),
            serialized_data,
        })
    }

    /// Checks that the creator signature covers the content hash
    pub fn verify_signature(&self) -> Result<(), ModelsError> {
        Ok(self
            .creator_public_key
            .verify_signature(self.id.get_hash(), &self.signature)?)
    }

    /// Full serialized size in bytes
    pub fn serialized_size(&self) -> usize {
        self.serialized_data
            .len()
            .saturating_add(self.signature.to_bytes().len())
            .saturating_add(self.creator_public_key.to_bytes().len())
    }
}

impl<T, U> Display for Signed<T, U>
where
    T: Display,
    U: Id,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Signature: {}", self.signature)?;
        writeln!(f, "Creator pubkey: {}", self.creator_public_key)?;
        writeln!(f, "Id: {}", self.id.get_hash())?;
        writeln!(f, "{}", self.content)?;
        Ok(())
    }
}

/// Serializer for `Signed` structures.
///
/// The retained serialized content bytes are written back verbatim, no
/// content serializer is needed.
#[derive(Default, Clone)]
pub struct SignedSerializer;

impl SignedSerializer {
    /// Creates a `SignedSerializer`
    pub const fn new() -> Self {
        Self
    }
}

impl<T, U> Serializer<Signed<T, U>> for SignedSerializer
where
    T: Display,
    U: Id,
{
    fn serialize(&self, value: &Signed<T, U>, buffer: &mut Vec<u8>) -> Result<(), SerializeError> {
        buffer.extend(value.signature.to_bytes());
        buffer.extend(value.creator_public_key.to_bytes());
        buffer.extend(&value.serialized_data);
        Ok(())
    }
}

/// Deserializer for `Signed` structures
#[derive(Clone)]
pub struct SignedDeserializer<T, DT>
where
    T: Display,
    DT: Deserializer<T>,
{
    signature_deserializer: SignatureDeserializer,
    public_key_deserializer: PublicKeyDeserializer,
    content_deserializer: DT,
    phantom: PhantomData<T>,
}

impl<T, DT> SignedDeserializer<T, DT>
where
    T: Display,
    DT: Deserializer<T>,
{
    /// Creates a `SignedDeserializer` from a content deserializer
    pub const fn new(content_deserializer: DT) -> Self {
        Self {
            signature_deserializer: SignatureDeserializer::new(),
            public_key_deserializer: PublicKeyDeserializer::new(),
            content_deserializer,
            phantom: PhantomData,
        }
    }
}

impl<T, DT, U> Deserializer<Signed<T, U>> for SignedDeserializer<T, DT>
where
    T: Display,
    DT: Deserializer<T>,
    U: Id,
{
    fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], Signed<T, U>, E> {
        let (serialized_data, (signature, creator_public_key)) = context(
            "Failed signed structure deserialization",
            tuple((
                context("Failed signature deserialization", |input| {
                    self.signature_deserializer.deserialize(input)
                }),
                context("Failed public key deserialization", |input| {
                    self.public_key_deserializer.deserialize(input)
                }),
            )),
        )(buffer)?;
        let (rest, content) = self.content_deserializer.deserialize(serialized_data)?;
        // keep the exact content bytes so that re-encoding is byte-identical
        let content_serialized = serialized_data[..serialized_data.len() - rest.len()].to_vec();
        let hash = Hash::compute_from(&content_serialized);
        Ok((
            rest,
            Signed {
                content,
                signature,
                creator_public_key,
                id: U::new(hash),
                serialized_data: content_serialized,
            },
        ))
    }
}
