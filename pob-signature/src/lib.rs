// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! Signature management.
//!
//! Witness accounts may use either Ed25519 or Secp256k1 keys; the algorithm
//! is selected from the node configuration and carried as a one-byte tag in
//! every serialized key and signature.

#![warn(missing_docs)]

mod error;
pub use error::PobSignatureError;

use ed25519_dalek::{Signer, Verifier};
use nom::error::{context, ContextError, ParseError};
use nom::IResult;
use pob_hash::Hash;
use pob_serialization::Deserializer;
use serde_with::{DeserializeFromStr, SerializeDisplay};
use std::cmp::Ordering;
use std::hash::Hasher;
use std::str::FromStr;

/// Size in bytes of a serialized secret key, without the algorithm tag
pub const SECRET_KEY_SIZE_BYTES: usize = 32;
/// Size in bytes of a serialized Ed25519 public key, without the algorithm tag
pub const ED25519_PUBLIC_KEY_SIZE_BYTES: usize = 32;
/// Size in bytes of a serialized Secp256k1 public key, without the algorithm tag
pub const SECP256K1_PUBLIC_KEY_SIZE_BYTES: usize = 33;
/// Size in bytes of a serialized signature, without the algorithm tag
pub const SIGNATURE_SIZE_BYTES: usize = 64;

const ED25519_TAG: u8 = 0;
const SECP256K1_TAG: u8 = 1;

/// Signature algorithm selected by the node configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, SerializeDisplay, DeserializeFromStr)]
pub enum Algorithm {
    /// Ed25519 (default)
    Ed25519,
    /// Secp256k1
    Secp256k1,
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Algorithm::Ed25519 => write!(f, "ed25519"),
            Algorithm::Secp256k1 => write!(f, "secp256k1"),
        }
    }
}

impl FromStr for Algorithm {
    type Err = PobSignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ed25519" => Ok(Algorithm::Ed25519),
            "secp256k1" => Ok(Algorithm::Secp256k1),
            other => Err(PobSignatureError::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// A keypair able to sign hashes
#[derive(Clone)]
pub enum KeyPair {
    /// Ed25519 keypair
    Ed25519(ed25519_dalek::SigningKey),
    /// Secp256k1 keypair
    Secp256k1(secp256k1::SecretKey),
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "KeyPair({})", self.get_public_key())
    }
}

impl KeyPair {
    /// Generates a fresh random keypair for the given algorithm
    pub fn generate(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Ed25519 => {
                KeyPair::Ed25519(ed25519_dalek::SigningKey::generate(&mut rand::rngs::OsRng))
            }
            Algorithm::Secp256k1 => {
                KeyPair::Secp256k1(secp256k1::SecretKey::new(&mut rand::thread_rng()))
            }
        }
    }

    /// The algorithm of this keypair
    pub fn algorithm(&self) -> Algorithm {
        match self {
            KeyPair::Ed25519(_) => Algorithm::Ed25519,
            KeyPair::Secp256k1(_) => Algorithm::Secp256k1,
        }
    }

    /// Builds a keypair from a bs58check secret key and an algorithm
    pub fn from_bs58_check(secret: &str, algorithm: Algorithm) -> Result<Self, PobSignatureError> {
        let bytes = bs58::decode(secret)
            .with_check(None)
            .into_vec()
            .map_err(|err| PobSignatureError::ParsingError(format!("{}", err)))?;
        let bytes: [u8; SECRET_KEY_SIZE_BYTES] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| PobSignatureError::ParsingError("wrong secret key size".to_string()))?;
        match algorithm {
            Algorithm::Ed25519 => Ok(KeyPair::Ed25519(ed25519_dalek::SigningKey::from_bytes(
                &bytes,
            ))),
            Algorithm::Secp256k1 => Ok(KeyPair::Secp256k1(
                secp256k1::SecretKey::from_slice(&bytes)
                    .map_err(|err| PobSignatureError::ParsingError(format!("{}", err)))?,
            )),
        }
    }

    /// Serializes the secret key as bs58check
    pub fn to_bs58_check(&self) -> String {
        let bytes = match self {
            KeyPair::Ed25519(key) => key.to_bytes(),
            KeyPair::Secp256k1(key) => key.secret_bytes(),
        };
        bs58::encode(bytes).with_check().into_string()
    }

    /// Signs a hash with this keypair
    pub fn sign(&self, hash: &Hash) -> Result<Signature, PobSignatureError> {
        match self {
            KeyPair::Ed25519(key) => Ok(Signature::Ed25519(key.sign(hash.to_bytes()))),
            KeyPair::Secp256k1(key) => {
                let message = secp256k1::Message::from_digest_slice(hash.to_bytes())
                    .map_err(|err| PobSignatureError::ParsingError(format!("{}", err)))?;
                Ok(Signature::Secp256k1(
                    secp256k1::SECP256K1.sign_ecdsa(&message, key),
                ))
            }
        }
    }

    /// The public key matching this keypair
    pub fn get_public_key(&self) -> PublicKey {
        match self {
            KeyPair::Ed25519(key) => PublicKey::Ed25519(key.verifying_key()),
            KeyPair::Secp256k1(key) => PublicKey::Secp256k1(secp256k1::PublicKey::from_secret_key(
                secp256k1::SECP256K1,
                key,
            )),
        }
    }
}

/// A public key able to verify signatures
#[derive(Clone, Copy, PartialEq, Eq, SerializeDisplay, DeserializeFromStr)]
pub enum PublicKey {
    /// Ed25519 public key
    Ed25519(ed25519_dalek::VerifyingKey),
    /// Secp256k1 public key
    Secp256k1(secp256k1::PublicKey),
}

impl PublicKey {
    /// Serializes as algorithm tag + raw key bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            PublicKey::Ed25519(key) => {
                let mut bytes = Vec::with_capacity(1 + ED25519_PUBLIC_KEY_SIZE_BYTES);
                bytes.push(ED25519_TAG);
                bytes.extend_from_slice(key.as_bytes());
                bytes
            }
            PublicKey::Secp256k1(key) => {
                let mut bytes = Vec::with_capacity(1 + SECP256K1_PUBLIC_KEY_SIZE_BYTES);
                bytes.push(SECP256K1_TAG);
                bytes.extend_from_slice(&key.serialize());
                bytes
            }
        }
    }

    /// Deserializes from algorithm tag + raw key bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self, PobSignatureError> {
        match data.split_first() {
            Some((&ED25519_TAG, rest)) => {
                let bytes: [u8; ED25519_PUBLIC_KEY_SIZE_BYTES] = rest.try_into().map_err(|_| {
                    PobSignatureError::ParsingError("wrong ed25519 public key size".to_string())
                })?;
                Ok(PublicKey::Ed25519(
                    ed25519_dalek::VerifyingKey::from_bytes(&bytes)
                        .map_err(|err| PobSignatureError::ParsingError(format!("{}", err)))?,
                ))
            }
            Some((&SECP256K1_TAG, rest)) => Ok(PublicKey::Secp256k1(
                secp256k1::PublicKey::from_slice(rest)
                    .map_err(|err| PobSignatureError::ParsingError(format!("{}", err)))?,
            )),
            _ => Err(PobSignatureError::ParsingError(
                "empty or unknown public key encoding".to_string(),
            )),
        }
    }

    /// Verifies that `signature` signs `hash` under this key
    pub fn verify_signature(
        &self,
        hash: &Hash,
        signature: &Signature,
    ) -> Result<(), PobSignatureError> {
        match (self, signature) {
            (PublicKey::Ed25519(key), Signature::Ed25519(sig)) => key
                .verify(hash.to_bytes(), sig)
                .map_err(|err| PobSignatureError::VerificationError(format!("{}", err))),
            (PublicKey::Secp256k1(key), Signature::Secp256k1(sig)) => {
                let message = secp256k1::Message::from_digest_slice(hash.to_bytes())
                    .map_err(|err| PobSignatureError::ParsingError(format!("{}", err)))?;
                secp256k1::SECP256K1
                    .verify_ecdsa(&message, sig, key)
                    .map_err(|err| PobSignatureError::VerificationError(format!("{}", err)))
            }
            _ => Err(PobSignatureError::VerificationError(
                "key and signature algorithms differ".to_string(),
            )),
        }
    }
}

impl std::hash::Hash for PublicKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write(&self.to_bytes());
    }
}

impl PartialOrd for PublicKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PublicKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_bytes().cmp(&other.to_bytes())
    }
}

impl std::fmt::Display for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}",
            bs58::encode(self.to_bytes()).with_check().into_string()
        )
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

impl FromStr for PublicKey {
    type Err = PobSignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .with_check(None)
            .into_vec()
            .map_err(|err| PobSignatureError::ParsingError(format!("{}", err)))?;
        PublicKey::from_bytes(&bytes)
    }
}

/// A signature over a hash
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Signature {
    /// Ed25519 signature
    Ed25519(ed25519_dalek::Signature),
    /// Secp256k1 ECDSA signature, compact form
    Secp256k1(secp256k1::ecdsa::Signature),
}

impl Signature {
    /// Serializes as algorithm tag + compact signature bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(1 + SIGNATURE_SIZE_BYTES);
        match self {
            Signature::Ed25519(sig) => {
                bytes.push(ED25519_TAG);
                bytes.extend_from_slice(&sig.to_bytes());
            }
            Signature::Secp256k1(sig) => {
                bytes.push(SECP256K1_TAG);
                bytes.extend_from_slice(&sig.serialize_compact());
            }
        }
        bytes
    }

    /// Deserializes from algorithm tag + compact signature bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self, PobSignatureError> {
        match data.split_first() {
            Some((&ED25519_TAG, rest)) => {
                let bytes: [u8; SIGNATURE_SIZE_BYTES] = rest.try_into().map_err(|_| {
                    PobSignatureError::ParsingError("wrong ed25519 signature size".to_string())
                })?;
                Ok(Signature::Ed25519(ed25519_dalek::Signature::from_bytes(
                    &bytes,
                )))
            }
            Some((&SECP256K1_TAG, rest)) => Ok(Signature::Secp256k1(
                secp256k1::ecdsa::Signature::from_compact(rest)
                    .map_err(|err| PobSignatureError::ParsingError(format!("{}", err)))?,
            )),
            _ => Err(PobSignatureError::ParsingError(
                "empty or unknown signature encoding".to_string(),
            )),
        }
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}",
            bs58::encode(self.to_bytes()).with_check().into_string()
        )
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

/// Deserializer for `PublicKey`
#[derive(Default, Clone)]
pub struct PublicKeyDeserializer;

impl PublicKeyDeserializer {
    /// Creates a deserializer for `PublicKey`
    pub const fn new() -> Self {
        Self
    }
}

impl Deserializer<PublicKey> for PublicKeyDeserializer {
    fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], PublicKey, E> {
        context("Failed public key deserialization", |input: &'a [u8]| {
            let key_len = match input.first() {
                Some(&ED25519_TAG) => ED25519_PUBLIC_KEY_SIZE_BYTES,
                Some(&SECP256K1_TAG) => SECP256K1_PUBLIC_KEY_SIZE_BYTES,
                _ => {
                    return Err(nom::Err::Error(ParseError::from_error_kind(
                        input,
                        nom::error::ErrorKind::Fail,
                    )))
                }
            };
            let total = 1 + key_len;
            if input.len() < total {
                return Err(nom::Err::Error(ParseError::from_error_kind(
                    input,
                    nom::error::ErrorKind::LengthValue,
                )));
            }
            let key = PublicKey::from_bytes(&input[..total]).map_err(|_| {
                nom::Err::Error(ParseError::from_error_kind(
                    input,
                    nom::error::ErrorKind::Fail,
                ))
            })?;
            Ok((&input[total..], key))
        })(buffer)
    }
}

/// Deserializer for `Signature`
#[derive(Default, Clone)]
pub struct SignatureDeserializer;

impl SignatureDeserializer {
    /// Creates a deserializer for `Signature`
    pub const fn new() -> Self {
        Self
    }
}

impl Deserializer<Signature> for SignatureDeserializer {
    fn deserialize<'a, E: ParseError<&'a [u8]> + ContextError<&'a [u8]>>(
        &self,
        buffer: &'a [u8],
    ) -> IResult<&'a [u8], Signature, E> {
        context("Failed signature deserialization", |input: &'a [u8]| {
            let total = 1 + SIGNATURE_SIZE_BYTES;
            if input.len() < total {
                return Err(nom::Err::Error(ParseError::from_error_kind(
                    input,
                    nom::error::ErrorKind::LengthValue,
                )));
            }
            let signature = Signature::from_bytes(&input[..total]).map_err(|_| {
                nom::Err::Error(ParseError::from_error_kind(
                    input,
                    nom::error::ErrorKind::Fail,
                ))
            })?;
            Ok((&input[total..], signature))
        })(buffer)
    }
}
