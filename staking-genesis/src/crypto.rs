//! Cryptographic primitives for entity descriptors
//!
//! This module provides:
//! - Ed25519 public keys with their base64 text form
//! - Context-separated SHA-512/256 hashing
//! - Signed envelopes as found in entity genesis descriptors
//! - Key pairs for producing signed envelopes

use crate::{Error, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha512_256};
use std::fmt;

/// Signature context of self-signed genesis entity descriptors
pub const GENESIS_ENTITY_SIGNATURE_CONTEXT: &[u8] = b"oasis-core/registry: register genesis entity";

/// Ed25519 public key length
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Ed25519 public key
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PublicKey([u8; PUBLIC_KEY_SIZE]);

impl PublicKey {
    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; PUBLIC_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.0
    }

    /// Base64 text form
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    /// Parse the base64 text form
    pub fn from_base64(s: &str) -> Result<Self> {
        let raw = STANDARD
            .decode(s.trim())
            .map_err(|e| Error::parse("public key", s, e))?;
        let bytes: [u8; PUBLIC_KEY_SIZE] = raw.try_into().map_err(|raw: Vec<u8>| {
            Error::parse("public key", s, format!("expected 32 bytes, got {}", raw.len()))
        })?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_base64())
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        PublicKey::from_base64(&text).map_err(serde::de::Error::custom)
    }
}

/// SHA-512/256 over each part in order
pub fn hash_with_context(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha512_256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Signature over a context-prefixed message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvelopeSignature {
    /// Signer
    pub public_key: PublicKey,
    /// Base64 Ed25519 signature
    pub signature: String,
}

/// Signed blob with an untrusted payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedEnvelope {
    /// Base64 payload, not to be trusted before [`SignedEnvelope::open`]
    pub untrusted_raw_value: String,
    /// Signature over the payload
    pub signature: EnvelopeSignature,
}

impl SignedEnvelope {
    /// Verify the signature under `context` and return the signer and payload
    pub fn open(&self, context: &[u8]) -> Result<(PublicKey, Vec<u8>)> {
        let raw = STANDARD
            .decode(&self.untrusted_raw_value)
            .map_err(|e| Error::parse("untrusted_raw_value", &self.untrusted_raw_value, e))?;
        let sig_bytes: [u8; 64] = STANDARD
            .decode(&self.signature.signature)
            .map_err(|e| Error::parse("signature", &self.signature.signature, e))?
            .try_into()
            .map_err(|_| {
                Error::parse("signature", &self.signature.signature, "expected 64 bytes")
            })?;

        let verifying_key = VerifyingKey::from_bytes(self.signature.public_key.as_bytes())
            .map_err(|e| Error::parse("public key", self.signature.public_key.to_base64(), e))?;
        let message = hash_with_context(&[context, raw.as_slice()]);

        verifying_key
            .verify(&message, &DalekSignature::from_bytes(&sig_bytes))
            .map_err(|e| Error::parse("signature", &self.signature.signature, e))?;

        Ok((self.signature.public_key, raw))
    }
}

/// Ed25519 key pair for signing
#[derive(Debug)]
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        Self::from_seed(&rand::random::<[u8; 32]>())
    }

    /// Create from seed (32 bytes) - deterministic generation
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Public key
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign `payload` under `context` into an envelope
    pub fn sign_envelope(&self, context: &[u8], payload: &[u8]) -> SignedEnvelope {
        let message = hash_with_context(&[context, payload]);
        let signature = self.signing_key.sign(&message);

        SignedEnvelope {
            untrusted_raw_value: STANDARD.encode(payload),
            signature: EnvelopeSignature {
                public_key: self.public_key(),
                signature: STANDARD.encode(signature.to_bytes()),
            },
        }
    }
}
