// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ephemeral-static ECDH key agreement on NIST P-256.
//!
//! The server generates one key pair at startup and hands its public key to
//! clients. A client sends its own (ephemeral) public key with the signed
//! login request and both sides derive the same shared secret, which then
//! keys every signed request of that session.
//!
//! ## Transport encoding
//!
//! Public keys travel as the two affine coordinates, each base64url-encoded
//! without padding, joined by a comma:
//!
//! ```text
//! <base64url(X)>,<base64url(Y)>
//! ```

use std::fmt;

use base64ct::{Base64Unpadded, Base64UrlUnpadded, Encoding};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{PublicKey, SecretKey};
use rand::rngs::OsRng;

/// Length in bytes of one affine coordinate on P-256.
const COORDINATE_LEN: usize = 32;

/// SEC1 tag for an uncompressed point.
const SEC1_UNCOMPRESSED: u8 = 0x04;

/// Key exchange failures.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum KeyExchangeError {
    #[error("invalid public key format: {0}")]
    InvalidKeyFormat(&'static str),

    #[error("key exchange failed: {0}")]
    KeyExchange(&'static str),
}

/// Raw ECDH output used as the per-user HMAC key.
///
/// Persisted on the user record as unpadded standard base64.
#[derive(Clone, PartialEq, Eq)]
pub struct SharedSecret(Vec<u8>);

impl SharedSecret {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Encoding used when the secret is stored with the user.
    pub fn to_base64(&self) -> String {
        Base64Unpadded::encode_string(&self.0)
    }

    /// Decode a stored secret. Empty or undecodable values yield `None`.
    pub fn from_base64(encoded: &str) -> Option<Self> {
        if encoded.is_empty() {
            return None;
        }
        Base64Unpadded::decode_vec(encoded).ok().map(Self)
    }
}

impl From<Vec<u8>> for SharedSecret {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret(**********)")
    }
}

/// Process-lifetime P-256 key pair.
///
/// Immutable after construction, so it is shared across request tasks
/// without synchronization.
pub struct KeyExchange {
    secret: SecretKey,
    public_encoded: String,
}

impl KeyExchange {
    /// Generate a fresh key pair from the OS RNG.
    pub fn generate() -> Self {
        Self::from_secret(SecretKey::random(&mut OsRng))
    }

    /// Build from an existing secret key.
    pub fn from_secret(secret: SecretKey) -> Self {
        let public_encoded = encode_public_key(&secret.public_key());
        Self {
            secret,
            public_encoded,
        }
    }

    /// The server's public key in transport encoding.
    pub fn public_key(&self) -> &str {
        &self.public_encoded
    }

    /// Derive the shared secret for a client's transport-encoded public key.
    pub fn derive_shared(&self, client_public_key: &str) -> Result<SharedSecret, KeyExchangeError> {
        let client = decode_public_key(client_public_key)?;
        let shared = p256::ecdh::diffie_hellman(self.secret.to_nonzero_scalar(), client.as_affine());
        let bytes = shared.raw_secret_bytes().to_vec();

        if bytes.iter().all(|b| *b == 0) {
            return Err(KeyExchangeError::KeyExchange("degenerate shared secret"));
        }

        Ok(SharedSecret(bytes))
    }
}

impl fmt::Debug for KeyExchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyExchange")
            .field("public_key", &self.public_encoded)
            .finish_non_exhaustive()
    }
}

/// Encode a public key as `base64url(X),base64url(Y)`.
pub fn encode_public_key(public: &PublicKey) -> String {
    let point = public.to_encoded_point(false);
    // Neither coordinate is absent for a valid, uncompressed, non-identity point.
    let x = point.x().map(|x| x.as_slice()).unwrap_or_default();
    let y = point.y().map(|y| y.as_slice()).unwrap_or_default();
    format!(
        "{},{}",
        Base64UrlUnpadded::encode_string(x),
        Base64UrlUnpadded::encode_string(y)
    )
}

/// Decode a transport-encoded public key and check it lies on the curve.
pub fn decode_public_key(encoded: &str) -> Result<PublicKey, KeyExchangeError> {
    let (x, y) = encoded
        .split_once(',')
        .ok_or(KeyExchangeError::InvalidKeyFormat("expected two comma-separated coordinates"))?;

    let x = decode_coordinate(x)?;
    let y = decode_coordinate(y)?;

    let mut sec1 = Vec::with_capacity(1 + 2 * COORDINATE_LEN);
    sec1.push(SEC1_UNCOMPRESSED);
    sec1.extend_from_slice(&x);
    sec1.extend_from_slice(&y);

    PublicKey::from_sec1_bytes(&sec1)
        .map_err(|_| KeyExchangeError::InvalidKeyFormat("point is not on the curve"))
}

fn decode_coordinate(segment: &str) -> Result<Vec<u8>, KeyExchangeError> {
    let bytes = Base64UrlUnpadded::decode_vec(segment)
        .map_err(|_| KeyExchangeError::InvalidKeyFormat("coordinate is not base64url"))?;
    if bytes.len() != COORDINATE_LEN {
        return Err(KeyExchangeError::InvalidKeyFormat("coordinate must be 32 bytes"));
    }
    Ok(bytes)
}
