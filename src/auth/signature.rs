// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HMAC request signing with nonce-based replay protection.
//!
//! ## Canonical input
//!
//! ```text
//! bodyHash  = b64(HMAC-SHA256(key = nonce, msg = body))
//! signature = b64(HMAC-SHA256(key = sharedSecret,
//!                 msg = nonce ";" timestamp ";" METHOD ";" requestURI ";" bodyHash))
//! ```
//!
//! `b64` is standard base64 without padding. The body hash is keyed by the
//! nonce so a captured hash/signature pair cannot be reused under a
//! different nonce.
//!
//! ## Headers
//!
//! | Header | Content |
//! |--------|---------|
//! | `X-Req-Nonce` | random string, at least 20 characters |
//! | `X-Req-Timestamp` | RFC3339, within 60 seconds of server time |
//! | `X-Body-Hash` | `bodyHash` |
//! | `X-Req-Signature` | `signature` |
//!
//! ## Modes
//!
//! Without a shared secret only header presence, nonce length and the
//! timestamp window are checked. This is the bootstrap mode used while the
//! secret is still being established (login, first half of refresh). With a
//! secret the body hash, the replay cache and the signature are checked too,
//! in that order.

use std::sync::Arc;

use axum::http::{HeaderMap, Method};
use base64ct::{Base64Unpadded, Encoding};
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use hmac::{Hmac, Mac};
use rand::{distributions::Alphanumeric, Rng};
use sha2::Sha256;
use tracing::warn;

use super::replay::ReplayGuard;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-req-signature";
pub const NONCE_HEADER: &str = "x-req-nonce";
pub const TIMESTAMP_HEADER: &str = "x-req-timestamp";
pub const BODY_HASH_HEADER: &str = "x-body-hash";

/// Shortest nonce accepted by the verifier.
pub const MIN_NONCE_LEN: usize = 20;

/// Length of nonces produced by [`sign`].
const GENERATED_NONCE_LEN: usize = 32;

/// Allowed distance between request timestamp and server clock, both ways.
const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// Why a signed request was rejected.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing {0} header")]
    MissingHeader(&'static str),

    #[error("nonce shorter than {MIN_NONCE_LEN} characters")]
    NonceTooShort,

    #[error("timestamp is not RFC3339")]
    InvalidTimestamp,

    #[error("timestamp outside the accepted window")]
    TimestampOutOfRange,

    #[error("body hash does not match request body")]
    BodyHashMismatch,

    #[error("nonce already used")]
    Replay,

    #[error("signature does not match")]
    SignatureMismatch,

    #[error("shared secret is empty")]
    EmptySecret,
}

/// The parts of an HTTP request covered by the signature.
#[derive(Debug, Clone, Copy)]
pub struct SignedRequest<'a> {
    pub method: &'a Method,
    /// Path and query exactly as sent by the client.
    pub uri: &'a str,
    pub headers: &'a HeaderMap,
    pub body: &'a [u8],
}

/// Header values produced by the signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSignature {
    pub nonce: String,
    pub timestamp: String,
    pub body_hash: String,
    pub signature: String,
}

impl RequestSignature {
    /// `(header name, value)` pairs ready to attach to a request.
    pub fn headers(&self) -> [(&'static str, &str); 4] {
        [
            (NONCE_HEADER, &self.nonce),
            (TIMESTAMP_HEADER, &self.timestamp),
            (BODY_HASH_HEADER, &self.body_hash),
            (SIGNATURE_HEADER, &self.signature),
        ]
    }
}

/// Sign a request with a fresh nonce and the current time.
pub fn sign(method: &Method, uri: &str, body: &[u8], shared_secret: &[u8]) -> RequestSignature {
    sign_at(method, uri, body, shared_secret, Utc::now())
}

/// Sign a request with a fresh nonce and the given time.
pub fn sign_at(
    method: &Method,
    uri: &str,
    body: &[u8],
    shared_secret: &[u8],
    now: DateTime<Utc>,
) -> RequestSignature {
    let nonce: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_NONCE_LEN)
        .map(char::from)
        .collect();
    let timestamp = now.to_rfc3339_opts(SecondsFormat::Secs, true);
    sign_with(method, uri, body, shared_secret, nonce, timestamp)
}

/// Deterministic signing given nonce and timestamp.
pub fn sign_with(
    method: &Method,
    uri: &str,
    body: &[u8],
    shared_secret: &[u8],
    nonce: String,
    timestamp: String,
) -> RequestSignature {
    let body_hash = body_hash(&nonce, body);
    let signature = request_signature(shared_secret, &nonce, &timestamp, method, uri, &body_hash);
    RequestSignature {
        nonce,
        timestamp,
        body_hash,
        signature,
    }
}

/// `b64(HMAC-SHA256(key = nonce, msg = body))`.
pub fn body_hash(nonce: &str, body: &[u8]) -> String {
    let mut mac = new_mac(nonce.as_bytes());
    mac.update(body);
    Base64Unpadded::encode_string(&mac.finalize().into_bytes())
}

/// Outer signature over the canonical input.
pub fn request_signature(
    shared_secret: &[u8],
    nonce: &str,
    timestamp: &str,
    method: &Method,
    uri: &str,
    body_hash: &str,
) -> String {
    let mut mac = new_mac(shared_secret);
    for (i, part) in [nonce, timestamp, method.as_str(), uri, body_hash].iter().enumerate() {
        if i > 0 {
            mac.update(b";");
        }
        mac.update(part.as_bytes());
    }
    Base64Unpadded::encode_string(&mac.finalize().into_bytes())
}

fn new_mac(key: &[u8]) -> HmacSha256 {
    <HmacSha256 as Mac>::new_from_slice(key).expect("HMAC accepts keys of any length")
}

fn header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, SignatureError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .ok_or(SignatureError::MissingHeader(name))
}

/// Server-side verification of signed requests.
///
/// Holds the process-wide replay cache; cloning shares it.
#[derive(Clone)]
pub struct RequestVerifier {
    replay: Arc<ReplayGuard>,
}

impl RequestVerifier {
    pub fn new(replay: Arc<ReplayGuard>) -> Self {
        Self { replay }
    }

    pub fn replay_guard(&self) -> &ReplayGuard {
        &self.replay
    }

    /// `true` if the request passes; failures are logged, never raised.
    pub fn verify(&self, request: &SignedRequest<'_>, shared_secret: Option<&[u8]>) -> bool {
        self.check(request, shared_secret).is_ok()
    }

    /// Like [`verify`](Self::verify) but reports the failure reason.
    pub fn check(
        &self,
        request: &SignedRequest<'_>,
        shared_secret: Option<&[u8]>,
    ) -> Result<(), SignatureError> {
        self.check_at(request, shared_secret, Utc::now())
    }

    /// Verification against an explicit server clock.
    pub fn check_at(
        &self,
        request: &SignedRequest<'_>,
        shared_secret: Option<&[u8]>,
        now: DateTime<Utc>,
    ) -> Result<(), SignatureError> {
        let result = self.evaluate(request, shared_secret, now);
        if let Err(reason) = &result {
            match reason {
                SignatureError::Replay => warn!(
                    method = %request.method,
                    uri = request.uri,
                    nonce = request.headers.get(NONCE_HEADER).and_then(|v| v.to_str().ok()),
                    "nonce replay detected"
                ),
                _ => warn!(
                    method = %request.method,
                    uri = request.uri,
                    reason = %reason,
                    "signed request rejected"
                ),
            }
        }
        result
    }

    fn evaluate(
        &self,
        request: &SignedRequest<'_>,
        shared_secret: Option<&[u8]>,
        now: DateTime<Utc>,
    ) -> Result<(), SignatureError> {
        let headers = request.headers;
        let signature = header(headers, SIGNATURE_HEADER)?;
        let nonce = header(headers, NONCE_HEADER)?;
        if nonce.chars().count() < MIN_NONCE_LEN {
            return Err(SignatureError::NonceTooShort);
        }
        let timestamp = header(headers, TIMESTAMP_HEADER)?;
        let sent_at = DateTime::parse_from_rfc3339(timestamp)
            .map_err(|_| SignatureError::InvalidTimestamp)?
            .with_timezone(&Utc);

        let max_skew = TimeDelta::seconds(MAX_CLOCK_SKEW_SECS);
        let skew = now.signed_duration_since(sent_at);
        if skew > max_skew || skew < -max_skew {
            return Err(SignatureError::TimestampOutOfRange);
        }

        let Some(secret) = shared_secret else {
            return Ok(());
        };
        if secret.is_empty() {
            return Err(SignatureError::EmptySecret);
        }

        let expected_body_hash = body_hash(nonce, request.body);
        let sent_body_hash = headers
            .get(BODY_HASH_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        if sent_body_hash != expected_body_hash {
            return Err(SignatureError::BodyHashMismatch);
        }

        if !self.replay.check_and_record(timestamp, nonce) {
            return Err(SignatureError::Replay);
        }

        let expected = request_signature(
            secret,
            nonce,
            timestamp,
            request.method,
            request.uri,
            &expected_body_hash,
        );
        if signature != expected {
            return Err(SignatureError::SignatureMismatch);
        }

        Ok(())
    }
}

impl Default for RequestVerifier {
    fn default() -> Self {
        Self::new(Arc::new(ReplayGuard::default()))
    }
}
