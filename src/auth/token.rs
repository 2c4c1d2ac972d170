// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session and refresh tokens (HS256 JWT).
//!
//! Both token kinds carry the same claims and differ only in lifetime. The
//! accepted algorithm is pinned to HS256 in the validation settings; tokens
//! declaring any other algorithm (including `none`) are rejected before the
//! signature is looked at.

use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fixed `iss` claim.
pub const ISSUER: &str = "mwui";
/// Fixed `aud` claim.
pub const AUDIENCE: &str = "mwui-clients";

/// The only algorithm issued and accepted.
const ALGORITHM: Algorithm = Algorithm::HS256;

/// Clock skew tolerance applied to `exp` and `nbf`, in seconds.
pub const LEEWAY_SECS: u64 = 30;

/// `nbf` is back-dated by this many seconds at issuance.
const NOT_BEFORE_BACKDATE_SECS: i64 = 30;

/// Registered claims carried by session and refresh tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User email
    pub sub: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token signing secret is empty")]
    MissingSecret,

    #[error("token has expired")]
    Expired,

    #[error("token is not yet valid")]
    NotYetValid,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token issuer is invalid")]
    InvalidIssuer,

    #[error("token audience is invalid")]
    InvalidAudience,

    #[error("token algorithm is not accepted")]
    InvalidAlgorithm,

    #[error("token is malformed")]
    Malformed,

    #[error("token encoding failed: {0}")]
    Encode(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::ImmatureSignature => TokenError::NotYetValid,
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::InvalidIssuer => TokenError::InvalidIssuer,
            ErrorKind::InvalidAudience => TokenError::InvalidAudience,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => TokenError::InvalidAlgorithm,
            _ => TokenError::Malformed,
        }
    }
}

/// A freshly issued session/refresh pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub token: String,
    pub refresh_token: String,
}

/// Issues and validates tokens with the server-wide secret.
pub struct SessionTokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    session_ttl: TimeDelta,
    refresh_ttl: TimeDelta,
}

impl SessionTokenService {
    pub fn new(secret: &[u8], session_ttl: TimeDelta, refresh_ttl: TimeDelta) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }

        let mut validation = Validation::new(ALGORITHM);
        validation.algorithms = vec![ALGORITHM];
        validation.leeway = LEEWAY_SECS;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_issuer(&[ISSUER]);
        validation.set_audience(&[AUDIENCE]);
        validation.set_required_spec_claims(&["sub", "iss", "aud", "nbf", "exp"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            session_ttl,
            refresh_ttl,
        })
    }

    pub fn session_ttl(&self) -> TimeDelta {
        self.session_ttl
    }

    pub fn refresh_ttl(&self) -> TimeDelta {
        self.refresh_ttl
    }

    /// Issue a token for `subject` valid for `ttl`.
    pub fn issue(&self, subject: &str, ttl: TimeDelta) -> Result<String, TokenError> {
        self.issue_at(subject, ttl, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_at(&self, subject: &str, ttl: TimeDelta, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = Claims {
            sub: subject.to_string(),
            iss: ISSUER.to_string(),
            aud: AUDIENCE.to_string(),
            iat: now.timestamp(),
            nbf: (now - TimeDelta::seconds(NOT_BEFORE_BACKDATE_SECS)).timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::new(ALGORITHM), &claims, &self.encoding).map_err(|e| TokenError::Encode(e.to_string()))
    }

    /// Issue a session token and a refresh token for `subject`.
    pub fn issue_pair(&self, subject: &str) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            token: self.issue(subject, self.session_ttl)?,
            refresh_token: self.issue(subject, self.refresh_ttl)?,
        })
    }

    /// Validate a token and return its claims.
    pub fn parse(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "token parse error");
                TokenError::from(e)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    const SECRET: &[u8] = b"test-jwt-secret";

    fn service() -> SessionTokenService {
        SessionTokenService::new(SECRET, TimeDelta::minutes(5), TimeDelta::minutes(60)).unwrap()
    }

    #[test]
    fn empty_secret_is_refused() {
        assert!(matches!(
            SessionTokenService::new(b"", TimeDelta::minutes(5), TimeDelta::minutes(60)),
            Err(TokenError::MissingSecret)
        ));
    }

    #[test]
    fn round_trip_recovers_subject_and_claims() {
        let svc = service();
        let now = Utc::now();
        let token = svc.issue_at("admin@example.com", TimeDelta::minutes(5), now).unwrap();

        let claims = svc.parse(&token).unwrap();
        assert_eq!(claims.sub, "admin@example.com");
        assert_eq!(claims.iss, ISSUER);
        assert_eq!(claims.aud, AUDIENCE);
        assert_eq!(claims.iat, now.timestamp());
        assert_eq!(claims.nbf, now.timestamp() - 30);
        assert_eq!(claims.exp, now.timestamp() + 300);
    }

    #[test]
    fn pair_uses_configured_lifetimes() {
        let svc = service();
        let pair = svc.issue_pair("a@b.c").unwrap();
        let session = svc.parse(&pair.token).unwrap();
        let refresh = svc.parse(&pair.refresh_token).unwrap();
        assert_eq!(session.exp - session.iat, 5 * 60);
        assert_eq!(refresh.exp - refresh.iat, 60 * 60);
    }

    #[test]
    fn expired_beyond_leeway_is_rejected() {
        let svc = service();
        // Expired 31 seconds ago.
        let issued = Utc::now() - TimeDelta::minutes(5) - TimeDelta::seconds(31);
        let token = svc.issue_at("a@b.c", TimeDelta::minutes(5), issued).unwrap();
        assert_eq!(svc.parse(&token), Err(TokenError::Expired));
    }

    #[test]
    fn expired_within_leeway_is_accepted() {
        let svc = service();
        // Expired 10 seconds ago, inside the 30 second leeway.
        let issued = Utc::now() - TimeDelta::minutes(5) - TimeDelta::seconds(10);
        let token = svc.issue_at("a@b.c", TimeDelta::minutes(5), issued).unwrap();
        assert!(svc.parse(&token).is_ok());
    }

    #[test]
    fn not_yet_valid_is_rejected() {
        let svc = service();
        let issued = Utc::now() + TimeDelta::minutes(10);
        let token = svc.issue_at("a@b.c", TimeDelta::minutes(5), issued).unwrap();
        assert_eq!(svc.parse(&token), Err(TokenError::NotYetValid));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let other = SessionTokenService::new(b"another-secret", TimeDelta::minutes(5), TimeDelta::minutes(60)).unwrap();
        let token = other.issue("a@b.c", TimeDelta::minutes(5)).unwrap();
        assert_eq!(service().parse(&token), Err(TokenError::InvalidSignature));
    }

    /// Unsigned token with an arbitrary header.
    fn forge_unsigned(header: &str, claims: &Claims) -> String {
        let head = URL_SAFE_NO_PAD.encode(header);
        let body = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).unwrap());
        format!("{head}.{body}.")
    }

    fn valid_claims() -> Claims {
        let now = Utc::now().timestamp();
        Claims {
            sub: "a@b.c".into(),
            iss: ISSUER.into(),
            aud: AUDIENCE.into(),
            iat: now,
            nbf: now - 30,
            exp: now + 300,
        }
    }

    #[test]
    fn alg_none_is_rejected() {
        let token = forge_unsigned(r#"{"alg":"none","typ":"JWT"}"#, &valid_claims());
        assert!(service().parse(&token).is_err());
    }

    #[test]
    fn other_hmac_algorithm_is_rejected() {
        let token = encode(
            &Header::new(Algorithm::HS384),
            &valid_claims(),
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();
        assert_eq!(service().parse(&token), Err(TokenError::InvalidAlgorithm));
    }

    #[test]
    fn wrong_issuer_or_audience_is_rejected() {
        let key = EncodingKey::from_secret(SECRET);

        let mut claims = valid_claims();
        claims.iss = "someone-else".into();
        let token = encode(&Header::new(ALGORITHM), &claims, &key).unwrap();
        assert_eq!(service().parse(&token), Err(TokenError::InvalidIssuer));

        let mut claims = valid_claims();
        claims.aud = "other-clients".into();
        let token = encode(&Header::new(ALGORITHM), &claims, &key).unwrap();
        assert_eq!(service().parse(&token), Err(TokenError::InvalidAudience));
    }

    #[test]
    fn garbage_is_malformed() {
        assert_eq!(service().parse("not.a.jwt"), Err(TokenError::Malformed));
        assert_eq!(service().parse(""), Err(TokenError::Malformed));
    }
}
