// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use super::gate::Denial;
use super::signature::SignatureError;
use super::token::TokenError;
use crate::store::StoreError;

/// Authentication error type.
///
/// Expected authentication failures are 4xx and worded uniformly so callers
/// cannot tell an unknown user from a wrong password. `SystemError` detail
/// is logged and never sent to the client.
#[derive(Debug)]
pub enum AuthError {
    /// Missing or invalid headers, bad timestamp, unparseable body
    MalformedRequest(String),
    /// Nonce already seen
    ReplayDetected,
    /// Body hash or signature does not match
    SignatureMismatch,
    /// Unknown user, wrong password, email/token mismatch
    InvalidCredentials,
    /// Expired, forged or otherwise unusable session token
    InvalidToken,
    /// Endpoint requires a session and none was presented
    MissingSession,
    /// Principal lacks the privilege for this resource and action
    MissingPrivilege,
    /// Store unavailable, signing failure
    SystemError(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MalformedRequest(_) => "malformed_request",
            AuthError::ReplayDetected => "replay_detected",
            AuthError::SignatureMismatch => "signature_mismatch",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::InvalidToken => "invalid_token",
            AuthError::MissingSession => "missing_session",
            AuthError::MissingPrivilege => "missing_privilege",
            AuthError::SystemError(_) => "system_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MalformedRequest(_)
            | AuthError::ReplayDetected
            | AuthError::SignatureMismatch
            | AuthError::InvalidCredentials => StatusCode::BAD_REQUEST,
            AuthError::InvalidToken | AuthError::MissingSession => StatusCode::UNAUTHORIZED,
            AuthError::MissingPrivilege => StatusCode::FORBIDDEN,
            AuthError::SystemError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Collapse every non-system failure into `InvalidCredentials`.
    ///
    /// Used by the login and refresh flows so a client cannot learn which
    /// step failed.
    pub fn into_credentials_error(self) -> AuthError {
        match self {
            AuthError::SystemError(_) => self,
            _ => AuthError::InvalidCredentials,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MalformedRequest(msg) => write!(f, "Malformed request: {msg}"),
            AuthError::ReplayDetected => write!(f, "Request was already processed"),
            AuthError::SignatureMismatch => write!(f, "Request signature is invalid"),
            AuthError::InvalidCredentials => write!(f, "Invalid credentials"),
            AuthError::InvalidToken => write!(f, "Session token is invalid"),
            AuthError::MissingSession => write!(f, "A session is required"),
            AuthError::MissingPrivilege => {
                write!(f, "Insufficient privileges for this operation")
            }
            AuthError::SystemError(msg) => write!(f, "Internal authentication error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<SignatureError> for AuthError {
    fn from(e: SignatureError) -> Self {
        match e {
            SignatureError::Replay => AuthError::ReplayDetected,
            SignatureError::BodyHashMismatch
            | SignatureError::SignatureMismatch
            | SignatureError::EmptySecret => AuthError::SignatureMismatch,
            other => AuthError::MalformedRequest(other.to_string()),
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::MissingSecret | TokenError::Encode(_) => AuthError::SystemError(e.to_string()),
            _ => AuthError::InvalidToken,
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => AuthError::InvalidCredentials,
            StoreError::VersionConflict => AuthError::MalformedRequest(e.to_string()),
            StoreError::Unavailable(_) => AuthError::SystemError(e.to_string()),
        }
    }
}

impl From<Denial> for AuthError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::MissingPrivilege => AuthError::MissingPrivilege,
            Denial::NoSharedSecret => AuthError::SignatureMismatch,
            Denial::Signature(e) => AuthError::from(e),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            AuthError::SystemError(detail) => {
                error!(error = %detail, "authentication system error");
                "Internal authentication error".to_string()
            }
            other => other.to_string(),
        };
        let body = Json(AuthErrorBody {
            error: message,
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}
