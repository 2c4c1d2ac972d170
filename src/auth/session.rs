// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session resolution.
//!
//! A session token is presented as `Authorization: Bearer <token>` or, if
//! that header is absent, as the `session` cookie. Resolution validates the
//! token, looks the subject up in the store and requires the subject to
//! still equal the user's current email. A token issued before an email
//! change therefore stops working.

use axum::{
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, COOKIE},
        HeaderMap,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use super::error::AuthError;
use super::principal::Principal;
use crate::models::User;
use crate::state::AppState;
use crate::store::StoreError;

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "session";

/// Which token a caller is presenting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Session,
    /// Must also equal the refresh token stored on the user.
    Refresh,
}

/// Token from the `Authorization` header, else from the session cookie.
pub fn presented_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        if let Some(token) = value.strip_prefix("Bearer ") {
            let token = token.trim();
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Resolve the user a token belongs to.
///
/// Fails with `InvalidToken` for any token or identity problem and with
/// `SystemError` when the store is unavailable.
pub fn resolve_user(state: &AppState, token: &str, kind: TokenKind) -> Result<User, AuthError> {
    let claims = state.tokens.parse(token)?;

    let user = state.store.get_by_email(&claims.sub).map_err(|e| match e {
        StoreError::NotFound => {
            warn!(subject = %claims.sub, "token subject does not resolve to a user");
            AuthError::InvalidToken
        }
        other => AuthError::from(other),
    })?;

    if user.email != claims.sub {
        warn!(user_id = user.id, "token subject does not match current email");
        return Err(AuthError::InvalidToken);
    }

    if kind == TokenKind::Refresh && user.refresh_token.as_deref() != Some(token) {
        warn!(user_id = user.id, "refresh token does not match stored value");
        return Err(AuthError::InvalidToken);
    }

    Ok(user)
}

/// Attach a [`Principal`] to requests that present a valid session.
///
/// Requests without a token pass through anonymously; handlers that need a
/// session reject them through the [`Auth`](super::Auth) extractor. A token
/// that is presented but does not resolve is rejected with 401 here.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = presented_token(request.headers()) else {
        return next.run(request).await;
    };

    match resolve_user(&state, &token, TokenKind::Session) {
        Ok(user) => {
            request.extensions_mut().insert(Principal::from_user(user));
            next.run(request).await
        }
        Err(AuthError::SystemError(detail)) => AuthError::SystemError(detail).into_response(),
        Err(e) => {
            warn!(
                method = %request.method(),
                uri = %request.uri(),
                error = %e,
                "session rejected"
            );
            AuthError::InvalidToken.into_response()
        }
    }
}
