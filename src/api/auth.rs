// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! `/api/v1/auth` handlers: key exchange, login, refresh, logout and the
//! current-user lookup.
//!
//! ## Session lifecycle
//!
//! ```text
//! PUT (unsigned)  -> server public key
//! PUT (signed)    -> token + refresh token; refresh token and shared secret stored
//! POST (signed)   -> new token pair, stored refresh token rotated, secret kept
//! DELETE          -> stored refresh token and shared secret cleared
//! ```

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{info, warn};

use crate::auth::password::{verify_password, PasswordError};
use crate::auth::session::{presented_token, resolve_user, TokenKind};
use crate::auth::signature::SIGNATURE_HEADER;
use crate::auth::{AuthError, RequestContext, SharedSecret};
use crate::models::{
    LoginRequest, LoginResponse, LoginUser, LogoutRequest, PublicKeyResponse, RefreshRequest,
    RefreshResponse, StatusResponse, TokenLookupRequest, UserSummary,
};
use crate::state::AppState;
use crate::store::UserField;

/// Key exchange and login.
///
/// Without an `X-Req-Signature` header this only returns the server's
/// public key. With it, the body is a login request signed under the secret
/// derived from the client's ephemeral key.
#[utoipa::path(
    put,
    path = "/api/v1/auth",
    request_body = LoginRequest,
    tag = "Auth",
    responses(
        (status = 200, description = "Server public key (unsigned) or a new session (signed)", body = LoginResponse),
        (status = 400, description = "Malformed request, bad signature or invalid credentials"),
    )
)]
pub async fn login(State(state): State<AppState>, ctx: RequestContext) -> Result<Response, AuthError> {
    if !ctx.headers.contains_key(SIGNATURE_HEADER) {
        return Ok(Json(PublicKeyResponse {
            public_key: state.key_exchange.public_key().to_string(),
        })
        .into_response());
    }

    let request: LoginRequest = ctx.json()?;
    if request.email.is_empty() {
        return Err(AuthError::MalformedRequest("email is required".to_string()));
    }
    if request.public_key.is_empty() {
        return Err(AuthError::MalformedRequest("public_key is required".to_string()));
    }

    let shared = state.key_exchange.derive_shared(&request.public_key).map_err(|e| {
        warn!(error = %e, "client public key rejected");
        AuthError::MalformedRequest(e.to_string())
    })?;
    state.verifier.check(&ctx.signed(), Some(shared.as_bytes()))?;

    let user = state
        .store
        .get_by_email(&request.email)
        .map_err(|e| AuthError::from(e).into_credentials_error())?;

    match check_password(request.password, user.password_hash.clone()).await? {
        Ok(true) => {}
        Ok(false) => {
            warn!(user_id = user.id, "login with wrong password");
            return Err(AuthError::InvalidCredentials);
        }
        Err(e) => {
            warn!(user_id = user.id, error = %e, "stored password hash is unusable");
            return Err(AuthError::InvalidCredentials);
        }
    }

    let pair = state.tokens.issue_pair(&user.email)?;

    let mut session = user;
    session.refresh_token = Some(pair.refresh_token.clone());
    session.shared_secret = Some(shared.to_base64());
    let saved = state
        .store
        .update(&session, &[UserField::RefreshToken, UserField::SharedSecret])?;

    info!(user_id = saved.id, "login succeeded");
    Ok(Json(LoginResponse {
        public_key: state.key_exchange.public_key().to_string(),
        email: saved.email.clone(),
        token: pair.token,
        refresh_token: pair.refresh_token,
        user: LoginUser::from(&saved),
    })
    .into_response())
}

/// Exchange a refresh token for a new token pair.
///
/// Signed under the shared secret stored at login.
#[utoipa::path(
    post,
    path = "/api/v1/auth",
    request_body = RefreshRequest,
    tag = "Auth",
    responses(
        (status = 200, body = RefreshResponse),
        (status = 400, description = "Malformed request, bad signature or invalid refresh token"),
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Result<Json<RefreshResponse>, AuthError> {
    // Headers and timestamp first; the secret is only known after lookup.
    state.verifier.check(&ctx.signed(), None)?;

    let request: RefreshRequest = ctx.json()?;
    let user = resolve_user(&state, &request.refresh_token, TokenKind::Refresh)
        .map_err(AuthError::into_credentials_error)?;
    if user.email != request.email {
        warn!(user_id = user.id, "refresh email does not match token subject");
        return Err(AuthError::InvalidCredentials);
    }

    let Some(secret) = user.shared_secret.as_deref().and_then(SharedSecret::from_base64) else {
        warn!(user_id = user.id, "refresh without an established shared secret");
        return Err(AuthError::InvalidCredentials);
    };
    state.verifier.check(&ctx.signed(), Some(secret.as_bytes()))?;

    let pair = state.tokens.issue_pair(&user.email)?;

    let mut session = user;
    session.refresh_token = Some(pair.refresh_token.clone());
    let saved = state.store.update(&session, &[UserField::RefreshToken])?;

    info!(user_id = saved.id, "session refreshed");
    Ok(Json(RefreshResponse {
        token: pair.token,
        refresh_token: pair.refresh_token,
        user: LoginUser::from(&saved),
    }))
}

/// End the session: clear the stored refresh token and shared secret.
#[utoipa::path(
    delete,
    path = "/api/v1/auth",
    request_body = LogoutRequest,
    tag = "Auth",
    responses(
        (status = 200, body = StatusResponse),
        (status = 400, description = "Session could not be resolved"),
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Result<Json<StatusResponse>, AuthError> {
    let request: LogoutRequest = ctx.json()?;
    let session = request.token.as_deref().filter(|t| !t.is_empty());
    let refresh = request.refresh_token.as_deref().filter(|t| !t.is_empty());
    let (token, kind) = match (session, refresh) {
        (Some(token), _) => (token, TokenKind::Session),
        (None, Some(token)) => (token, TokenKind::Refresh),
        (None, None) => {
            return Err(AuthError::MalformedRequest(
                "token or refresh_token is required".to_string(),
            ))
        }
    };

    let user = resolve_user(&state, token, kind).map_err(AuthError::into_credentials_error)?;
    if !request.email.is_empty() && request.email != user.email {
        warn!(user_id = user.id, "logout email does not match token subject");
        return Err(AuthError::InvalidCredentials);
    }

    let mut session = user;
    session.refresh_token = None;
    session.shared_secret = None;
    let saved = state
        .store
        .update(&session, &[UserField::RefreshToken, UserField::SharedSecret])?;

    info!(user_id = saved.id, "logged out");
    Ok(Json(StatusResponse::ok()))
}

/// The user behind a session.
///
/// Uses the session header or cookie when present; otherwise a JSON body
/// `{email, token}`.
#[utoipa::path(
    get,
    path = "/api/v1/auth",
    tag = "Auth",
    security(("bearer" = [])),
    responses(
        (status = 200, body = UserSummary),
        (status = 401, description = "No resolvable session"),
    )
)]
pub async fn current(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Result<Json<UserSummary>, AuthError> {
    if let Some(token) = presented_token(&ctx.headers) {
        let user = resolve_user(&state, &token, TokenKind::Session).map_err(unauthorized)?;
        return Ok(Json(UserSummary::from(&user)));
    }

    if ctx.body.is_empty() {
        return Err(AuthError::MissingSession);
    }
    let request: TokenLookupRequest = ctx.json().map_err(|_| AuthError::InvalidToken)?;
    let user = resolve_user(&state, &request.token, TokenKind::Session).map_err(unauthorized)?;
    if user.email != request.email {
        warn!(user_id = user.id, "lookup email does not match token subject");
        return Err(AuthError::InvalidToken);
    }
    Ok(Json(UserSummary::from(&user)))
}

/// Argon2 verification on the blocking pool.
async fn check_password(
    candidate: String,
    stored: Option<String>,
) -> Result<Result<bool, PasswordError>, AuthError> {
    tokio::task::spawn_blocking(move || verify_password(&candidate, stored.as_deref()))
        .await
        .map_err(|e| AuthError::SystemError(format!("password check task failed: {e}")))
}

fn unauthorized(e: AuthError) -> AuthError {
    match e {
        AuthError::SystemError(_) => e,
        _ => AuthError::InvalidToken,
    }
}
