// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated callers and signed requests.
//!
//! Use the `Auth` extractor in handlers to require a session:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(principal): Auth) -> impl IntoResponse {
//!     // principal was resolved by the session middleware
//! }
//! ```

use axum::{
    body::Bytes,
    extract::{FromRequestParts, OriginalUri},
    http::{request::Parts, HeaderMap, Method},
};
use serde::de::DeserializeOwned;
use tracing::warn;

use super::error::AuthError;
use super::principal::Principal;
use super::signature::SignedRequest;
use crate::state::AppState;

/// Request body captured by the HTTP logging middleware.
///
/// Stored in request extensions so signature checks can hash the exact
/// bytes the client sent.
#[derive(Debug, Clone, Default)]
pub struct BufferedBody(pub Bytes);

/// Extractor for authenticated callers.
///
/// Reads the [`Principal`] placed in request extensions by the session
/// middleware; rejects with 401 when there is none.
///
/// # Example
///
/// ```rust,ignore
/// async fn get_user(
///     Auth(principal): Auth,
///     State(state): State<AppState>,
/// ) -> Result<Json<UserSummary>, ApiError> {
///     // principal.privileges() holds the merged role privileges
/// }
/// ```
pub struct Auth(pub Principal);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &AppState) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(Auth)
            .ok_or(AuthError::MissingSession)
    }
}

/// Everything the request verifier needs, owned.
///
/// The URI is the one the client sent, including any prefix stripped by
/// nested routers, and the query string.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RequestContext {
    /// Borrowed view for [`RequestVerifier`](super::RequestVerifier).
    pub fn signed(&self) -> SignedRequest<'_> {
        SignedRequest {
            method: &self.method,
            uri: &self.uri,
            headers: &self.headers,
            body: &self.body,
        }
    }

    /// Decode the buffered body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, AuthError> {
        serde_json::from_slice(&self.body).map_err(|e| {
            warn!(uri = %self.uri, error = %e, "request body is not valid JSON");
            AuthError::MalformedRequest("request body is not valid JSON".to_string())
        })
    }
}

impl FromRequestParts<AppState> for RequestContext {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &AppState) -> Result<Self, Self::Rejection> {
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map(|original| &original.0)
            .unwrap_or(&parts.uri);
        let uri = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string());

        let body = match parts.extensions.get::<BufferedBody>() {
            Some(buffered) => buffered.0.clone(),
            None => {
                warn!(uri = %uri, "no buffered body in request extensions");
                Bytes::new()
            }
        };

        Ok(RequestContext {
            method: parts.method.clone(),
            uri,
            headers: parts.headers.clone(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::http::{Request, StatusCode};
    use chrono::TimeDelta;

    use crate::auth::key_exchange::KeyExchange;
    use crate::auth::replay::ReplayGuard;
    use crate::auth::token::SessionTokenService;
    use crate::models::User;
    use crate::store::InMemoryUserStore;

    fn create_test_state() -> AppState {
        let tokens =
            SessionTokenService::new(b"jwt-secret", TimeDelta::minutes(5), TimeDelta::minutes(60)).unwrap();
        AppState::new(
            Arc::new(InMemoryUserStore::new()),
            KeyExchange::generate(),
            tokens,
            ReplayGuard::new(16),
        )
    }

    fn principal() -> Principal {
        Principal::from_user(User {
            id: 5,
            version: 1,
            email: "user@example.com".into(),
            name: "User".into(),
            password_hash: None,
            refresh_token: None,
            shared_secret: None,
            roles: Vec::new(),
        })
    }

    #[tokio::test]
    async fn auth_requires_session() {
        let state = create_test_state();
        let mut parts = Request::builder().uri("/test").body(()).unwrap().into_parts().0;

        let result = Auth::from_request_parts(&mut parts, &state).await;
        let Err(rejection) = result else {
            panic!("expected rejection");
        };
        assert_eq!(rejection.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(rejection.error_code(), "missing_session");
    }

    #[tokio::test]
    async fn auth_reads_extensions() {
        let state = create_test_state();
        let mut parts = Request::builder().uri("/test").body(()).unwrap().into_parts().0;
        parts.extensions.insert(principal());

        let Auth(found) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(found.id(), 5);
    }

    #[tokio::test]
    async fn context_uses_original_uri_and_buffered_body() {
        let state = create_test_state();
        let mut parts = Request::builder()
            .method(Method::PATCH)
            .uri("/users/5")
            .header("x-req-nonce", "n")
            .body(())
            .unwrap()
            .into_parts()
            .0;
        parts
            .extensions
            .insert(OriginalUri("/api/v1/users/5?verbose=1".parse().unwrap()));
        parts
            .extensions
            .insert(BufferedBody(Bytes::from_static(br#"{"name":"x"}"#)));

        let ctx = RequestContext::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(ctx.uri, "/api/v1/users/5?verbose=1");
        assert_eq!(ctx.method, Method::PATCH);
        assert_eq!(&ctx.body[..], br#"{"name":"x"}"#);
        assert_eq!(ctx.signed().headers.get("x-req-nonce").unwrap(), "n");
    }

    #[tokio::test]
    async fn context_without_buffered_body_is_empty() {
        let state = create_test_state();
        let mut parts = Request::builder().uri("/x").body(()).unwrap().into_parts().0;

        let ctx = RequestContext::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(ctx.uri, "/x");
        assert!(ctx.body.is_empty());
        assert!(matches!(
            ctx.json::<serde_json::Value>(),
            Err(AuthError::MalformedRequest(_))
        ));
    }
}
