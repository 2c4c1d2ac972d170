// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request body buffering and logging.
//!
//! Every request body is read into memory once, handed to the rest of the
//! stack as [`BufferedBody`] (signature checks hash these exact bytes) and
//! logged as a redacted JSON preview together with status and latency.

use std::time::Instant;

use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::{info, warn};

use crate::auth::BufferedBody;
use crate::error::ApiError;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Longest body preview written to the log.
const PREVIEW_BYTES: usize = 8 * 1024;

const REDACTED: &str = "***SECRET***";

/// JSON keys whose values never reach the log (compared case-insensitively).
const SENSITIVE_KEYS: &[&str] = &["password", "secret", "token", "refresh_token", "apikey", "key"];

pub async fn http_log(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();

    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(method = %method, uri = %uri, error = %e, "request body rejected");
            return ApiError::new(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large")
                .into_response();
        }
    };

    let mut request = Request::from_parts(parts, Body::from(bytes.clone()));
    request.extensions_mut().insert(BufferedBody(bytes.clone()));

    let response = next.run(request).await;

    info!(
        method = %method,
        uri = %uri,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        body = %preview(&bytes),
        "http request"
    );
    response
}

/// Redacted, size-bounded rendering of a request body.
pub fn preview(body: &Bytes) -> String {
    if body.is_empty() {
        return String::new();
    }

    let Ok(mut value) = serde_json::from_slice::<Value>(body) else {
        return format!("<{} bytes, not JSON>", body.len());
    };
    redact(&mut value);

    let mut rendered = value.to_string();
    if rendered.len() > PREVIEW_BYTES {
        let mut cut = PREVIEW_BYTES;
        while !rendered.is_char_boundary(cut) {
            cut -= 1;
        }
        rendered.truncate(cut);
        rendered.push_str("...");
    }
    rendered
}

/// Replace the values of sensitive keys, at any depth.
pub fn redact(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                let lowered = key.to_ascii_lowercase();
                if SENSITIVE_KEYS.contains(&lowered.as_str()) {
                    *child = Value::String(REDACTED.to_string());
                } else {
                    redact(child);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{middleware::from_fn, routing::post, Extension, Router};
    use serde_json::json;
    use tower::ServiceExt;

    #[test]
    fn redacts_sensitive_keys_at_any_depth() {
        let mut value = json!({
            "email": "admin@example.com",
            "Password": "hunter2",
            "public_key": "abc,def",
            "nested": { "refresh_token": "rt", "items": [{ "apiKey": "k" }, { "name": "n" }] },
            "Key": 42
        });
        redact(&mut value);

        assert_eq!(value["email"], "admin@example.com");
        assert_eq!(value["Password"], REDACTED);
        assert_eq!(value["public_key"], "abc,def");
        assert_eq!(value["nested"]["refresh_token"], REDACTED);
        assert_eq!(value["nested"]["items"][0]["apiKey"], REDACTED);
        assert_eq!(value["nested"]["items"][1]["name"], "n");
        assert_eq!(value["Key"], REDACTED);
    }

    #[test]
    fn preview_never_contains_secrets_or_raw_text() {
        let body = Bytes::from_static(br#"{"email":"a@b.c","password":"hunter2"}"#);
        let rendered = preview(&body);
        assert!(rendered.contains("a@b.c"));
        assert!(!rendered.contains("hunter2"));

        let raw = Bytes::from_static(b"password=hunter2");
        assert_eq!(preview(&raw), "<16 bytes, not JSON>");
        assert_eq!(preview(&Bytes::new()), "");
    }

    #[test]
    fn preview_is_bounded() {
        let long = json!({ "name": "é".repeat(PREVIEW_BYTES) }).to_string();
        let rendered = preview(&Bytes::from(long));
        assert!(rendered.len() <= PREVIEW_BYTES + 3);
        assert!(rendered.ends_with("..."));
    }

    async fn echo(Extension(BufferedBody(buffered)): Extension<BufferedBody>, body: Bytes) -> String {
        assert_eq!(buffered, body);
        String::from_utf8(body.to_vec()).unwrap()
    }

    fn app() -> Router {
        Router::new().route("/echo", post(echo)).layer(from_fn(http_log))
    }

    #[tokio::test]
    async fn body_is_buffered_and_still_readable() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/echo")
                    .body(Body::from(r#"{"a":1}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], br#"{"a":1}"#);
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/echo")
                    .body(Body::from(vec![b'x'; MAX_BODY_BYTES + 1]))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
