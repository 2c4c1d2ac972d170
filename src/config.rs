// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Settings are read from the environment once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `JWT_SECRET` | HS256 signing secret for session tokens | Required |
//! | `TOKEN_EXPIRY` | Session token lifetime in minutes | `5` |
//! | `REFRESH_TOKEN_EXPIRY` | Refresh token lifetime in minutes | `60` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `API_DOCS` | Serve Swagger UI at `/docs` when `true` | `false` |
//! | `SEED_ADMIN_EMAIL` | Email of an administrator created at startup | Optional |
//! | `SEED_ADMIN_PASSWORD` | Password for the seeded administrator | Optional |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use chrono::TimeDelta;
use tracing::warn;

/// Environment variable name for the token signing secret.
///
/// The process refuses to start without it.
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";

/// Environment variable name for the session token lifetime (minutes).
pub const TOKEN_EXPIRY_ENV: &str = "TOKEN_EXPIRY";

/// Environment variable name for the refresh token lifetime (minutes).
pub const REFRESH_TOKEN_EXPIRY_ENV: &str = "REFRESH_TOKEN_EXPIRY";

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const API_DOCS_ENV: &str = "API_DOCS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
pub const SEED_ADMIN_EMAIL_ENV: &str = "SEED_ADMIN_EMAIL";
pub const SEED_ADMIN_PASSWORD_ENV: &str = "SEED_ADMIN_PASSWORD";

pub const DEFAULT_TOKEN_EXPIRY_MINUTES: i64 = 5;
pub const DEFAULT_REFRESH_TOKEN_EXPIRY_MINUTES: i64 = 60;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

/// Default `RUST_LOG` filter.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{JWT_SECRET_ENV} must be set to a non-empty value")]
    MissingJwtSecret,
}

/// Process settings.
#[derive(Clone)]
pub struct Settings {
    pub jwt_secret: Vec<u8>,
    pub session_ttl: TimeDelta,
    pub refresh_ttl: TimeDelta,
    pub host: String,
    pub port: u16,
    pub api_docs: bool,
    /// `(email, password)` of an administrator to create at startup.
    pub seed_admin: Option<(String, String)>,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("jwt_secret", &"**********")
            .field("session_ttl", &self.session_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("api_docs", &self.api_docs)
            .field("seed_admin", &self.seed_admin.as_ref().map(|(email, _)| email))
            .finish()
    }
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through `lookup`, which maps a variable name to its
    /// value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let jwt_secret = lookup(JWT_SECRET_ENV)
            .filter(|secret| !secret.is_empty())
            .ok_or(ConfigError::MissingJwtSecret)?
            .into_bytes();

        let session_ttl = minutes(&lookup, TOKEN_EXPIRY_ENV, DEFAULT_TOKEN_EXPIRY_MINUTES);
        let refresh_ttl = minutes(
            &lookup,
            REFRESH_TOKEN_EXPIRY_ENV,
            DEFAULT_REFRESH_TOKEN_EXPIRY_MINUTES,
        );

        let host = lookup(HOST_ENV)
            .filter(|host| !host.is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match lookup(PORT_ENV) {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!(value = %raw, default = DEFAULT_PORT, "invalid {PORT_ENV}, using default");
                DEFAULT_PORT
            }),
            None => DEFAULT_PORT,
        };

        let api_docs = lookup(API_DOCS_ENV)
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        let seed_admin = match (lookup(SEED_ADMIN_EMAIL_ENV), lookup(SEED_ADMIN_PASSWORD_ENV)) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                Some((email, password))
            }
            (None, None) => None,
            _ => {
                warn!(
                    "{SEED_ADMIN_EMAIL_ENV} and {SEED_ADMIN_PASSWORD_ENV} must both be set, skipping seed"
                );
                None
            }
        };

        Ok(Self {
            jwt_secret,
            session_ttl,
            refresh_ttl,
            host,
            port,
            api_docs,
            seed_admin,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// `true` when `LOG_FORMAT` asks for JSON logs.
///
/// Tracing starts before [`Settings`] are loaded, so the log format is read
/// on its own.
pub fn json_logs(lookup: impl Fn(&str) -> Option<String>) -> bool {
    lookup(LOG_FORMAT_ENV)
        .map(|v| v.trim().eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Positive whole minutes, or `default` with a warning.
fn minutes(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: i64) -> TimeDelta {
    let Some(raw) = lookup(name) else {
        return TimeDelta::minutes(default);
    };
    match raw.trim().parse::<i64>() {
        Ok(value) if value > 0 => TimeDelta::minutes(value),
        _ => {
            warn!(variable = name, value = %raw, default, "invalid token lifetime, using default");
            TimeDelta::minutes(default)
        }
    }
}
