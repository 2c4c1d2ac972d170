// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! User records as held by the store, plus the request and response bodies
//! of the REST API. Wire types derive `Serialize`, `Deserialize`, and
//! `ToSchema` for JSON handling and OpenAPI documentation.
//!
//! ## Secrets
//!
//! [`User`] carries the password hash, the stored refresh token and the
//! persisted shared secret. None of them is ever serialized; responses use
//! the [`UserSummary`] and [`LoginUser`] projections.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::privileges::PrivilegeSet;

// =============================================================================
// Users and Roles
// =============================================================================

/// A role and the privileges it grants.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Role {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub privileges: PrivilegeSet,
}

/// A user record as held by the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    /// Optimistic concurrency counter, bumped on every update.
    pub version: i64,
    pub email: String,
    pub name: String,
    /// Argon2id PHC string; `None` when no password is set.
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    /// Refresh token of the active session.
    #[serde(skip_serializing, default)]
    pub refresh_token: Option<String>,
    /// Base64 shared secret of the active session.
    #[serde(skip_serializing, default)]
    pub shared_secret: Option<String>,
    #[serde(default)]
    pub roles: Vec<Role>,
}

impl User {
    pub fn role_names(&self) -> Vec<String> {
        self.roles.iter().map(|role| role.name.clone()).collect()
    }

    /// Union of the privileges of every assigned role.
    pub fn privileges(&self) -> PrivilegeSet {
        PrivilegeSet::merged(self.roles.iter().map(|role| &role.privileges))
    }
}

/// Minimal public view of a user.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct UserSummary {
    pub id: i64,
    pub name: String,
    pub email: String,
    /// Role names.
    pub roles: Vec<String>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            roles: user.role_names(),
        }
    }
}

/// User view returned on login and refresh, with merged privileges.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct LoginUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub roles: Vec<String>,
    pub privileges: PrivilegeSet,
}

impl From<&User> for LoginUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            roles: user.role_names(),
            privileges: user.privileges(),
        }
    }
}

// =============================================================================
// Auth Requests and Responses
// =============================================================================

/// Server public key handed out during the handshake.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublicKeyResponse {
    /// Two base64url coordinates joined by a comma.
    pub public_key: String,
}

/// Signed login body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Client's ephemeral public key.
    #[serde(default)]
    pub public_key: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    /// The server's own public key.
    pub public_key: String,
    pub email: String,
    pub token: String,
    pub refresh_token: String,
    pub user: LoginUser,
}

/// Signed refresh body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RefreshRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RefreshResponse {
    pub token: String,
    pub refresh_token: String,
    pub user: LoginUser,
}

/// Logout body. Either token identifies the session; `token` is tried
/// first, and a refresh token must equal the one currently stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct LogoutRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Body accepted by `GET /auth` when no session is presented.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct TokenLookupRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

// =============================================================================
// User Resource
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::privileges::Action;

    fn user() -> User {
        User {
            id: 7,
            version: 1,
            email: "admin@example.com".into(),
            name: "Admin".into(),
            password_hash: Some("$argon2id$v=19$m=65536,t=3,p=2$c2FsdA$aGFzaA".into()),
            refresh_token: Some("refresh".into()),
            shared_secret: Some("c2VjcmV0".into()),
            roles: vec![
                Role {
                    id: 1,
                    name: "viewer".into(),
                    privileges: PrivilegeSet::new().grant("app_user", &[Action::Read]),
                },
                Role {
                    id: 2,
                    name: "editor".into(),
                    privileges: PrivilegeSet::new().grant("app_user", &[Action::Update]),
                },
            ],
        }
    }

    #[test]
    fn user_never_serializes_secrets() {
        let json = serde_json::to_value(user()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("refresh_token").is_none());
        assert!(json.get("shared_secret").is_none());
        assert_eq!(json["email"], "admin@example.com");
    }

    #[test]
    fn login_user_merges_role_privileges() {
        let view = LoginUser::from(&user());
        assert_eq!(view.roles, vec!["viewer", "editor"]);
        assert!(view.privileges.allows("app_user", Action::Read));
        assert!(view.privileges.allows("app_user", Action::Update));
        assert!(!view.privileges.allows("app_user", Action::Delete));
    }

    #[test]
    fn summary_lists_role_names() {
        let summary = UserSummary::from(&user());
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": 7,
                "name": "Admin",
                "email": "admin@example.com",
                "roles": ["viewer", "editor"]
            })
        );
    }
}
