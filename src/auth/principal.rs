// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The authenticated caller of a request.

use std::fmt;

use super::key_exchange::SharedSecret;
use super::privileges::PrivilegeSet;
use crate::models::User;

/// A user resolved from a valid session, with privileges merged from the
/// user's current roles.
///
/// Built fresh for every request and stored in request extensions by the
/// session middleware. Never mutated afterwards.
#[derive(Clone)]
pub struct Principal {
    user: User,
    roles: Vec<String>,
    privileges: PrivilegeSet,
}

impl Principal {
    /// Build a principal, dropping the password hash and refresh token.
    ///
    /// The persisted shared secret is kept; signed mutations are verified
    /// against it.
    pub fn from_user(mut user: User) -> Self {
        user.password_hash = None;
        user.refresh_token = None;
        let roles = user.role_names();
        let privileges = user.privileges();
        Self {
            user,
            roles,
            privileges,
        }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn id(&self) -> i64 {
        self.user.id
    }

    pub fn email(&self) -> &str {
        &self.user.email
    }

    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    pub fn privileges(&self) -> &PrivilegeSet {
        &self.privileges
    }

    /// Shared secret of the active session, if one was established.
    pub fn shared_secret(&self) -> Option<SharedSecret> {
        self.user
            .shared_secret
            .as_deref()
            .and_then(SharedSecret::from_base64)
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Principal")
            .field("id", &self.user.id)
            .field("email", &self.user.email)
            .field("roles", &self.roles)
            .field("privileges", &self.privileges)
            .finish_non_exhaustive()
    }
}
