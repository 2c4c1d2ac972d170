// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User store.
//!
//! The authentication core only needs three operations: lookup by email,
//! lookup by id, and a field-set update guarded by the record version. The
//! in-memory implementation backs the binary and the tests; a database
//! backend implements the same trait.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::models::User;

/// Columns an update may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserField {
    Name,
    RefreshToken,
    SharedSecret,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("user not found")]
    NotFound,

    #[error("user was modified concurrently")]
    VersionConflict,

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub trait UserStore: Send + Sync {
    fn get_by_email(&self, email: &str) -> Result<User, StoreError>;

    fn get_by_id(&self, id: i64) -> Result<User, StoreError>;

    /// Write `fields` from `user` if the stored version still equals
    /// `user.version`. Returns the stored record with its bumped version.
    fn update(&self, user: &User, fields: &[UserField]) -> Result<User, StoreError>;
}

#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<i64, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record.
    pub fn insert(&self, user: User) -> Result<(), StoreError> {
        let mut users = self.users.write().map_err(|_| poisoned())?;
        users.insert(user.id, user);
        Ok(())
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

impl UserStore for InMemoryUserStore {
    fn get_by_email(&self, email: &str) -> Result<User, StoreError> {
        let users = self.users.read().map_err(|_| poisoned())?;
        users
            .values()
            .find(|user| user.email == email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn get_by_id(&self, id: i64) -> Result<User, StoreError> {
        let users = self.users.read().map_err(|_| poisoned())?;
        users.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    fn update(&self, user: &User, fields: &[UserField]) -> Result<User, StoreError> {
        let mut users = self.users.write().map_err(|_| poisoned())?;
        let stored = users.get_mut(&user.id).ok_or(StoreError::NotFound)?;
        if stored.version != user.version {
            return Err(StoreError::VersionConflict);
        }

        for field in fields {
            match field {
                UserField::Name => stored.name = user.name.clone(),
                UserField::RefreshToken => stored.refresh_token = user.refresh_token.clone(),
                UserField::SharedSecret => stored.shared_secret = user.shared_secret.clone(),
            }
        }
        stored.version += 1;
        Ok(stored.clone())
    }
}
