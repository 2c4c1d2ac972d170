// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Role privileges.
//!
//! A role grants actions per resource:
//!
//! ```json
//! { "app_user": { "read": true, "update": true }, "param": { "read": true } }
//! ```
//!
//! A user's effective privileges are the union of all assigned roles: a
//! `true` anywhere wins, so merge order does not matter.

use std::collections::BTreeMap;
use std::fmt;

use axum::http::Method;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Action on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

impl Action {
    /// Map an HTTP method to the action it performs.
    pub fn from_method(method: &Method) -> Option<Action> {
        match *method {
            Method::GET | Method::HEAD => Some(Action::Read),
            Method::POST => Some(Action::Create),
            Method::PUT | Method::PATCH => Some(Action::Update),
            Method::DELETE => Some(Action::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Methods that change state and therefore need a signed request.
pub fn is_mutating(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH | Method::DELETE)
}

/// Granted actions on one resource. Absent keys are `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ActionFlags {
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub create: bool,
    #[serde(default)]
    pub update: bool,
    #[serde(default)]
    pub delete: bool,
}

impl ActionFlags {
    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::Read => self.read,
            Action::Create => self.create,
            Action::Update => self.update,
            Action::Delete => self.delete,
        }
    }

    fn set(&mut self, action: Action) {
        match action {
            Action::Read => self.read = true,
            Action::Create => self.create = true,
            Action::Update => self.update = true,
            Action::Delete => self.delete = true,
        }
    }

    fn union(self, other: ActionFlags) -> ActionFlags {
        ActionFlags {
            read: self.read || other.read,
            create: self.create || other.create,
            update: self.update || other.update,
            delete: self.delete || other.delete,
        }
    }
}

/// Outcome of a privilege lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Granted,
    /// No entry for the resource at all.
    NoResource,
    /// Resource present, action not granted.
    Denied,
}

/// Resource name to granted actions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct PrivilegeSet(BTreeMap<String, ActionFlags>);

impl PrivilegeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style grant, mostly for seeding and tests.
    pub fn grant(mut self, resource: impl Into<String>, actions: &[Action]) -> Self {
        let flags = self.0.entry(resource.into()).or_default();
        for action in actions {
            flags.set(*action);
        }
        self
    }

    /// Fold `other` into `self`; `true` wins at every position.
    pub fn merge(&mut self, other: &PrivilegeSet) {
        for (resource, flags) in &other.0 {
            let merged = self.0.get(resource).copied().unwrap_or_default().union(*flags);
            self.0.insert(resource.clone(), merged);
        }
    }

    /// Union of several sets.
    pub fn merged<'a>(sets: impl IntoIterator<Item = &'a PrivilegeSet>) -> PrivilegeSet {
        sets.into_iter().fold(PrivilegeSet::new(), |mut acc, set| {
            acc.merge(set);
            acc
        })
    }

    pub fn decide(&self, resource: &str, action: Action) -> Decision {
        match self.0.get(resource) {
            None => Decision::NoResource,
            Some(flags) if flags.allows(action) => Decision::Granted,
            Some(_) => Decision::Denied,
        }
    }

    pub fn allows(&self, resource: &str, action: Action) -> bool {
        self.decide(resource, action) == Decision::Granted
    }

    pub fn get(&self, resource: &str) -> Option<&ActionFlags> {
        self.0.get(resource)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
