// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sigil API - signed-request authentication service
//!
//! An HTTP API whose state-changing calls are protected by a per-session
//! shared secret established through ECDH, HMAC request signatures with
//! replay protection, and short-lived JWT sessions gated by role privileges.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Key exchange, request signing, tokens and authorization
//! - `store` - User store interface and in-memory implementation
//! - `config` - Environment configuration

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod store;
