// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Request authentication and integrity for the API.
//!
//! ## Auth Flow
//!
//! 1. Client fetches the server's P-256 public key (`PUT /auth`, unsigned)
//! 2. Client derives a shared secret by ECDH and sends a signed login
//!    request carrying its own ephemeral public key and password
//! 3. Server derives the same secret, verifies the signature under it,
//!    checks the password and issues a session and a refresh token; the
//!    refresh token and the shared secret are stored on the user
//! 4. Later requests carry `Authorization: Bearer <token>` (or the
//!    `session` cookie); mutations are also signed under the stored secret
//!
//! ## Security
//!
//! - Tokens are HS256 only; any other `alg` is rejected
//! - Signed requests are valid for 60 seconds either side of server time
//! - Each `(timestamp, nonce)` pair is accepted once
//! - Privileges are merged from the user's roles on every request

pub mod error;
pub mod extractor;
pub mod gate;
pub mod key_exchange;
pub mod password;
pub mod principal;
pub mod privileges;
pub mod replay;
pub mod session;
pub mod signature;
pub mod token;

pub use error::AuthError;
pub use extractor::{Auth, BufferedBody, RequestContext};
pub use gate::AuthorizationGate;
pub use key_exchange::{KeyExchange, SharedSecret};
pub use principal::Principal;
pub use privileges::{Action, PrivilegeSet};
pub use replay::ReplayGuard;
pub use signature::RequestVerifier;
pub use token::SessionTokenService;
