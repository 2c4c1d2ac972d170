// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Argon2id password hashing in PHC string format.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

/// Memory cost in KiB (64 MiB).
pub const MEMORY_COST_KIB: u32 = 64 * 1024;
/// Number of passes.
pub const ITERATIONS: u32 = 3;
/// Lanes.
pub const PARALLELISM: u32 = 2;
/// Derived key length in bytes.
pub const OUTPUT_LEN: usize = 32;

const PHC_FIELDS: usize = 6;
const ALGORITHM_TAG: &str = "argon2id";
const VERSION_TAG: &str = "v=19";

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("malformed password hash: {0}")]
    MalformedHash(&'static str),

    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// Hash a password with a fresh 16-byte salt.
///
/// Output looks like `$argon2id$v=19$m=65536,t=3,p=2$<salt>$<hash>`.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let params = Params::new(MEMORY_COST_KIB, ITERATIONS, PARALLELISM, Some(OUTPUT_LEN))
        .map_err(|e| PasswordError::Hash(e.to_string()))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let salt = SaltString::generate(&mut OsRng);

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Check `candidate` against a stored PHC string.
///
/// A missing or empty stored value means the account has no password and
/// never matches. The cost parameters and salt embedded in `stored` are used
/// for re-derivation; the final comparison is constant time.
pub fn verify_password(candidate: &str, stored: Option<&str>) -> Result<bool, PasswordError> {
    let stored = match stored {
        Some(s) if !s.is_empty() => s,
        _ => return Ok(false),
    };

    let fields: Vec<&str> = stored.split('$').collect();
    if fields.len() != PHC_FIELDS {
        return Err(PasswordError::MalformedHash("unexpected field count"));
    }
    if fields[1] != ALGORITHM_TAG {
        return Err(PasswordError::MalformedHash("unsupported algorithm"));
    }
    if fields[2] != VERSION_TAG {
        return Err(PasswordError::MalformedHash("unsupported version"));
    }

    let parsed =
        PasswordHash::new(stored).map_err(|_| PasswordError::MalformedHash("unparseable PHC string"))?;

    match Argon2::default().verify_password(candidate.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(_) => Err(PasswordError::MalformedHash("invalid parameters")),
    }
}
