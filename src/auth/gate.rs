// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Privilege and integrity checks in front of gated resources.
//!
//! Reads are authorized by privilege alone. Mutating methods additionally
//! need a request signed under the principal's persisted shared secret.

use tracing::warn;

use super::principal::Principal;
use super::privileges::{is_mutating, Action, Decision};
use super::signature::{RequestVerifier, SignatureError, SignedRequest};

/// Why the gate refused a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    MissingPrivilege,
    /// Mutation attempted without an established shared secret.
    NoSharedSecret,
    Signature(SignatureError),
}

#[derive(Clone)]
pub struct AuthorizationGate {
    verifier: RequestVerifier,
}

impl AuthorizationGate {
    pub fn new(verifier: RequestVerifier) -> Self {
        Self { verifier }
    }

    /// `true` if `principal` may perform `action` on `resource`.
    pub fn authorize(
        &self,
        principal: &Principal,
        resource: &str,
        action: Action,
        request: &SignedRequest<'_>,
    ) -> bool {
        self.check(principal, resource, action, request).is_ok()
    }

    /// Like [`authorize`](Self::authorize) but reports the reason for a
    /// refusal. Every refusal is logged here.
    pub fn check(
        &self,
        principal: &Principal,
        resource: &str,
        action: Action,
        request: &SignedRequest<'_>,
    ) -> Result<(), Denial> {
        match principal.privileges().decide(resource, action) {
            Decision::Granted => {}
            Decision::NoResource => {
                warn!(
                    user_id = principal.id(),
                    resource,
                    action = %action,
                    "missing privilege for resource"
                );
                return Err(Denial::MissingPrivilege);
            }
            Decision::Denied => {
                warn!(
                    user_id = principal.id(),
                    resource,
                    action = %action,
                    "missing privilege for action"
                );
                return Err(Denial::MissingPrivilege);
            }
        }

        if !is_mutating(request.method) {
            return Ok(());
        }

        let Some(secret) = principal.shared_secret() else {
            warn!(
                user_id = principal.id(),
                method = %request.method,
                "mutation without an established shared secret"
            );
            return Err(Denial::NoSharedSecret);
        };

        self.verifier
            .check(request, Some(secret.as_bytes()))
            .map_err(Denial::Signature)
    }

    /// [`check`](Self::check) with the action implied by the request method.
    ///
    /// Methods without a privilege action (`OPTIONS`, `TRACE`, ...) are
    /// refused.
    pub fn check_method(
        &self,
        principal: &Principal,
        resource: &str,
        request: &SignedRequest<'_>,
    ) -> Result<(), Denial> {
        let Some(action) = Action::from_method(request.method) else {
            warn!(
                user_id = principal.id(),
                resource,
                method = %request.method,
                "method maps to no privilege action"
            );
            return Err(Denial::MissingPrivilege);
        };
        self.check(principal, resource, action, request)
    }
}
