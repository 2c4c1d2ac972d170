// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::gate::AuthorizationGate;
use crate::auth::key_exchange::KeyExchange;
use crate::auth::replay::ReplayGuard;
use crate::auth::signature::RequestVerifier;
use crate::auth::token::SessionTokenService;
use crate::store::UserStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub key_exchange: Arc<KeyExchange>,
    pub tokens: Arc<SessionTokenService>,
    /// Shares its replay cache with `gate`.
    pub verifier: RequestVerifier,
    pub gate: AuthorizationGate,
    pub api_docs: bool,
}

impl AppState {
    pub fn new(
        store: Arc<dyn UserStore>,
        key_exchange: KeyExchange,
        tokens: SessionTokenService,
        replay: ReplayGuard,
    ) -> Self {
        let verifier = RequestVerifier::new(Arc::new(replay));
        Self {
            store,
            key_exchange: Arc::new(key_exchange),
            tokens: Arc::new(tokens),
            gate: AuthorizationGate::new(verifier.clone()),
            verifier,
            api_docs: false,
        }
    }

    pub fn with_api_docs(mut self, enabled: bool) -> Self {
        self.api_docs = enabled;
        self
    }
}
