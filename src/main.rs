// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sigil_api::api::router;
use sigil_api::auth::password::hash_password;
use sigil_api::auth::privileges::{Action, PrivilegeSet};
use sigil_api::auth::{KeyExchange, ReplayGuard, SessionTokenService};
use sigil_api::config::{json_logs, Settings, DEFAULT_LOG_FILTER};
use sigil_api::models::{Role, User};
use sigil_api::state::AppState;
use sigil_api::store::InMemoryUserStore;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = json_logs(|name| std::env::var(name).ok());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

/// Administrator with every action on the user resource.
fn seed_admin(store: &InMemoryUserStore, email: &str, password: &str) -> Result<(), String> {
    let password_hash = hash_password(password).map_err(|e| e.to_string())?;
    store
        .insert(User {
            id: 1,
            version: 1,
            email: email.to_string(),
            name: "Administrator".to_string(),
            password_hash: Some(password_hash),
            refresh_token: None,
            shared_secret: None,
            roles: vec![Role {
                id: 1,
                name: "admin".to_string(),
                privileges: PrivilegeSet::new().grant(
                    "app_user",
                    &[Action::Read, Action::Create, Action::Update, Action::Delete],
                ),
            }],
        })
        .map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() {
    init_tracing();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    let tokens = match SessionTokenService::new(&settings.jwt_secret, settings.session_ttl, settings.refresh_ttl) {
        Ok(tokens) => tokens,
        Err(e) => {
            error!(error = %e, "cannot initialise token service");
            std::process::exit(1);
        }
    };

    let store = Arc::new(InMemoryUserStore::new());
    if let Some((email, password)) = &settings.seed_admin {
        match seed_admin(&store, email, password) {
            Ok(()) => info!(email = %email, "seeded administrator"),
            Err(e) => {
                error!(error = %e, "cannot seed administrator");
                std::process::exit(1);
            }
        }
    }

    let state = AppState::new(store, KeyExchange::generate(), tokens, ReplayGuard::default())
        .with_api_docs(settings.api_docs);
    let app = router(state);

    let addr = settings.bind_address();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, addr = %addr, "cannot bind");
            std::process::exit(1);
        }
    };

    info!(
        addr = %addr,
        docs = settings.api_docs,
        session_ttl_minutes = settings.session_ttl.num_minutes(),
        refresh_ttl_minutes = settings.refresh_ttl.num_minutes(),
        "Sigil API listening"
    );

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "server failed");
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
