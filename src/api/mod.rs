// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    routing::{any, get, put},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{
        privileges::{Action, ActionFlags},
        session::session_middleware,
        PrivilegeSet,
    },
    error::ApiError,
    models::{
        LoginRequest, LoginResponse, LoginUser, LogoutRequest, PublicKeyResponse, RefreshRequest,
        RefreshResponse, Role, StatusResponse, TokenLookupRequest, UpdateUserRequest, UserSummary,
    },
    state::AppState,
};

pub mod auth;
pub mod health;
pub mod http_log;
pub mod users;

pub fn router(state: AppState) -> Router {
    // Token endpoints resolve sessions themselves; gated resources go
    // through the session middleware.
    let auth_routes = Router::new()
        .route(
            "/auth",
            put(auth::login)
                .post(auth::refresh)
                .delete(auth::logout)
                .get(auth::current),
        )
        .route("/auth/healthz", get(health::auth_liveness));

    let user_routes = Router::new()
        .route("/users/me", get(users::get_current_user))
        .route(
            "/users/{id}",
            get(users::get_user).patch(users::update_user),
        )
        .route_layer(from_fn_with_state(state.clone(), session_middleware));

    let v1_routes = Router::new().merge(auth_routes).merge(user_routes);

    let docs = if state.api_docs {
        Router::new().merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
    } else {
        Router::new()
            .route("/docs", any(docs_disabled))
            .route("/docs/{*rest}", any(docs_disabled))
    };

    Router::new()
        .nest("/api/v1", v1_routes)
        .route("/healthz", get(health::liveness))
        .route("/readyz", get(health::readiness))
        .merge(docs)
        .with_state(state)
        .layer(from_fn(http_log::http_log))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

async fn docs_disabled() -> ApiError {
    ApiError::new(StatusCode::FORBIDDEN, "API documentation is disabled")
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login,
        auth::refresh,
        auth::logout,
        auth::current,
        health::auth_liveness,
        health::liveness,
        health::readiness,
        users::get_current_user,
        users::get_user,
        users::update_user
    ),
    components(
        schemas(
            Action,
            ActionFlags,
            PrivilegeSet,
            Role,
            UserSummary,
            LoginUser,
            PublicKeyResponse,
            LoginRequest,
            LoginResponse,
            RefreshRequest,
            RefreshResponse,
            LogoutRequest,
            TokenLookupRequest,
            StatusResponse,
            UpdateUserRequest
        )
    ),
    tags(
        (name = "Auth", description = "Key exchange, login, refresh and logout"),
        (name = "Users", description = "Privilege-gated user records"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
pub struct ApiDoc;
