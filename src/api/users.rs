// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.
//!
//! Access to other users goes through the authorization gate on the
//! `app_user` resource; updates must also be signed.

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;

use crate::auth::{Auth, AuthError, RequestContext};
use crate::error::ApiError;
use crate::models::{UpdateUserRequest, UserSummary};
use crate::state::AppState;
use crate::store::UserField;

/// Privilege resource guarding user records.
pub const USER_RESOURCE: &str = "app_user";

/// Get the current authenticated user's information.
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "User information", body = UserSummary),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn get_current_user(Auth(principal): Auth) -> Json<UserSummary> {
    Json(UserSummary::from(principal.user()))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = i64, Path, description = "User identifier")),
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, body = UserSummary),
        (status = 401, description = "No valid session"),
        (status = 403, description = "Missing app_user.read"),
        (status = 404, description = "No such user"),
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Auth(principal): Auth,
    ctx: RequestContext,
    Path(id): Path<i64>,
) -> Result<Json<UserSummary>, ApiError> {
    state
        .gate
        .check_method(&principal, USER_RESOURCE, &ctx.signed())
        .map_err(AuthError::from)?;

    let user = state.store.get_by_id(id)?;
    Ok(Json(UserSummary::from(&user)))
}

/// Rename a user. Requires `app_user.update` and a signed request.
#[utoipa::path(
    patch,
    path = "/api/v1/users/{id}",
    params(("id" = i64, Path, description = "User identifier")),
    request_body = UpdateUserRequest,
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, body = UserSummary),
        (status = 400, description = "Missing, stale or invalid signature"),
        (status = 401, description = "No valid session"),
        (status = 403, description = "Missing app_user.update"),
        (status = 404, description = "No such user"),
        (status = 409, description = "Concurrent modification"),
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    Auth(principal): Auth,
    ctx: RequestContext,
    Path(id): Path<i64>,
) -> Result<Json<UserSummary>, ApiError> {
    state
        .gate
        .check_method(&principal, USER_RESOURCE, &ctx.signed())
        .map_err(AuthError::from)?;

    let request: UpdateUserRequest = ctx.json()?;
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("name must not be empty"));
    }

    let mut user = state.store.get_by_id(id)?;
    user.name = name.to_string();
    let saved = state.store.update(&user, &[UserField::Name])?;

    info!(user_id = saved.id, by = principal.id(), "user renamed");
    Ok(Json(UserSummary::from(&saved)))
}
