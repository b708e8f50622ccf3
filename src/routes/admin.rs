// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin routes over users and subscriptions.
//!
//! Subscription changes go through the lifecycle service; status is never
//! written directly.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::routes::api::{CancelRequest, CreateSubscriptionRequest, UserResponse};
use crate::services::SubscriptionView;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

const DEFAULT_LIST_LIMIT: u32 = 100;
const MAX_LIST_LIMIT: u32 = 500;

/// Admin routes. Both auth and admin middleware are applied in routes/mod.rs.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/users", get(list_users))
        .route("/admin/users/{uid}", get(get_user))
        .route("/admin/users/{uid}/status", put(set_user_status))
        .route("/admin/users/{uid}/admin", put(set_user_admin))
        .route(
            "/admin/subscriptions",
            get(list_subscriptions).post(create_subscription),
        )
        .route(
            "/admin/subscriptions/{id}/activate",
            post(activate_subscription),
        )
        .route("/admin/subscriptions/{id}/renew", post(renew_subscription))
        .route("/admin/subscriptions/{id}/cancel", post(cancel_subscription))
}

#[derive(Deserialize)]
struct ListQuery {
    limit: Option<u32>,
}

impl ListQuery {
    fn limit(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT)
    }
}

// ─── Users ───────────────────────────────────────────────────

async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<UserResponse>>> {
    let users = state.db.list_users(params.limit()).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> Result<Json<UserResponse>> {
    Ok(Json(state.identity_service.get_user(&uid).await?.into()))
}

#[derive(Deserialize)]
struct UserStatusRequest {
    is_active: bool,
}

async fn set_user_status(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
    Path(uid): Path<String>,
    Json(body): Json<UserStatusRequest>,
) -> Result<Json<UserResponse>> {
    if uid == admin.uid {
        return Err(AppError::BadRequest(
            "admins cannot change their own status".to_string(),
        ));
    }

    tracing::info!(admin = %admin.uid, uid = %uid, is_active = body.is_active, "Admin status change");
    let user = state
        .identity_service
        .set_active(&uid, body.is_active)
        .await?;
    Ok(Json(user.into()))
}

#[derive(Deserialize)]
struct UserAdminRequest {
    is_admin: bool,
}

async fn set_user_admin(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
    Path(uid): Path<String>,
    Json(body): Json<UserAdminRequest>,
) -> Result<Json<UserResponse>> {
    if uid == admin.uid {
        return Err(AppError::BadRequest(
            "admins cannot change their own admin flag".to_string(),
        ));
    }

    tracing::info!(admin = %admin.uid, uid = %uid, is_admin = body.is_admin, "Admin flag change");
    let user = state
        .identity_service
        .set_admin(&uid, body.is_admin)
        .await?;
    Ok(Json(user.into()))
}

// ─── Subscriptions ───────────────────────────────────────────

async fn list_subscriptions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<SubscriptionView>>> {
    Ok(Json(
        state
            .subscription_service
            .list_all(params.limit())
            .await?,
    ))
}

#[derive(Deserialize)]
struct AdminCreateSubscriptionRequest {
    user_id: String,
    #[serde(default)]
    payment_confirmed: bool,
    #[serde(flatten)]
    subscription: CreateSubscriptionRequest,
}

/// Record a subscription on behalf of a user, e.g. after a payment webhook.
async fn create_subscription(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AdminCreateSubscriptionRequest>,
) -> Result<Json<SubscriptionView>> {
    let new = body
        .subscription
        .into_new_subscription(body.user_id, body.payment_confirmed)?;
    let subscription = state.subscription_service.create_subscription(new).await?;
    Ok(Json(state.subscription_service.view(subscription)))
}

async fn activate_subscription(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SubscriptionView>> {
    let subscription = state.subscription_service.activate_subscription(&id).await?;
    Ok(Json(state.subscription_service.view(subscription)))
}

async fn renew_subscription(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SubscriptionView>> {
    let subscription = state.subscription_service.renew_subscription(&id).await?;
    Ok(Json(state.subscription_service.view(subscription)))
}

async fn cancel_subscription(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Option<Json<CancelRequest>>,
) -> Result<Json<SubscriptionView>> {
    let body = body.map(|Json(body)| body).unwrap_or_default();
    body.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let subscription = state
        .subscription_service
        .cancel_subscription(&id, body.reason)
        .await?;
    Ok(Json(state.subscription_service.view(subscription)))
}
