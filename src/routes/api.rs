// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{NewSubscription, PlanType, Subscription, User};
use crate::services::SubscriptionView;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// API routes (require authentication).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route(
            "/api/subscriptions",
            get(list_subscriptions).post(create_subscription),
        )
        .route("/api/subscriptions/{id}", get(get_subscription))
        .route("/api/subscriptions/{id}/renew", post(renew_subscription))
        .route("/api/subscriptions/{id}/cancel", post(cancel_subscription))
}

// ─── User Profile ────────────────────────────────────────────

/// User as returned by the API.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserResponse {
    pub uid: String,
    pub email: String,
    pub email_verified: bool,
    pub display_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub full_name: String,
    pub phone_number: Option<String>,
    pub photo_url: Option<String>,
    pub is_active: bool,
    pub is_admin: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            full_name: user.full_name(),
            uid: user.uid,
            email: user.email,
            email_verified: user.email_verified,
            display_name: user.display_name,
            first_name: user.first_name,
            last_name: user.last_name,
            phone_number: user.phone_number,
            photo_url: user.photo_url,
            is_active: user.is_active,
            is_admin: user.is_admin,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Get current user profile.
async fn get_me(Extension(AuthUser(user)): Extension<AuthUser>) -> Json<UserResponse> {
    Json(user.into())
}

// ─── Subscriptions ───────────────────────────────────────────

/// Request to record a subscription payment.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSubscriptionRequest {
    pub plan_type: PlanType,
    #[validate(range(min = 0))]
    pub amount_minor: i64,
    #[serde(default = "default_currency")]
    #[validate(length(equal = 3))]
    pub currency: String,
    #[validate(length(max = 50))]
    pub payment_method: Option<String>,
    #[validate(length(max = 255))]
    pub payment_reference: Option<String>,
    #[serde(default = "default_auto_renew")]
    pub auto_renew: bool,
    pub start_date: Option<DateTime<Utc>>,
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_auto_renew() -> bool {
    true
}

impl CreateSubscriptionRequest {
    /// Validate and convert into a lifecycle input.
    pub fn into_new_subscription(
        self,
        user_id: String,
        payment_confirmed: bool,
    ) -> Result<NewSubscription> {
        self.validate()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        Ok(NewSubscription {
            user_id,
            plan_type: self.plan_type,
            amount_minor: self.amount_minor,
            currency: self.currency,
            payment_method: self.payment_method,
            payment_reference: self.payment_reference,
            auto_renew: self.auto_renew,
            start_date: self.start_date,
            payment_confirmed,
        })
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct CancelRequest {
    #[serde(default)]
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

/// List the caller's subscriptions with derived status.
async fn list_subscriptions(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Result<Json<Vec<SubscriptionView>>> {
    let subscriptions = state.subscription_service.list_for_user(&user.uid).await?;

    tracing::debug!(
        uid = %user.uid,
        count = subscriptions.len(),
        "Listed subscriptions"
    );

    Ok(Json(subscriptions))
}

/// Record a subscription for the caller. Payment is confirmed out of band,
/// so it starts out pending.
async fn create_subscription(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(body): Json<CreateSubscriptionRequest>,
) -> Result<Json<SubscriptionView>> {
    let new = body.into_new_subscription(user.uid, false)?;
    let subscription = state.subscription_service.create_subscription(new).await?;
    Ok(Json(state.subscription_service.view(subscription)))
}

/// Load a subscription the caller may act on.
///
/// Other users' subscriptions are reported as not found.
async fn owned_subscription(state: &AppState, user: &User, id: &str) -> Result<Subscription> {
    let subscription = state.subscription_service.get_subscription(id).await?;
    if subscription.user_id != user.uid && !user.is_admin {
        tracing::warn!(uid = %user.uid, subscription_id = %id, "Access to foreign subscription");
        return Err(AppError::NotFound(format!("Subscription {} not found", id)));
    }
    Ok(subscription)
}

async fn get_subscription(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<SubscriptionView>> {
    let subscription = owned_subscription(&state, &user, &id).await?;
    Ok(Json(state.subscription_service.view(subscription)))
}

async fn renew_subscription(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<SubscriptionView>> {
    owned_subscription(&state, &user, &id).await?;
    let renewed = state.subscription_service.renew_subscription(&id).await?;
    Ok(Json(state.subscription_service.view(renewed)))
}

async fn cancel_subscription(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<String>,
    body: Option<Json<CancelRequest>>,
) -> Result<Json<SubscriptionView>> {
    let body = body.map(|Json(body)| body).unwrap_or_default();
    body.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    owned_subscription(&state, &user, &id).await?;
    let cancelled = state
        .subscription_service
        .cancel_subscription(&id, body.reason)
        .await?;
    Ok(Json(state.subscription_service.view(cancelled)))
}
