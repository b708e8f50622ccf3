// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod admin;
pub mod api;

use crate::middleware::security::add_security_headers;
use crate::middleware::{require_admin, require_auth};
use crate::AppState;
use axum::http::{header, request::Parts, HeaderValue, Method};
use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HealthResponse {
    pub status: String,
    pub build_id: String,
    pub timestamp: String,
}

/// Liveness probe. Does not touch the store.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        build_id: option_env!("BUILD_ID").unwrap_or("unknown").to_string(),
        timestamp: crate::time_utils::format_utc_rfc3339(chrono::Utc::now()),
    })
}

/// Browser access is limited to the configured frontend plus local dev
/// servers. Bearer tokens travel in a header, so no credentials mode.
fn cors_layer(frontend_url: String) -> CorsLayer {
    let allowed = AllowOrigin::predicate(move |origin: &HeaderValue, _parts: &Parts| {
        let Ok(origin) = origin.to_str() else {
            return false;
        };
        origin == frontend_url
            || origin.starts_with("http://localhost")
            || origin.starts_with("http://127.0.0.1")
    });

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
}

/// Build the complete router with all routes.
///
/// `/api` routes need a valid token; `/admin` routes additionally need the
/// admin flag on the resolved user.
pub fn create_router(state: Arc<AppState>) -> Router {
    let authenticated = middleware::from_fn_with_state(state.clone(), require_auth);

    let user_routes = api::routes().route_layer(authenticated.clone());

    // route_layer wraps outside-in, so require_auth runs before require_admin.
    let admin_routes = admin::routes()
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(authenticated);

    Router::new()
        .route("/health", get(health_check))
        .merge(user_routes)
        .merge(admin_routes)
        .layer(middleware::from_fn(add_security_headers))
        .layer(cors_layer(state.config.frontend_url.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
