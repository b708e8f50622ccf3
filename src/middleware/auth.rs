// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bearer token authentication middleware.

use crate::error::AppError;
use crate::models::User;
use crate::services::firebase_auth::extract_bearer_token;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Authenticated user resolved by the access gate.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

/// Middleware that requires a valid Firebase ID token.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = extract_bearer_token(auth_header).ok_or(AppError::Unauthorized)?;

    let user = state.access_gate.authenticate(token).await?;

    request.extensions_mut().insert(AuthUser(user));

    Ok(next.run(request).await)
}
