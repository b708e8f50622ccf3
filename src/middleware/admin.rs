// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin-only route guard. Runs after `require_auth`.

use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use axum::{extract::Request, middleware::Next, response::Response};

pub async fn require_admin(request: Request, next: Next) -> Result<Response, AppError> {
    let Some(AuthUser(user)) = request.extensions().get::<AuthUser>() else {
        return Err(AppError::Unauthorized);
    };

    if !user.is_admin {
        tracing::warn!(uid = %user.uid, path = %request.uri().path(), "Non-admin blocked");
        return Err(AppError::Forbidden("admin access required".to_string()));
    }

    Ok(next.run(request).await)
}
