// handlers/public/login.rs - POST /admin/login
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::password::verify_password;
use crate::auth::{AdminContext, AuthError, Role};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub admin: AdminContext,
    /// Token lifetime in seconds
    pub expires_in: i64,
}

/// Exchange admin credentials for a bearer token.
///
/// Unknown email and wrong password produce the same 401.
pub async fn login_post(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<LoginResponse> {
    let Json(input) = payload?;
    let email = input.email.trim().to_string();
    if email.is_empty() || input.password.is_empty() {
        return Err(ApiError::bad_request("Email and password required"));
    }

    let invalid = || ApiError::unauthorized("Invalid credentials");

    let admin = state.admins().find_by_email(&email).await?.ok_or_else(|| {
        tracing::debug!("Login failed for unknown email");
        invalid()
    })?;

    // bcrypt blocks for ~100ms; run it off the async workers
    let hash = admin.password_hash.clone();
    let password = input.password;
    let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AuthError::Internal(format!("Password check failed: {}", e)))?;
    if !matches {
        tracing::debug!("Login failed for admin {}: wrong password", admin.id);
        return Err(invalid());
    }

    let role: Role = admin.role.parse().map_err(|e| {
        tracing::warn!("Admin {} has unrecognised role '{}'", admin.id, admin.role);
        e
    })?;

    let token = state.verifier.issue(admin.id, &admin.email, role, admin.merchant_id)?;
    tracing::info!("Admin {} logged in", admin.id);

    Ok(ApiResponse::success(LoginResponse {
        token,
        admin: AdminContext {
            id: admin.id,
            email: admin.email,
            role,
            merchant_id: admin.merchant_id,
        },
        expires_in: state.verifier.ttl().num_seconds(),
    }))
}
