use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::auth::{authorize, AdminContext, AuthError, RouteAccess};
use crate::error::ApiError;
use crate::state::AppState;

/// Authentication hook for routes open to any administrator
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authenticate(&state, RouteAccess::Admin, request, next).await
}

/// Authentication hook for platform-operator routes
pub async fn require_super_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authenticate(&state, RouteAccess::SuperAdminOnly, request, next).await
}

async fn authenticate(
    state: &AppState,
    access: RouteAccess,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .map(|value| value.to_str().map_err(|_| AuthError::InvalidCredential))
        .transpose()?;

    let admin = state
        .verifier
        .verify(header)
        .and_then(|principal| authorize(principal, access))
        .map_err(|e| {
            tracing::debug!("Rejected {} {}: {}", request.method(), request.uri().path(), e);
            e
        })?;

    tracing::debug!("Authenticated admin {} ({})", admin.id, admin.role);
    request.extensions_mut().insert(admin);

    Ok(next.run(request).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AdminContext>()
            .cloned()
            .ok_or_else(|| {
                tracing::error!("AdminContext missing; route is not behind an auth layer");
                ApiError::internal_server_error("Authentication error")
            })
    }
}
