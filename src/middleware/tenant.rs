use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::HOST, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::auth::AdminContext;
use crate::error::ApiError;
use crate::state::AppState;
use crate::tenant::{ResolvedTenant, Scope};

/// Tenant hook: resolve the merchant addressed by the `Host` header and
/// attach the [`ResolvedTenant`] to the request.
pub async fn resolve_tenant(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let host = request
        .headers()
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .or_else(|| request.uri().host())
        .unwrap_or_default()
        .to_string();

    let tenant = state.tenants.resolve(&host).await.map_err(|e| {
        tracing::debug!("Tenant resolution failed for host '{}': {}", host, e);
        e
    })?;

    request.extensions_mut().insert(tenant);
    Ok(next.run(request).await)
}

/// Effective data scope for the calling admin on the resolved tenant.
///
/// Requires both the auth and tenant hooks to have run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantScope(pub Scope);

#[async_trait]
impl<S> FromRequestParts<S> for TenantScope
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let admin = AdminContext::from_request_parts(parts, state).await?;
        let tenant = parts.extensions.get::<ResolvedTenant>().ok_or_else(|| {
            tracing::error!("ResolvedTenant missing; route is not behind the tenant layer");
            ApiError::internal_server_error("Server error")
        })?;

        let scope = tenant.scope_for(&admin).map_err(|e| {
            tracing::warn!("Admin {} denied on tenant {:?}: {}", admin.id, tenant.scope, e);
            e
        })?;
        Ok(TenantScope(scope))
    }
}
