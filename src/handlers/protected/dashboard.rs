// handlers/protected/dashboard.rs - GET /admin/dashboard, /admin/dashboard/stats, /admin/whoami
use axum::extract::{Extension, State};
use serde::Serialize;

use crate::auth::AdminContext;
use crate::database::models::Merchant;
use crate::middleware::{ApiResponse, ApiResult, TenantScope};
use crate::services::DashboardStats;
use crate::state::AppState;
use crate::tenant::{ResolvedTenant, Scope};

#[derive(Debug, Serialize)]
pub struct Welcome {
    pub message: String,
    pub admin: AdminContext,
}

pub async fn dashboard_get(admin: AdminContext) -> ApiResult<Welcome> {
    Ok(ApiResponse::success(Welcome {
        message: format!("Welcome to the admin dashboard, {}", admin.email),
        admin,
    }))
}

pub async fn stats_get(
    State(state): State<AppState>,
    TenantScope(scope): TenantScope,
) -> ApiResult<DashboardStats> {
    let stats = state
        .dashboard()
        .stats(&scope, state.config.stock.low_stock_threshold)
        .await?;
    Ok(ApiResponse::success(stats))
}

#[derive(Debug, Serialize)]
pub struct WhoAmI {
    pub admin: AdminContext,
    pub scope: Scope,
    pub merchant: Option<Merchant>,
}

/// Caller identity plus the scope its queries will run under
pub async fn whoami_get(
    admin: AdminContext,
    TenantScope(scope): TenantScope,
    Extension(tenant): Extension<ResolvedTenant>,
) -> ApiResult<WhoAmI> {
    Ok(ApiResponse::success(WhoAmI {
        admin,
        scope,
        merchant: tenant.merchant,
    }))
}
