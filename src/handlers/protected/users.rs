// handlers/protected/users.rs - /admin/users
use axum::extract::{Path, Query, State};
use serde::Serialize;

use crate::database::models::{User, UserContact, UserOrder};
use crate::error::ApiError;
use crate::handlers::record_id;
use crate::middleware::{ApiResponse, ApiResult, TenantScope};
use crate::state::AppState;
use crate::types::{PageQuery, Pagination};

const DEFAULT_PAGE_SIZE: i64 = 20;

#[derive(Debug, Serialize)]
pub struct UserList {
    pub users: Vec<User>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct ToggledUser {
    pub message: String,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct UserOrderHistory {
    pub user: UserContact,
    pub orders: Vec<UserOrder>,
}

pub async fn list_get(
    State(state): State<AppState>,
    TenantScope(scope): TenantScope,
    Query(query): Query<PageQuery>,
) -> ApiResult<UserList> {
    let page = query.resolve(DEFAULT_PAGE_SIZE);
    let (users, total) = state.users().list(&scope, page).await?;
    Ok(ApiResponse::success(UserList {
        users,
        pagination: page.with_total(total),
    }))
}

pub async fn toggle_active_put(
    State(state): State<AppState>,
    TenantScope(scope): TenantScope,
    Path(id): Path<String>,
) -> ApiResult<ToggledUser> {
    let id = record_id(&id, "user")?;
    let user = state
        .users()
        .toggle_active(&scope, id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(ApiResponse::success(ToggledUser {
        message: format!("User {} successfully", if user.is_active { "activated" } else { "blocked" }),
        user,
    }))
}

pub async fn orders_get(
    State(state): State<AppState>,
    TenantScope(scope): TenantScope,
    Path(id): Path<String>,
) -> ApiResult<UserOrderHistory> {
    let id = record_id(&id, "user")?;
    let user = state
        .users()
        .contact(&scope, id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    let orders = state.orders().for_user(&scope, id).await?;

    Ok(ApiResponse::success(UserOrderHistory { user, orders }))
}
