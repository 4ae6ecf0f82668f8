// handlers/protected/orders.rs - /admin/orders
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::database::models::{Order, OrderStatus, OrderSummary};
use crate::error::ApiError;
use crate::handlers::record_id;
use crate::middleware::{ApiResponse, ApiResult, TenantScope};
use crate::state::AppState;
use crate::types::{PageQuery, Pagination};

const DEFAULT_PAGE_SIZE: i64 = 20;

#[derive(Debug, Default, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct OrderList {
    pub orders: Vec<OrderSummary>,
    pub pagination: Pagination,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StatusChange {
    pub status: String,
}

pub async fn list_get(
    State(state): State<AppState>,
    TenantScope(scope): TenantScope,
    Query(query): Query<OrderListQuery>,
) -> ApiResult<OrderList> {
    let page = PageQuery {
        page: query.page,
        limit: query.limit,
    }
    .resolve(DEFAULT_PAGE_SIZE);
    // Unknown status values are ignored rather than rejected
    let status = query.status.as_deref().and_then(|s| s.parse::<OrderStatus>().ok());

    let (orders, total) = state.orders().list(&scope, status, page).await?;
    Ok(ApiResponse::success(OrderList {
        orders,
        pagination: page.with_total(total),
    }))
}

pub async fn update_put(
    State(state): State<AppState>,
    TenantScope(scope): TenantScope,
    Path(id): Path<String>,
    payload: Result<Json<StatusChange>, JsonRejection>,
) -> ApiResult<Order> {
    let id = record_id(&id, "order")?;
    let Json(change) = payload?;
    let status: OrderStatus = change.status.parse().map_err(|_| {
        ApiError::invalid_field("status", "Invalid status. Must be: pending, shipped, or delivered")
    })?;

    let order = state
        .orders()
        .update_status(&scope, id, status)
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found"))?;
    Ok(ApiResponse::success(order))
}
