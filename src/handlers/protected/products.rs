// handlers/protected/products.rs - /admin/products
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::database::models::Product;
use crate::error::ApiError;
use crate::handlers::record_id;
use crate::middleware::{ApiResponse, ApiResult, TenantScope};
use crate::notify::alert_out_of_stock;
use crate::services::{NewProduct, ProductChanges};
use crate::state::AppState;
use crate::types::{PageQuery, Pagination};

const DEFAULT_PAGE_SIZE: i64 = 10;

#[derive(Debug, Serialize)]
pub struct ProductList {
    pub products: Vec<Product>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct LowStockList {
    pub products: Vec<Product>,
    pub count: usize,
}

pub async fn list_get(
    State(state): State<AppState>,
    TenantScope(scope): TenantScope,
    Query(query): Query<PageQuery>,
) -> ApiResult<ProductList> {
    let page = query.resolve(DEFAULT_PAGE_SIZE);
    let (products, total) = state.products().list(&scope, page).await?;
    Ok(ApiResponse::success(ProductList {
        products,
        pagination: page.with_total(total),
    }))
}

pub async fn low_stock_get(
    State(state): State<AppState>,
    TenantScope(scope): TenantScope,
) -> ApiResult<LowStockList> {
    let products = state
        .products()
        .low_stock(&scope, state.config.stock.low_stock_threshold)
        .await?;
    Ok(ApiResponse::success(LowStockList {
        count: products.len(),
        products,
    }))
}

pub async fn create_post(
    State(state): State<AppState>,
    TenantScope(scope): TenantScope,
    payload: Result<Json<NewProduct>, JsonRejection>,
) -> ApiResult<Product> {
    let Json(input) = payload?;
    let product = state.products().create(&scope, input).await?;
    Ok(ApiResponse::created(product))
}

pub async fn update_put(
    State(state): State<AppState>,
    TenantScope(scope): TenantScope,
    Path(id): Path<String>,
    payload: Result<Json<ProductChanges>, JsonRejection>,
) -> ApiResult<Product> {
    let id = record_id(&id, "product")?;
    let Json(changes) = payload?;

    let updated = state
        .products()
        .update(&scope, id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;

    if updated.ran_out() {
        alert_out_of_stock(state.notifier.as_ref(), &updated.product).await;
    }

    Ok(ApiResponse::success(updated.product))
}

pub async fn delete(
    State(state): State<AppState>,
    TenantScope(scope): TenantScope,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let id = record_id(&id, "product")?;
    if !state.products().delete(&scope, id).await? {
        return Err(ApiError::not_found("Product not found"));
    }
    tracing::info!("Deleted product {}", id);
    Ok(ApiResponse::success(json!({ "message": "Product deleted successfully" })))
}
