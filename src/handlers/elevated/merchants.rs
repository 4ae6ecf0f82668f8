// handlers/elevated/merchants.rs - /admin/merchants
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::Serialize;

use crate::auth::AdminContext;
use crate::database::models::{Merchant, MerchantSummary};
use crate::error::ApiError;
use crate::handlers::record_id;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::NewMerchant;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct MerchantList {
    pub merchants: Vec<MerchantSummary>,
}

pub async fn list_get(State(state): State<AppState>) -> ApiResult<MerchantList> {
    let merchants = state.merchants().list_with_counts().await?;
    Ok(ApiResponse::success(MerchantList { merchants }))
}

pub async fn create_post(
    State(state): State<AppState>,
    admin: AdminContext,
    payload: Result<Json<NewMerchant>, JsonRejection>,
) -> ApiResult<Merchant> {
    let Json(input) = payload?;
    if let Some(field) = input.missing_field() {
        return Err(ApiError::invalid_field(field, "Name, subdomain, and email are required"));
    }

    let merchant = state.merchants().create(&input, &state.config.tenant).await?;
    tracing::info!("Super admin {} created merchant {}", admin.id, merchant.id);
    Ok(ApiResponse::created(merchant))
}

pub async fn toggle_active_put(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Merchant> {
    let id = record_id(&id, "merchant")?;
    let merchant = state
        .merchants()
        .toggle_active(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Merchant not found"))?;
    Ok(ApiResponse::success(merchant))
}
