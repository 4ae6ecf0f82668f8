use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::types::MerchantId;

/// Tenant account. `subdomain` is unique.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Merchant {
    pub id: MerchantId,
    pub name: String,
    pub subdomain: String,
    pub email: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Merchant row with per-tenant record counts, for the super admin listing
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MerchantSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub merchant: Merchant,
    pub user_count: i64,
    pub product_count: i64,
    pub order_count: i64,
}
