use sqlx::FromRow;

use crate::types::MerchantId;

/// Administrator account as stored; never serialized.
#[derive(Debug, Clone, FromRow)]
pub struct Admin {
    pub id: i32,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub merchant_id: Option<MerchantId>,
}
