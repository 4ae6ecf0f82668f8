use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use super::user_service::COUNT_USERS;
use crate::database::{scope_query, DatabaseError, SqlParam};
use crate::tenant::Scope;

pub(crate) const ORDER_TOTAL_BY_STATUS: &str = "SELECT COALESCE(SUM(total_amount), 0) FROM orders WHERE status = $1";
pub(crate) const COUNT_ORDERS_BY_STATUS: &str = "SELECT COUNT(*) FROM orders WHERE status = $1";
pub(crate) const COUNT_LOW_STOCK: &str = "SELECT COUNT(*) FROM products WHERE stock < $1";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// Sum of delivered order totals
    pub total_sales: Decimal,
    pub pending_orders: i64,
    pub low_stock_products: i64,
    pub total_users: i64,
}

#[derive(Clone)]
pub struct DashboardService {
    pool: PgPool,
}

impl DashboardService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn stats(&self, scope: &Scope, low_stock_threshold: i32) -> Result<DashboardStats, DatabaseError> {
        let (total_sales,): (Decimal,) =
            scope_query(scope, ORDER_TOTAL_BY_STATUS, vec![SqlParam::from("delivered")])?
                .fetch_one(&self.pool)
                .await?;

        let pending_orders = scope_query(scope, COUNT_ORDERS_BY_STATUS, vec![SqlParam::from("pending")])?
            .fetch_count(&self.pool)
            .await?;

        let low_stock_products = scope_query(scope, COUNT_LOW_STOCK, vec![SqlParam::from(low_stock_threshold)])?
            .fetch_count(&self.pool)
            .await?;

        let total_users = scope_query(scope, COUNT_USERS, vec![])?
            .fetch_count(&self.pool)
            .await?;

        Ok(DashboardStats {
            total_sales,
            pending_orders,
            low_stock_products,
            total_users,
        })
    }
}
