use sqlx::PgPool;

use crate::database::models::{Order, OrderStatus, OrderSummary, UserOrder};
use crate::database::{scope_query, scope_query_on, DatabaseError, SqlParam};
use crate::tenant::Scope;
use crate::types::Page;

pub(crate) const UPDATE_ORDER_STATUS: &str =
    "UPDATE orders SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING *";
pub(crate) const ORDERS_FOR_USER: &str =
    "SELECT id, total_amount, status, created_at FROM orders WHERE user_id = $1 ORDER BY created_at DESC";

/// Ownership column for statements that join `orders o` with `users u`
pub(crate) const ORDER_OWNER: &str = "o.merchant_id";

/// Count and page statements for the order list, before scoping
pub(crate) struct OrderListStatements {
    pub count: String,
    pub count_params: Vec<SqlParam>,
    pub list: String,
    pub list_params: Vec<SqlParam>,
}

pub(crate) fn order_list_statements(status: Option<OrderStatus>, page: Page) -> OrderListStatements {
    let mut filter = String::new();
    let mut params = Vec::new();
    if let Some(status) = status {
        filter.push_str(" WHERE o.status = $1");
        params.push(SqlParam::from(status.as_str()));
    }

    let count = format!("SELECT COUNT(*) FROM orders o{}", filter);
    let list = format!(
        r#"
        SELECT
            o.id, o.user_id, o.total_amount, o.status, o.created_at, o.updated_at,
            u.name AS customer_name, u.email AS customer_email
        FROM orders o
        JOIN users u ON o.user_id = u.id{}
        ORDER BY o.created_at DESC LIMIT ${} OFFSET ${}
        "#,
        filter,
        params.len() + 1,
        params.len() + 2
    );

    let count_params = params.clone();
    params.push(SqlParam::from(page.limit));
    params.push(SqlParam::from(page.offset()));

    OrderListStatements {
        count,
        count_params,
        list,
        list_params: params,
    }
}

#[derive(Clone)]
pub struct OrderService {
    pool: PgPool,
}

impl OrderService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Orders joined with their customer, newest first, optionally filtered by status
    pub async fn list(
        &self,
        scope: &Scope,
        status: Option<OrderStatus>,
        page: Page,
    ) -> Result<(Vec<OrderSummary>, i64), DatabaseError> {
        let statements = order_list_statements(status, page);

        let total = scope_query_on(scope, ORDER_OWNER, &statements.count, statements.count_params)?
            .fetch_count(&self.pool)
            .await?;

        let orders = scope_query_on(scope, ORDER_OWNER, &statements.list, statements.list_params)?
            .fetch_all(&self.pool)
            .await?;

        Ok((orders, total))
    }

    /// `None` when no order with `id` is visible in `scope`
    pub async fn update_status(
        &self,
        scope: &Scope,
        id: i32,
        status: OrderStatus,
    ) -> Result<Option<Order>, DatabaseError> {
        let order = scope_query(
            scope,
            UPDATE_ORDER_STATUS,
            vec![SqlParam::from(status.as_str()), SqlParam::from(id)],
        )?
        .fetch_optional::<Order>(&self.pool)
        .await?;

        if let Some(o) = &order {
            tracing::info!("Order {} of merchant {} marked {}", o.id, o.merchant_id, o.status);
        }
        Ok(order)
    }

    /// Order history for one customer
    pub async fn for_user(&self, scope: &Scope, user_id: i32) -> Result<Vec<UserOrder>, DatabaseError> {
        scope_query(scope, ORDERS_FOR_USER, vec![SqlParam::from(user_id)])?
            .fetch_all(&self.pool)
            .await
    }
}
