use sqlx::PgPool;

use crate::database::models::Admin;
use crate::database::{DatabaseError, ScopedQuery, SqlParam};

/// Administrator accounts. Admins are looked up before any tenant is known,
/// so these queries are platform-level.
#[derive(Clone)]
pub struct AdminService {
    pool: PgPool,
}

impl AdminService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Admin>, DatabaseError> {
        ScopedQuery::unscoped(
            "SELECT id, email, password_hash, role, merchant_id FROM admins WHERE email = $1",
            vec![SqlParam::from(email)],
        )
        .fetch_optional(&self.pool)
        .await
    }
}
