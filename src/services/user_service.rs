use sqlx::PgPool;

use crate::database::models::{User, UserContact};
use crate::database::{scope_query, DatabaseError, SqlParam};
use crate::tenant::Scope;
use crate::types::Page;

pub(crate) const LIST_USERS: &str =
    "SELECT id, merchant_id, name, email, is_active, created_at FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2";
pub(crate) const COUNT_USERS: &str = "SELECT COUNT(*) FROM users";
pub(crate) const TOGGLE_USER: &str =
    "UPDATE users SET is_active = NOT is_active WHERE id = $1 RETURNING id, merchant_id, name, email, is_active, created_at";
pub(crate) const USER_CONTACT: &str = "SELECT name, email FROM users WHERE id = $1";

#[derive(Clone)]
pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, scope: &Scope, page: Page) -> Result<(Vec<User>, i64), DatabaseError> {
        let users = scope_query(
            scope,
            LIST_USERS,
            vec![SqlParam::from(page.limit), SqlParam::from(page.offset())],
        )?
        .fetch_all(&self.pool)
        .await?;

        let total = scope_query(scope, COUNT_USERS, vec![])?
            .fetch_count(&self.pool)
            .await?;

        Ok((users, total))
    }

    /// Flip `is_active` (block/unblock). `None` when the user is not visible in `scope`.
    pub async fn toggle_active(&self, scope: &Scope, id: i32) -> Result<Option<User>, DatabaseError> {
        let user = scope_query(scope, TOGGLE_USER, vec![SqlParam::from(id)])?
            .fetch_optional::<User>(&self.pool)
            .await?;

        if let Some(u) = &user {
            tracing::info!("User {} {}", u.id, if u.is_active { "activated" } else { "blocked" });
        }
        Ok(user)
    }

    pub async fn contact(&self, scope: &Scope, id: i32) -> Result<Option<UserContact>, DatabaseError> {
        scope_query(scope, USER_CONTACT, vec![SqlParam::from(id)])?
            .fetch_optional(&self.pool)
            .await
    }
}
