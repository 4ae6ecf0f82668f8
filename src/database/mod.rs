pub mod manager;
pub mod models;
pub mod scope;

pub use manager::{Database, DatabaseError};
pub use scope::{scope_query, scope_query_on, ScopedQuery, SqlParam, OWNER_COLUMN};
