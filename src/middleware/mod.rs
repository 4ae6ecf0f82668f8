pub mod auth;
pub mod response;
pub mod tenant;

pub use auth::{require_admin, require_super_admin};
pub use response::{ApiResponse, ApiResult};
pub use tenant::{resolve_tenant, TenantScope};
