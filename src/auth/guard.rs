use serde::Serialize;

use super::{AuthError, Principal, Role};
use crate::types::MerchantId;

/// Access level a route requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    /// Any administrator (`admin` or `super_admin`)
    Admin,
    /// Platform operators only
    SuperAdminOnly,
}

/// Authorized administrator, attached to the request for handlers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminContext {
    pub id: i32,
    pub email: String,
    pub role: Role,
    #[serde(rename = "merchantId")]
    pub merchant_id: Option<MerchantId>,
}

impl AdminContext {
    pub fn is_super_admin(&self) -> bool {
        match self.role {
            Role::SuperAdmin => true,
            Role::Admin => false,
        }
    }
}

/// Decide whether `principal` may use a route with the given access level.
pub fn authorize(principal: Principal, access: RouteAccess) -> Result<AdminContext, AuthError> {
    let role = principal.role.ok_or(AuthError::InsufficientRole)?;

    match (access, role) {
        (RouteAccess::SuperAdminOnly, Role::Admin) => return Err(AuthError::SuperAdminRequired),
        (RouteAccess::SuperAdminOnly, Role::SuperAdmin)
        | (RouteAccess::Admin, Role::Admin)
        | (RouteAccess::Admin, Role::SuperAdmin) => {}
    }

    Ok(AdminContext {
        id: principal.id,
        email: principal.email,
        role,
        merchant_id: principal.merchant_id,
    })
}
