// handlers/protected/mod.rs - Admin handlers (JWT + tenant scope)
//
// Every query here runs under the caller's `TenantScope`.
pub mod dashboard;
pub mod orders;
pub mod products;
pub mod users;
