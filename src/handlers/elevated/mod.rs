// handlers/elevated/mod.rs - Super admin handlers
//
// Merchant management spans all tenants and is never scoped by host.
pub mod merchants;
