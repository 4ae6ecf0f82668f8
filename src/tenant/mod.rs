//! Host-based tenant resolution.
//!
//! A request addresses either the platform (reserved subdomain or a local
//! development host) or exactly one merchant, identified by the first label
//! of the `Host` header.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::auth::{AdminContext, AuthError, Role};
use crate::config::TenantConfig;
use crate::database::models::Merchant;
use crate::database::DatabaseError;
use crate::types::MerchantId;

/// Which rows a request may touch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "merchant_id", rename_all = "snake_case")]
pub enum Scope {
    /// Platform-level access, no ownership filter
    Unscoped,
    /// Restricted to rows owned by one merchant
    ScopedTo(MerchantId),
}

#[derive(Debug, Error)]
pub enum TenantError {
    #[error("Merchant not found")]
    NotFound { subdomain: String },

    #[error("Merchant account is inactive")]
    Inactive { subdomain: String },

    #[error("Tenant lookup failed: {0}")]
    Lookup(#[from] DatabaseError),
}

/// Read access to the merchant registry
#[async_trait]
pub trait MerchantLookup: Send + Sync {
    async fn find_by_subdomain(&self, subdomain: &str) -> Result<Option<Merchant>, DatabaseError>;
}

/// Outcome of resolving a request host
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedTenant {
    pub scope: Scope,
    pub merchant: Option<Merchant>,
}

impl ResolvedTenant {
    pub fn platform() -> Self {
        Self {
            scope: Scope::Unscoped,
            merchant: None,
        }
    }

    /// Narrow the host-derived scope to what `admin` may see.
    ///
    /// Only a super admin on a platform host stays unscoped. A plain admin is
    /// always pinned to its own merchant and may not act on another
    /// merchant's host.
    pub fn scope_for(&self, admin: &AdminContext) -> Result<Scope, AuthError> {
        match (self.scope, admin.role) {
            (Scope::Unscoped, Role::SuperAdmin) => Ok(Scope::Unscoped),
            (Scope::ScopedTo(m), Role::SuperAdmin) => Ok(Scope::ScopedTo(m)),
            (Scope::Unscoped, Role::Admin) => admin
                .merchant_id
                .map(Scope::ScopedTo)
                .ok_or(AuthError::MerchantBindingMissing),
            (Scope::ScopedTo(m), Role::Admin) => match admin.merchant_id {
                Some(own) if own == m => Ok(Scope::ScopedTo(m)),
                Some(_) => Err(AuthError::TenantMismatch),
                None => Err(AuthError::MerchantBindingMissing),
            },
        }
    }
}

/// Resolves request hosts to a [`ResolvedTenant`]. Cheap to clone.
#[derive(Clone)]
pub struct TenantResolver {
    lookup: Arc<dyn MerchantLookup>,
    reserved_subdomains: Arc<[String]>,
    local_hosts: Arc<[String]>,
}

impl TenantResolver {
    pub fn new(lookup: Arc<dyn MerchantLookup>, config: &TenantConfig) -> Self {
        Self {
            lookup,
            reserved_subdomains: normalise(&config.reserved_subdomains),
            local_hosts: normalise(&config.local_hosts),
        }
    }

    pub async fn resolve(&self, host: &str) -> Result<ResolvedTenant, TenantError> {
        let hostname = strip_port(host.trim()).to_ascii_lowercase();
        let subdomain = hostname.split('.').next().unwrap_or_default();

        if self.is_platform_host(&hostname, subdomain) {
            tracing::debug!("Host '{}' resolved to platform scope", hostname);
            return Ok(ResolvedTenant::platform());
        }

        if subdomain.is_empty() {
            return Err(TenantError::NotFound {
                subdomain: String::new(),
            });
        }

        let merchant = self
            .lookup
            .find_by_subdomain(subdomain)
            .await?
            .ok_or_else(|| TenantError::NotFound {
                subdomain: subdomain.to_string(),
            })?;

        if !merchant.is_active {
            return Err(TenantError::Inactive {
                subdomain: subdomain.to_string(),
            });
        }

        tracing::debug!("Host '{}' resolved to merchant {} ({})", hostname, merchant.id, merchant.name);
        Ok(ResolvedTenant {
            scope: Scope::ScopedTo(merchant.id),
            merchant: Some(merchant),
        })
    }

    fn is_platform_host(&self, hostname: &str, subdomain: &str) -> bool {
        self.reserved_subdomains.iter().any(|s| s == subdomain)
            || self.local_hosts.iter().any(|h| h == hostname)
    }
}

fn normalise(values: &[String]) -> Arc<[String]> {
    values.iter().map(|v| v.trim().to_ascii_lowercase()).collect()
}

/// Drop a trailing `:port`, keeping bracketed IPv6 literals whole.
fn strip_port(host: &str) -> &str {
    if let Some(end) = host.strip_prefix('[').and_then(|rest| rest.find(']')) {
        return &host[..end + 2];
    }
    match host.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeMerchants {
        by_subdomain: HashMap<String, Merchant>,
        calls: AtomicUsize,
        fail: bool,
    }

    impl FakeMerchants {
        fn new(merchants: Vec<Merchant>) -> Arc<Self> {
            Arc::new(Self {
                by_subdomain: merchants.into_iter().map(|m| (m.subdomain.clone(), m)).collect(),
                calls: AtomicUsize::new(0),
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                by_subdomain: HashMap::new(),
                calls: AtomicUsize::new(0),
                fail: true,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MerchantLookup for FakeMerchants {
        async fn find_by_subdomain(&self, subdomain: &str) -> Result<Option<Merchant>, DatabaseError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(DatabaseError::QueryError("connection reset".into()));
            }
            Ok(self.by_subdomain.get(subdomain).cloned())
        }
    }

    fn merchant(id: MerchantId, subdomain: &str, is_active: bool) -> Merchant {
        Merchant {
            id,
            name: format!("Shop {}", id),
            subdomain: subdomain.to_string(),
            email: None,
            is_active,
            created_at: Utc::now(),
        }
    }

    fn resolver(lookup: Arc<FakeMerchants>) -> TenantResolver {
        TenantResolver::new(lookup, &TenantConfig::default())
    }

    fn admin(role: Role, merchant_id: Option<MerchantId>) -> AdminContext {
        AdminContext {
            id: 1,
            email: "a@shop.test".to_string(),
            role,
            merchant_id,
        }
    }

    #[tokio::test]
    async fn reserved_subdomain_skips_lookup() {
        let lookup = FakeMerchants::new(vec![merchant(1, "admin", true)]);
        let tenant = resolver(lookup.clone()).resolve("admin.example.com").await.unwrap();
        assert_eq!(tenant.scope, Scope::Unscoped);
        assert_eq!(lookup.calls(), 0);

        let tenant = resolver(lookup.clone()).resolve("ADMIN.example.com:443").await.unwrap();
        assert_eq!(tenant.scope, Scope::Unscoped);
        assert_eq!(lookup.calls(), 0);
    }

    #[tokio::test]
    async fn local_hosts_skip_lookup_on_exact_match_only() {
        let lookup = FakeMerchants::new(vec![]);
        let r = resolver(lookup.clone());

        assert_eq!(r.resolve("localhost:5000").await.unwrap().scope, Scope::Unscoped);
        assert_eq!(r.resolve("127.0.0.1").await.unwrap().scope, Scope::Unscoped);
        assert_eq!(lookup.calls(), 0);

        let err = r.resolve("notlocalhost.example.com").await.unwrap_err();
        assert!(matches!(err, TenantError::NotFound { ref subdomain } if subdomain == "notlocalhost"));
        assert_eq!(lookup.calls(), 1);
    }

    #[tokio::test]
    async fn unknown_subdomain_is_not_found() {
        let lookup = FakeMerchants::new(vec![merchant(1, "acme", true)]);
        let err = resolver(lookup).resolve("globex.example.com").await.unwrap_err();
        assert!(matches!(err, TenantError::NotFound { .. }));
    }

    #[tokio::test]
    async fn inactive_merchant_is_rejected_even_though_it_exists() {
        let lookup = FakeMerchants::new(vec![merchant(2, "sleepy", false)]);
        let err = resolver(lookup.clone()).resolve("sleepy.example.com").await.unwrap_err();
        assert!(matches!(err, TenantError::Inactive { .. }));
        assert_eq!(lookup.calls(), 1);
    }

    #[tokio::test]
    async fn active_merchant_scopes_request() {
        let lookup = FakeMerchants::new(vec![merchant(7, "acme", true)]);
        let tenant = resolver(lookup).resolve("Acme.Example.com:8443").await.unwrap();
        assert_eq!(tenant.scope, Scope::ScopedTo(7));
        assert_eq!(tenant.merchant.map(|m| m.id), Some(7));
    }

    #[tokio::test]
    async fn lookup_failure_is_internal() {
        let err = resolver(FakeMerchants::failing()).resolve("acme.example.com").await.unwrap_err();
        assert!(matches!(err, TenantError::Lookup(_)));
    }

    #[tokio::test]
    async fn empty_host_is_not_found_without_lookup() {
        let lookup = FakeMerchants::new(vec![]);
        let err = resolver(lookup.clone()).resolve("").await.unwrap_err();
        assert!(matches!(err, TenantError::NotFound { .. }));
        assert_eq!(lookup.calls(), 0);
    }

    #[test]
    fn strips_ports() {
        assert_eq!(strip_port("shop.example.com:8080"), "shop.example.com");
        assert_eq!(strip_port("shop.example.com"), "shop.example.com");
        assert_eq!(strip_port("[::1]:5000"), "[::1]");
        assert_eq!(strip_port("[::1]"), "[::1]");
    }

    #[test]
    fn super_admin_keeps_host_scope() {
        let sa = admin(Role::SuperAdmin, None);
        assert_eq!(ResolvedTenant::platform().scope_for(&sa), Ok(Scope::Unscoped));

        let scoped = ResolvedTenant {
            scope: Scope::ScopedTo(3),
            merchant: None,
        };
        assert_eq!(scoped.scope_for(&sa), Ok(Scope::ScopedTo(3)));
    }

    #[test]
    fn plain_admin_is_pinned_to_own_merchant() {
        let own = admin(Role::Admin, Some(3));
        assert_eq!(ResolvedTenant::platform().scope_for(&own), Ok(Scope::ScopedTo(3)));

        let scoped = ResolvedTenant {
            scope: Scope::ScopedTo(3),
            merchant: None,
        };
        assert_eq!(scoped.scope_for(&own), Ok(Scope::ScopedTo(3)));

        let other = admin(Role::Admin, Some(4));
        assert_eq!(scoped.scope_for(&other), Err(AuthError::TenantMismatch));

        let unbound = admin(Role::Admin, None);
        assert_eq!(
            ResolvedTenant::platform().scope_for(&unbound),
            Err(AuthError::MerchantBindingMissing)
        );
        assert_eq!(scoped.scope_for(&unbound), Err(AuthError::MerchantBindingMissing));
    }
}
