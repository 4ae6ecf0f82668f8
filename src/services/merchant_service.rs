use async_trait::async_trait;
use serde::Deserialize;
use sqlx::PgPool;

use crate::config::TenantConfig;
use crate::database::models::{Merchant, MerchantSummary};
use crate::database::{DatabaseError, ScopedQuery, SqlParam};
use crate::tenant::MerchantLookup;
use crate::types::MerchantId;

#[derive(Debug, thiserror::Error)]
pub enum MerchantError {
    #[error("Subdomain already exists: {0}")]
    SubdomainTaken(String),
    #[error("{0}")]
    InvalidSubdomain(&'static str),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewMerchant {
    pub name: String,
    pub subdomain: String,
    pub email: String,
}

impl NewMerchant {
    /// Name of the first missing required field, if any
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            ("name", &self.name),
            ("subdomain", &self.subdomain),
            ("email", &self.email),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
    }

    /// Normalised subdomain, provided the tenant resolver can route to it:
    /// a single DNS label that is neither reserved nor a local host name.
    pub fn routable_subdomain(&self, tenants: &TenantConfig) -> Result<String, MerchantError> {
        let subdomain = self.subdomain.trim().to_ascii_lowercase();

        let is_label = (1..=63).contains(&subdomain.len())
            && subdomain.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
            && !subdomain.starts_with('-')
            && !subdomain.ends_with('-');
        if !is_label {
            return Err(MerchantError::InvalidSubdomain(
                "Subdomain must be a single label of letters, digits and hyphens",
            ));
        }

        let taken_by_platform = tenants
            .reserved_subdomains
            .iter()
            .chain(tenants.local_hosts.iter())
            .any(|name| name.eq_ignore_ascii_case(&subdomain));
        if taken_by_platform {
            return Err(MerchantError::InvalidSubdomain("Subdomain is reserved for the platform"));
        }

        Ok(subdomain)
    }
}

/// Merchant registry. Merchants are platform-level rows and are never tenant-scoped.
#[derive(Clone)]
pub struct MerchantService {
    pool: PgPool,
}

impl MerchantService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All merchants, newest first, with per-merchant record counts
    pub async fn list_with_counts(&self) -> Result<Vec<MerchantSummary>, DatabaseError> {
        ScopedQuery::unscoped(
            r#"
            SELECT
                m.id, m.name, m.subdomain, m.email, m.is_active, m.created_at,
                COUNT(DISTINCT u.id) AS user_count,
                COUNT(DISTINCT p.id) AS product_count,
                COUNT(DISTINCT o.id) AS order_count
            FROM merchants m
            LEFT JOIN users u ON m.id = u.merchant_id
            LEFT JOIN products p ON m.id = p.merchant_id
            LEFT JOIN orders o ON m.id = o.merchant_id
            GROUP BY m.id
            ORDER BY m.created_at DESC
            "#,
            vec![],
        )
        .fetch_all(&self.pool)
        .await
    }

    pub async fn create(&self, input: &NewMerchant, tenants: &TenantConfig) -> Result<Merchant, MerchantError> {
        let subdomain = input.routable_subdomain(tenants)?;
        let result = ScopedQuery::unscoped(
            "INSERT INTO merchants (name, subdomain, email) VALUES ($1, $2, $3) RETURNING *",
            vec![
                SqlParam::from(input.name.trim()),
                SqlParam::from(subdomain.as_str()),
                SqlParam::from(input.email.trim()),
            ],
        )
        .fetch_one::<Merchant>(&self.pool)
        .await;

        match result {
            Ok(merchant) => {
                tracing::info!("Created merchant {} ({})", merchant.id, merchant.subdomain);
                Ok(merchant)
            }
            Err(e) if e.is_unique_violation() => Err(MerchantError::SubdomainTaken(subdomain)),
            Err(e) => Err(e.into()),
        }
    }

    /// Flip `is_active`; `None` when the merchant does not exist
    pub async fn toggle_active(&self, id: MerchantId) -> Result<Option<Merchant>, DatabaseError> {
        let merchant = ScopedQuery::unscoped(
            "UPDATE merchants SET is_active = NOT is_active WHERE id = $1 RETURNING *",
            vec![SqlParam::from(id)],
        )
        .fetch_optional::<Merchant>(&self.pool)
        .await?;

        if let Some(m) = &merchant {
            tracing::info!("Merchant {} is now {}", m.id, if m.is_active { "active" } else { "inactive" });
        }
        Ok(merchant)
    }
}

#[async_trait]
impl MerchantLookup for MerchantService {
    async fn find_by_subdomain(&self, subdomain: &str) -> Result<Option<Merchant>, DatabaseError> {
        ScopedQuery::unscoped(
            "SELECT id, name, subdomain, email, is_active, created_at FROM merchants WHERE subdomain = $1",
            vec![SqlParam::from(subdomain)],
        )
        .fetch_optional(&self.pool)
        .await
    }
}
