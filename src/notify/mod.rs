//! Stock alerts.
//!
//! Alerts are best effort: a notifier that fails logs the failure and the
//! request or monitor run that triggered it carries on.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::config::AlertConfig;
use crate::database::models::Product;
use crate::types::MerchantId;

pub mod monitor;

pub use monitor::StockMonitor;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Webhook request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Webhook returned {0}")]
    Status(reqwest::StatusCode),
}

/// Delivery channel for stock alerts
#[async_trait]
pub trait StockNotifier: Send + Sync {
    /// A product's stock just dropped to zero.
    async fn out_of_stock(&self, product: &Product) -> Result<(), NotifyError>;

    /// Products of one merchant that are running low.
    async fn low_stock(&self, merchant_id: MerchantId, products: &[Product]) -> Result<(), NotifyError>;
}

/// Fire an out-of-stock alert, logging instead of failing.
pub async fn alert_out_of_stock(notifier: &dyn StockNotifier, product: &Product) {
    match notifier.out_of_stock(product).await {
        Ok(()) => tracing::info!("Out of stock alert sent for product: {}", product.name),
        Err(e) => tracing::error!("Failed to send out of stock alert for product {}: {}", product.id, e),
    }
}

/// Build the notifier the configuration asks for
pub fn from_config(config: &AlertConfig) -> Arc<dyn StockNotifier> {
    match &config.webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url.clone(), config.admin_email.clone())),
        None => Arc::new(LogNotifier),
    }
}

/// Writes alerts to the log only
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl StockNotifier for LogNotifier {
    async fn out_of_stock(&self, product: &Product) -> Result<(), NotifyError> {
        tracing::warn!(
            product_id = product.id,
            merchant_id = product.merchant_id,
            "Product out of stock: {}",
            product.name
        );
        Ok(())
    }

    async fn low_stock(&self, merchant_id: MerchantId, products: &[Product]) -> Result<(), NotifyError> {
        for p in products {
            tracing::warn!(merchant_id, product_id = p.id, stock = p.stock, "Low stock: {}", p.name);
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum AlertPayload<'a> {
    OutOfStock {
        to: Option<&'a str>,
        subject: &'static str,
        merchant_id: MerchantId,
        product: &'a Product,
    },
    LowStock {
        to: Option<&'a str>,
        subject: &'static str,
        merchant_id: MerchantId,
        products: &'a [Product],
    },
}

/// Posts alerts as JSON to a webhook (mail relay, chat hook, ...)
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: Url,
    admin_email: Option<String>,
}

impl WebhookNotifier {
    pub fn new(url: Url, admin_email: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            admin_email,
        }
    }

    async fn post(&self, payload: &AlertPayload<'_>) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(self.url.clone())
            .timeout(WEBHOOK_TIMEOUT)
            .json(payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotifyError::Status(response.status()));
        }
        Ok(())
    }
}

#[async_trait]
impl StockNotifier for WebhookNotifier {
    async fn out_of_stock(&self, product: &Product) -> Result<(), NotifyError> {
        self.post(&AlertPayload::OutOfStock {
            to: self.admin_email.as_deref(),
            subject: "URGENT: Product Out of Stock",
            merchant_id: product.merchant_id,
            product,
        })
        .await
    }

    async fn low_stock(&self, merchant_id: MerchantId, products: &[Product]) -> Result<(), NotifyError> {
        self.post(&AlertPayload::LowStock {
            to: self.admin_email.as_deref(),
            subject: "Low Stock Alert - Action Required",
            merchant_id,
            products,
        })
        .await
    }
}
