use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use cron::Schedule;
use tokio::task::JoinHandle;

use super::StockNotifier;
use crate::config::{ConfigError, StockConfig};
use crate::database::models::Product;
use crate::database::DatabaseError;
use crate::services::ProductService;
use crate::types::MerchantId;

/// Periodic low-stock sweep across every merchant
pub struct StockMonitor {
    products: ProductService,
    notifier: Arc<dyn StockNotifier>,
    threshold: i32,
    expression: String,
    schedule: Schedule,
}

impl StockMonitor {
    pub fn new(
        products: ProductService,
        notifier: Arc<dyn StockNotifier>,
        config: &StockConfig,
    ) -> Result<Self, ConfigError> {
        let schedule = Schedule::from_str(&config.check_schedule).map_err(|_| ConfigError::Invalid {
            key: "STOCK_CHECK_SCHEDULE",
            value: config.check_schedule.clone(),
        })?;

        Ok(Self {
            products,
            notifier,
            threshold: config.low_stock_threshold,
            expression: config.check_schedule.clone(),
            schedule,
        })
    }

    /// Run one sweep now. Returns the number of merchants alerted.
    pub async fn run_once(&self) -> Result<usize, DatabaseError> {
        let low = self.products.running_low(self.threshold).await?;
        if low.is_empty() {
            tracing::debug!("Stock check found no low stock products");
            return Ok(0);
        }

        let by_merchant = group_by_merchant(low);
        let mut alerted = 0;
        for (merchant_id, products) in &by_merchant {
            match self.notifier.low_stock(*merchant_id, products).await {
                Ok(()) => {
                    alerted += 1;
                    tracing::info!(
                        "Low stock alert sent for {} products of merchant {}",
                        products.len(),
                        merchant_id
                    );
                }
                Err(e) => tracing::error!("Failed to send low stock alert for merchant {}: {}", merchant_id, e),
            }
        }
        Ok(alerted)
    }

    /// Sweep on every tick of the schedule until the task is aborted.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!("Stock monitoring started (schedule '{}', UTC)", self.expression);
            loop {
                let Some(next) = self.schedule.upcoming(Utc).next() else {
                    tracing::warn!("Stock check schedule has no upcoming runs; monitor stopped");
                    return;
                };
                let wait = (next - Utc::now()).to_std().unwrap_or_default();
                tokio::time::sleep(wait).await;

                if let Err(e) = self.run_once().await {
                    tracing::error!("Error checking low stock: {}", e);
                }
            }
        })
    }
}

fn group_by_merchant(products: Vec<Product>) -> BTreeMap<MerchantId, Vec<Product>> {
    let mut grouped: BTreeMap<MerchantId, Vec<Product>> = BTreeMap::new();
    for p in products {
        grouped.entry(p.merchant_id).or_default().push(p);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::LogNotifier;
    use rust_decimal::Decimal;
    use sqlx::postgres::PgPoolOptions;

    fn product(id: i32, merchant_id: MerchantId, stock: i32) -> Product {
        Product {
            id,
            merchant_id,
            name: format!("Item {}", id),
            description: None,
            price: Decimal::ONE,
            stock,
            category: None,
            image_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn config(schedule: &str) -> StockConfig {
        StockConfig {
            low_stock_threshold: 5,
            check_schedule: schedule.to_string(),
            monitor_enabled: true,
        }
    }

    fn products() -> ProductService {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://nobody@127.0.0.1:1/none")
            .unwrap();
        ProductService::new(pool)
    }

    #[test]
    fn groups_one_batch_per_merchant() {
        let grouped = group_by_merchant(vec![product(1, 2, 1), product(2, 1, 3), product(3, 2, 4)]);
        let merchants: Vec<_> = grouped.keys().copied().collect();
        assert_eq!(merchants, vec![1, 2]);
        assert_eq!(grouped[&2].iter().map(|p| p.id).collect::<Vec<_>>(), vec![1, 3]);
    }

    #[tokio::test]
    async fn rejects_bad_schedule() {
        let err = StockMonitor::new(products(), Arc::new(LogNotifier), &config("every morning"));
        assert!(matches!(err, Err(ConfigError::Invalid { key: "STOCK_CHECK_SCHEDULE", .. })));
    }

    #[tokio::test]
    async fn accepts_default_schedule() {
        let monitor = StockMonitor::new(products(), Arc::new(LogNotifier), &config("0 0 9 * * *")).unwrap();
        assert!(monitor.schedule.upcoming(Utc).next().is_some());
    }
}
