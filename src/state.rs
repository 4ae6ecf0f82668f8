use std::sync::Arc;

use crate::auth::TokenVerifier;
use crate::config::AppConfig;
use crate::database::Database;
use crate::notify::{self, StockNotifier};
use crate::services::{
    AdminService, DashboardService, MerchantService, OrderService, ProductService, UserService,
};
use crate::tenant::{MerchantLookup, TenantResolver};

/// Shared application state handed to every handler and middleware
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Database,
    pub verifier: Arc<TokenVerifier>,
    pub tenants: TenantResolver,
    pub notifier: Arc<dyn StockNotifier>,
}

impl AppState {
    /// Wire the production components around a database handle.
    pub fn new(config: AppConfig, db: Database) -> Self {
        let merchants: Arc<dyn MerchantLookup> = Arc::new(MerchantService::new(db.pool().clone()));
        let notifier = notify::from_config(&config.alerts);
        Self::with_parts(config, db, merchants, notifier)
    }

    /// Same as [`AppState::new`] with the merchant lookup and notifier supplied by the caller.
    pub fn with_parts(
        config: AppConfig,
        db: Database,
        merchants: Arc<dyn MerchantLookup>,
        notifier: Arc<dyn StockNotifier>,
    ) -> Self {
        let verifier = Arc::new(TokenVerifier::new(&config.security));
        let tenants = TenantResolver::new(merchants, &config.tenant);
        Self {
            config: Arc::new(config),
            db,
            verifier,
            tenants,
            notifier,
        }
    }

    pub fn admins(&self) -> AdminService {
        AdminService::new(self.db.pool().clone())
    }

    pub fn merchants(&self) -> MerchantService {
        MerchantService::new(self.db.pool().clone())
    }

    pub fn products(&self) -> ProductService {
        ProductService::new(self.db.pool().clone())
    }

    pub fn orders(&self) -> OrderService {
        OrderService::new(self.db.pool().clone())
    }

    pub fn users(&self) -> UserService {
        UserService::new(self.db.pool().clone())
    }

    pub fn dashboard(&self) -> DashboardService {
        DashboardService::new(self.db.pool().clone())
    }
}
