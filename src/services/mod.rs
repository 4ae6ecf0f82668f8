pub mod admin_service;
pub mod dashboard_service;
pub mod merchant_service;
pub mod order_service;
pub mod product_service;
pub mod user_service;

pub use admin_service::AdminService;
pub use dashboard_service::{DashboardService, DashboardStats};
pub use merchant_service::{MerchantError, MerchantService, NewMerchant};
pub use order_service::OrderService;
pub use product_service::{NewProduct, ProductChanges, ProductError, ProductService, UpdatedProduct};
pub use user_service::UserService;
