pub mod admin;
pub mod merchant;
pub mod order;
pub mod product;
pub mod user;

pub use admin::Admin;
pub use merchant::{Merchant, MerchantSummary};
pub use order::{Order, OrderStatus, OrderSummary, UserOrder};
pub use product::Product;
pub use user::{User, UserContact};
