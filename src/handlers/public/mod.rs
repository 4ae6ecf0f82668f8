// handlers/public/mod.rs - Public handlers (no authentication required)
pub mod login;
pub mod system;

pub use login::login_post;
pub use system::{health_get, root_get};
