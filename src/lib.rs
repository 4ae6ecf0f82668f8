use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod notify;
pub mod services;
pub mod state;
pub mod tenant;
pub mod types;

pub use state::AppState;

use config::ServerConfig;
use handlers::{elevated, protected, public};
use middleware::{require_admin, require_super_admin, resolve_tenant};

/// Build the HTTP application around shared state.
pub fn app(state: AppState) -> Router {
    Router::new()
        // Public
        .route("/", get(public::root_get))
        .route("/health", get(public::health_get))
        .route("/admin/login", post(public::login_post))
        .merge(admin_routes(&state))
        .merge(tenant_routes(&state))
        .merge(merchant_routes(&state))
        // Global middleware; trace wraps cors
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.server)),
        )
        .with_state(state)
}

/// Any admin, no tenant needed
fn admin_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/dashboard", get(protected::dashboard::dashboard_get))
        .route_layer(from_fn_with_state(state.clone(), require_admin))
}

/// Any admin, queries scoped to the resolved tenant. Auth runs before tenant
/// resolution (outermost `route_layer` runs first).
fn tenant_routes(state: &AppState) -> Router<AppState> {
    use protected::{dashboard, orders, products, users};

    Router::new()
        .route("/admin/whoami", get(dashboard::whoami_get))
        .route("/admin/dashboard/stats", get(dashboard::stats_get))
        .route("/admin/products", get(products::list_get).post(products::create_post))
        .route("/admin/products/low-stock", get(products::low_stock_get))
        .route("/admin/products/:id", put(products::update_put).delete(products::delete))
        .route("/admin/orders", get(orders::list_get))
        .route("/admin/orders/:id", put(orders::update_put))
        .route("/admin/users", get(users::list_get))
        .route("/admin/users/:id/toggle-active", put(users::toggle_active_put))
        .route("/admin/users/:id/orders", get(users::orders_get))
        .route_layer(from_fn_with_state(state.clone(), resolve_tenant))
        .route_layer(from_fn_with_state(state.clone(), require_admin))
}

/// Platform operators only; never host-scoped
fn merchant_routes(state: &AppState) -> Router<AppState> {
    use elevated::merchants;

    Router::new()
        .route("/admin/merchants", get(merchants::list_get).post(merchants::create_post))
        .route("/admin/merchants/:id/toggle-active", put(merchants::toggle_active_put))
        .route_layer(from_fn_with_state(state.clone(), require_super_admin))
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}
