// handlers/public/system.rs - GET / and GET /health
use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};

use crate::state::AppState;

pub async fn root_get() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Merchant Admin API",
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": {
                "login": "/admin/login (public)",
                "dashboard": "/admin/dashboard[/stats] (admin)",
                "products": "/admin/products[/:id] (admin, tenant scoped)",
                "orders": "/admin/orders[/:id] (admin, tenant scoped)",
                "users": "/admin/users[/:id] (admin, tenant scoped)",
                "merchants": "/admin/merchants[/:id] (super admin)",
            }
        }
    }))
}

pub async fn health_get(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let now = chrono::Utc::now();

    match state.db.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "database": "unavailable"
                    }
                })),
            )
        }
    }
}
