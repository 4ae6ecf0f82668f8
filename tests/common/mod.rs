#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use merchant_admin_api::auth::{Claims, Role, TokenVerifier};
use merchant_admin_api::config::AppConfig;
use merchant_admin_api::database::models::{Merchant, Product};
use merchant_admin_api::database::{Database, DatabaseError};
use merchant_admin_api::notify::{LogNotifier, NotifyError, StockNotifier};
use merchant_admin_api::tenant::MerchantLookup;
use merchant_admin_api::types::MerchantId;
use merchant_admin_api::{app, AppState};

pub const TEST_SECRET: &str = "integration-test-secret";
const UNREACHABLE_DATABASE: &str = "postgres://nobody@127.0.0.1:1/none";

/// In-memory merchant registry with a lookup counter
pub struct FakeMerchants {
    by_subdomain: HashMap<String, Merchant>,
    calls: AtomicUsize,
    fail: bool,
}

impl FakeMerchants {
    pub fn new(merchants: Vec<Merchant>) -> Arc<Self> {
        Arc::new(Self {
            by_subdomain: merchants.into_iter().map(|m| (m.subdomain.clone(), m)).collect(),
            calls: AtomicUsize::new(0),
            fail: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            by_subdomain: HashMap::new(),
            calls: AtomicUsize::new(0),
            fail: true,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MerchantLookup for FakeMerchants {
    async fn find_by_subdomain(&self, subdomain: &str) -> Result<Option<Merchant>, DatabaseError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(DatabaseError::QueryError("connection refused".into()));
        }
        Ok(self.by_subdomain.get(subdomain).cloned())
    }
}

/// Records every alert instead of delivering it
#[derive(Default)]
pub struct RecordingNotifier {
    pub out_of_stock: Mutex<Vec<i32>>,
    pub low_stock: Mutex<Vec<(MerchantId, usize)>>,
}

#[async_trait]
impl StockNotifier for RecordingNotifier {
    async fn out_of_stock(&self, product: &Product) -> Result<(), NotifyError> {
        self.out_of_stock.lock().unwrap().push(product.id);
        Ok(())
    }

    async fn low_stock(&self, merchant_id: MerchantId, products: &[Product]) -> Result<(), NotifyError> {
        self.low_stock.lock().unwrap().push((merchant_id, products.len()));
        Ok(())
    }
}

pub fn merchant(id: MerchantId, subdomain: &str, is_active: bool) -> Merchant {
    Merchant {
        id,
        name: format!("Shop {}", id),
        subdomain: subdomain.to_string(),
        email: Some(format!("owner@{}.test", subdomain)),
        is_active,
        created_at: Utc::now(),
    }
}

pub fn test_config(database_url: &str) -> Result<AppConfig> {
    let database_url = database_url.to_string();
    let config = AppConfig::from_lookup(move |key| match key {
        "JWT_SECRET" => Some(TEST_SECRET.to_string()),
        "DATABASE_URL" => Some(database_url.clone()),
        "DATABASE_CONNECTION_TIMEOUT" => Some("1".to_string()),
        "DATABASE_MAX_CONNECTIONS" => Some("4".to_string()),
        _ => None,
    })?;
    Ok(config)
}

pub struct TestApp {
    pub router: Router,
    pub verifier: TokenVerifier,
}

impl TestApp {
    /// App backed by `lookup`, with a pool that is never reached.
    pub fn with_lookup(lookup: Arc<dyn MerchantLookup>) -> Result<Self> {
        let config = test_config(UNREACHABLE_DATABASE)?;
        let db = Database::connect_lazy(&config.database)?;
        Ok(Self::from_state(AppState::with_parts(config, db, lookup, Arc::new(LogNotifier))))
    }

    pub fn from_state(state: AppState) -> Self {
        Self {
            router: app(state),
            verifier: TokenVerifier::from_secret(TEST_SECRET.as_bytes(), 24),
        }
    }

    pub fn token(&self, role: Role, merchant_id: Option<MerchantId>) -> String {
        self.verifier
            .issue(1, "admin@platform.test", role, merchant_id)
            .unwrap()
    }

    /// Token with an arbitrary role string (or none)
    pub fn token_with_role(&self, role: Option<&str>) -> String {
        let mut claims = Claims::new(2, "staff@shop.test", Role::Admin, Some(1), chrono::Duration::hours(1));
        claims.role = role.map(str::to_string);
        self.verifier.sign(&claims).unwrap()
    }

    pub fn expired_token(&self, secret: &[u8]) -> String {
        let claims = Claims::new(3, "late@shop.test", Role::Admin, Some(1), chrono::Duration::hours(-2));
        TokenVerifier::from_secret(secret, 24).sign(&claims).unwrap()
    }

    pub async fn send(&self, request: Request<Body>) -> Result<(StatusCode, Value)> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = response.into_body().collect().await?.to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, body))
    }

    pub async fn get(&self, host: &str, path: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        self.send(request("GET", host, path, token, None)?).await
    }
}

pub fn request(
    method: &str,
    host: &str,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Result<Request<Body>> {
    let mut builder = Request::builder()
        .method(method)
        .uri(path)
        .header(header::HOST, host);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&json)?))?,
        None => builder.body(Body::empty())?,
    };
    Ok(request)
}
