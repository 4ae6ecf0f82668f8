use std::env;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Development-only signing key, rejected in any other environment.
const DEVELOPMENT_JWT_SECRET: &str = "development-secret-do-not-deploy";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub tenant: TenantConfig,
    pub stock: StockConfig,
    pub alerts: AlertConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout)
    }
}

#[derive(Clone)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
}

// Keep the signing key out of debug output.
impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("jwt_secret", &"<redacted>")
            .field("jwt_expiry_hours", &self.jwt_expiry_hours)
            .finish()
    }
}

/// Host-based tenant resolution settings
#[derive(Debug, Clone)]
pub struct TenantConfig {
    /// Subdomains that address the platform itself rather than a merchant
    pub reserved_subdomains: Vec<String>,
    /// Hostnames (port stripped, exact match) treated as local development
    pub local_hosts: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct StockConfig {
    pub low_stock_threshold: i32,
    /// Six-field cron expression (sec min hour day month weekday), evaluated in UTC
    pub check_schedule: String,
    pub monitor_enabled: bool,
}

#[derive(Debug, Clone)]
pub struct AlertConfig {
    pub webhook_url: Option<Url>,
    pub admin_email: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        let config = match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_overrides(&lookup)?;

        config.validate()?;
        Ok(config)
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    fn with_overrides<F>(mut self, lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server overrides
        if let Some(v) = lookup("PORT") {
            self.server.port = parse("PORT", &v)?;
        }
        if let Some(v) = lookup("CORS_ORIGINS") {
            self.server.cors_origins = split_list(&v);
        }

        // Database overrides
        if let Some(v) = lookup("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Some(v) = lookup("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse("DATABASE_MAX_CONNECTIONS", &v)?;
        }
        if let Some(v) = lookup("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = parse("DATABASE_CONNECTION_TIMEOUT", &v)?;
        }

        // Security overrides
        if let Some(v) = lookup("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Some(v) = lookup("JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = parse("JWT_EXPIRY_HOURS", &v)?;
        }

        // Tenant overrides
        if let Some(v) = lookup("TENANT_RESERVED_SUBDOMAINS") {
            self.tenant.reserved_subdomains = split_list(&v);
        }
        if let Some(v) = lookup("TENANT_LOCAL_HOSTS") {
            self.tenant.local_hosts = split_list(&v);
        }

        // Stock overrides
        if let Some(v) = lookup("LOW_STOCK_THRESHOLD") {
            self.stock.low_stock_threshold = parse("LOW_STOCK_THRESHOLD", &v)?;
        }
        if let Some(v) = lookup("STOCK_CHECK_SCHEDULE") {
            self.stock.check_schedule = v;
        }
        if let Some(v) = lookup("STOCK_MONITOR_ENABLED") {
            self.stock.monitor_enabled = parse("STOCK_MONITOR_ENABLED", &v)?;
        }

        // Alert overrides
        if let Some(v) = lookup("ALERT_WEBHOOK_URL") {
            let url = Url::parse(&v).map_err(|_| ConfigError::Invalid {
                key: "ALERT_WEBHOOK_URL",
                value: v.clone(),
            })?;
            self.alerts.webhook_url = Some(url);
        }
        if let Some(v) = lookup("ADMIN_EMAIL") {
            self.alerts.admin_email = Some(v);
        }

        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.security.jwt_secret.is_empty() {
            return Err(ConfigError::Missing("JWT_SECRET"));
        }
        if !self.is_development() && self.security.jwt_secret == DEVELOPMENT_JWT_SECRET {
            return Err(ConfigError::Missing("JWT_SECRET"));
        }
        if self.stock.low_stock_threshold < 1 {
            return Err(ConfigError::Invalid {
                key: "LOW_STOCK_THRESHOLD",
                value: self.stock.low_stock_threshold.to_string(),
            });
        }
        Ok(())
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 5000,
                cors_origins: vec!["http://localhost:3000".to_string()],
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            security: SecurityConfig {
                jwt_secret: DEVELOPMENT_JWT_SECRET.to_string(),
                jwt_expiry_hours: 24,
            },
            tenant: TenantConfig::default(),
            stock: StockConfig {
                low_stock_threshold: 5,
                check_schedule: "0 0 9 * * *".to_string(),
                monitor_enabled: false,
            },
            alerts: AlertConfig {
                webhook_url: None,
                admin_email: None,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                port: 5000,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
            },
            tenant: TenantConfig {
                reserved_subdomains: vec!["admin".to_string()],
                local_hosts: Vec::new(),
            },
            stock: StockConfig {
                low_stock_threshold: 5,
                check_schedule: "0 0 9 * * *".to_string(),
                monitor_enabled: true,
            },
            alerts: AlertConfig {
                webhook_url: None,
                admin_email: None,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                port: 5000,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
            },
            // No local bypass outside development
            tenant: TenantConfig {
                reserved_subdomains: vec!["admin".to_string()],
                local_hosts: Vec::new(),
            },
            stock: StockConfig {
                low_stock_threshold: 5,
                check_schedule: "0 0 9 * * *".to_string(),
                monitor_enabled: true,
            },
            alerts: AlertConfig {
                webhook_url: None,
                admin_email: None,
            },
        }
    }
}

impl Default for TenantConfig {
    fn default() -> Self {
        Self {
            reserved_subdomains: vec!["admin".to_string()],
            local_hosts: vec!["localhost".to_string(), "127.0.0.1".to_string()],
        }
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
    })
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
