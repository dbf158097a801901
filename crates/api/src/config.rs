//! Application configuration loaded from environment variables.

use std::time::Duration;

use common::UserToken;

use crate::integration::{IntegrationConfig, IntegrationDefaults};

/// Server and supplier configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `SUPPLIER_FUNCTION_URL` — base URL of the supplier function host
/// - `SUPPLIER_API_KEY` — bearer key for the function host (optional)
/// - `SUPPLIER_USER_TOKEN` — default caller token for purchases
/// - `SUPPLIER_USE_PROXY` — route supplier calls through the proxy (default: `false`)
/// - `SUPPLIER_TIMEOUT_MS` — per-call timeout (default: `10000`)
/// - `STOCK_MAX_RETRIES` — live attempts per stock lookup (default: `2`)
/// - `DATABASE_URL` — PostgreSQL fallback store; unset means in-memory
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub supplier_url: String,
    pub supplier_api_key: Option<String>,
    pub user_token: UserToken,
    pub use_proxy: bool,
    pub timeout_ms: u64,
    pub stock_max_retries: u32,
    pub database_url: Option<String>,
}

const DEFAULT_SUPPLIER_URL: &str = "http://localhost:54321/functions/v1";

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            host: non_empty("HOST").unwrap_or(defaults.host),
            port: non_empty("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: non_empty("RUST_LOG").unwrap_or(defaults.log_level),
            supplier_url: non_empty("SUPPLIER_FUNCTION_URL").unwrap_or(defaults.supplier_url),
            supplier_api_key: non_empty("SUPPLIER_API_KEY"),
            user_token: non_empty("SUPPLIER_USER_TOKEN")
                .map(UserToken::new)
                .unwrap_or(defaults.user_token),
            use_proxy: non_empty("SUPPLIER_USE_PROXY")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.use_proxy),
            timeout_ms: non_empty("SUPPLIER_TIMEOUT_MS")
                .and_then(|v| v.parse().ok())
                .filter(|ms| *ms > 0)
                .unwrap_or(defaults.timeout_ms),
            stock_max_retries: non_empty("STOCK_MAX_RETRIES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.stock_max_retries),
            database_url: non_empty("DATABASE_URL"),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Maps this configuration onto the integration facade.
    pub fn integration_config(&self) -> IntegrationConfig {
        let mut config = IntegrationConfig {
            defaults: IntegrationDefaults {
                user_token: self.user_token.clone(),
                use_proxy: self.use_proxy,
            },
            ..IntegrationConfig::default()
        };
        config.executor.default_timeout = self.timeout();
        config.products.call_timeout = self.timeout();
        config.products.max_retries = self.stock_max_retries;
        config.orders.call_timeout = self.timeout();
        config
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            supplier_url: DEFAULT_SUPPLIER_URL.to_string(),
            supplier_api_key: None,
            user_token: UserToken::default(),
            use_proxy: false,
            timeout_ms: 10_000,
            stock_max_retries: 2,
            database_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.timeout_ms, 10_000);
        assert_eq!(config.stock_max_retries, 2);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_reads_supplier_settings() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "8081"),
            ("SUPPLIER_FUNCTION_URL", "https://fn.example.com"),
            ("SUPPLIER_USER_TOKEN", "user-1"),
            ("SUPPLIER_USE_PROXY", "TRUE"),
            ("SUPPLIER_TIMEOUT_MS", "2500"),
            ("STOCK_MAX_RETRIES", "4"),
            ("DATABASE_URL", "postgres://localhost/app"),
        ]));

        assert_eq!(config.port, 8081);
        assert_eq!(config.supplier_url, "https://fn.example.com");
        assert_eq!(config.user_token.as_str(), "user-1");
        assert!(config.use_proxy);
        assert_eq!(config.timeout(), Duration::from_millis(2500));
        assert_eq!(config.stock_max_retries, 4);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/app"));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "not-a-port"),
            ("SUPPLIER_TIMEOUT_MS", "0"),
            ("DATABASE_URL", "  "),
        ]));
        assert_eq!(config.port, 3000);
        assert_eq!(config.timeout_ms, 10_000);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_integration_config_carries_settings() {
        let config = Config {
            timeout_ms: 1500,
            stock_max_retries: 3,
            use_proxy: true,
            ..Config::default()
        };
        let integration = config.integration_config();
        assert!(integration.defaults.use_proxy);
        assert_eq!(integration.executor.default_timeout, Duration::from_millis(1500));
        assert_eq!(integration.products.max_retries, 3);
        assert_eq!(integration.orders.call_timeout, Duration::from_millis(1500));
    }
}
