//! Call executor wrapping every outbound supplier call.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::cache::MemoryCache;
use crate::error::{TaphoammoError, classify_transport_error};
use crate::invoke::{
    DEBUG_MOCK_KEY, RemoteInvoker, SUPPLIER_FUNCTION, SupplierMethod, build_payload,
};
use crate::validator::validate;

/// Param keys that never take part in the cache key.
const NON_KEY_PARAMS: &[&str] = &[DEBUG_MOCK_KEY, "debug", "useMockData", "mock", "forceRefresh"];

/// Where a call result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Cache,
    Api,
    Mock,
}

/// A validated supplier response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallResult {
    pub data: Value,
    pub source: ResponseSource,
    pub timestamp: DateTime<Utc>,
    pub response_time_ms: u64,
}

/// Executor-wide defaults.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub default_timeout: Duration,
    pub default_cache_ttl: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(10),
            default_cache_ttl: Duration::from_secs(30),
        }
    }
}

/// Per-call options. Unset durations fall back to the executor defaults.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub timeout: Option<Duration>,
    pub force_refresh: bool,
    pub use_mock_data: bool,
    pub use_proxy: bool,
    pub cache_ttl: Option<Duration>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }

    pub fn use_mock_data(mut self, mock: bool) -> Self {
        self.use_mock_data = mock;
        self
    }

    pub fn use_proxy(mut self, proxy: bool) -> Self {
        self.use_proxy = proxy;
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }
}

/// Runs supplier calls through the memory cache, a timeout and the validator.
///
/// Failures are never cached. Every failure is mapped onto a
/// [`TaphoammoError`] before it is returned.
pub struct CallExecutor<I: RemoteInvoker> {
    invoker: I,
    cache: MemoryCache<Value>,
    config: ExecutorConfig,
}

impl<I: RemoteInvoker> CallExecutor<I> {
    /// Creates an executor with default timeouts and TTLs.
    pub fn new(invoker: I) -> Self {
        Self::with_config(invoker, ExecutorConfig::default())
    }

    pub fn with_config(invoker: I, config: ExecutorConfig) -> Self {
        Self {
            invoker,
            cache: MemoryCache::new(),
            config,
        }
    }

    /// Returns the underlying invoker.
    pub fn invoker(&self) -> &I {
        &self.invoker
    }

    /// Returns the memory cache tier.
    pub fn cache(&self) -> &MemoryCache<Value> {
        &self.cache
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Computes the cache slot for a logical call.
    ///
    /// Debug and mock flags are stripped so that the same logical call always
    /// maps onto the same slot.
    pub fn cache_key(method: SupplierMethod, params: &Map<String, Value>) -> String {
        let stripped: Map<String, Value> = params
            .iter()
            .filter(|(k, _)| !NON_KEY_PARAMS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        format!("{}:{}", method.as_str(), Value::Object(stripped))
    }

    /// Executes one supplier call.
    #[tracing::instrument(skip(self, method, params, options), fields(method = %method))]
    pub async fn execute(
        &self,
        method: SupplierMethod,
        params: Map<String, Value>,
        options: CallOptions,
    ) -> Result<CallResult, TaphoammoError> {
        let key = Self::cache_key(method, &params);

        if !options.force_refresh
            && let Some(entry) = self.cache.get(&key).await
        {
            metrics::counter!("supplier_cache_hits_total", "method" => method.as_str())
                .increment(1);
            metrics::counter!(
                "supplier_calls_total",
                "method" => method.as_str(),
                "source" => "cache"
            )
            .increment(1);
            tracing::debug!("served from memory cache");
            return Ok(CallResult {
                data: entry.value,
                source: ResponseSource::Cache,
                timestamp: entry.stored_at,
                response_time_ms: 0,
            });
        }

        let timeout = options.timeout.unwrap_or(self.config.default_timeout);
        let payload = build_payload(method, &params, options.use_mock_data, options.use_proxy);
        let started = Instant::now();

        let outcome =
            tokio::time::timeout(timeout, self.invoker.invoke(SUPPLIER_FUNCTION, payload)).await;
        let elapsed = started.elapsed();
        let elapsed_ms = elapsed.as_millis() as u64;
        metrics::histogram!("supplier_call_duration_seconds", "method" => method.as_str())
            .record(elapsed.as_secs_f64());

        let data = match outcome {
            Err(_) => {
                let err = TaphoammoError::timeout(timeout.as_millis() as u64);
                return Err(self.record_failure(method, err));
            }
            Ok(Err(invoke_err)) => {
                let code = classify_transport_error(&invoke_err.message, invoke_err.http_status);
                let mut err =
                    TaphoammoError::new(code, invoke_err.message).with_response_time(elapsed_ms);
                if let Some(status) = invoke_err.http_status {
                    err = err.with_http_status(status);
                }
                return Err(self.record_failure(method, err));
            }
            Ok(Ok(data)) => data,
        };

        if let Err(err) = validate(method, Some(&data)) {
            return Err(self.record_failure(method, err.with_response_time(elapsed_ms)));
        }

        let ttl = options.cache_ttl.unwrap_or(self.config.default_cache_ttl);
        self.cache.set(key, data.clone(), ttl).await;

        let source = if options.use_mock_data {
            ResponseSource::Mock
        } else {
            ResponseSource::Api
        };
        let source_label = if options.use_mock_data { "mock" } else { "api" };
        metrics::counter!(
            "supplier_calls_total",
            "method" => method.as_str(),
            "source" => source_label
        )
        .increment(1);
        tracing::debug!(elapsed_ms, ?source, "supplier call succeeded");

        Ok(CallResult {
            data,
            source,
            timestamp: Utc::now(),
            response_time_ms: elapsed_ms,
        })
    }

    fn record_failure(&self, method: SupplierMethod, err: TaphoammoError) -> TaphoammoError {
        metrics::counter!(
            "supplier_call_errors_total",
            "method" => method.as_str(),
            "code" => err.code.as_str()
        )
        .increment(1);
        tracing::debug!(code = %err.code, error = %err.message, "supplier call failed");
        err
    }

    /// Drops the cache slot of one logical call.
    pub async fn invalidate(&self, method: SupplierMethod, params: &Map<String, Value>) -> bool {
        self.cache.remove(&Self::cache_key(method, params)).await
    }

    /// Drops every cached response.
    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }
}

/// Builds a params map from `(key, value)` pairs.
pub fn params<const N: usize>(pairs: [(&str, Value); N]) -> Map<String, Value> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::invoke::InvokeError;
    use crate::mock::ScriptedSupplier;
    use serde_json::json;

    fn stock_params() -> Map<String, Value> {
        params([("kioskToken", json!("K1"))])
    }

    fn executor(supplier: &ScriptedSupplier) -> CallExecutor<ScriptedSupplier> {
        CallExecutor::new(supplier.clone())
    }

    #[test]
    fn test_cache_key_ignores_debug_flags() {
        let plain = stock_params();
        let mut flagged = stock_params();
        flagged.insert("debugMock".to_string(), json!(true));
        flagged.insert("useMockData".to_string(), json!(true));
        flagged.insert("forceRefresh".to_string(), json!(true));

        assert_eq!(
            CallExecutor::<ScriptedSupplier>::cache_key(SupplierMethod::GetStock, &plain),
            CallExecutor::<ScriptedSupplier>::cache_key(SupplierMethod::GetStock, &flagged)
        );
        assert_ne!(
            CallExecutor::<ScriptedSupplier>::cache_key(SupplierMethod::GetStock, &plain),
            CallExecutor::<ScriptedSupplier>::cache_key(SupplierMethod::GetStockWithCache, &plain)
        );
    }

    #[tokio::test]
    async fn test_second_call_is_served_from_cache() {
        let supplier = ScriptedSupplier::new();
        supplier
            .set_default_ok(SupplierMethod::GetStock, json!({ "success": "true", "stock": 4 }))
            .await;
        let executor = executor(&supplier);

        let first = executor
            .execute(SupplierMethod::GetStock, stock_params(), CallOptions::new())
            .await
            .unwrap();
        assert_eq!(first.source, ResponseSource::Api);

        let second = executor
            .execute(SupplierMethod::GetStock, stock_params(), CallOptions::new())
            .await
            .unwrap();
        assert_eq!(second.source, ResponseSource::Cache);
        assert_eq!(second.response_time_ms, 0);
        assert_eq!(second.data["stock"], 4);
        assert_eq!(supplier.call_count(SupplierMethod::GetStock).await, 1);
    }

    #[tokio::test]
    async fn test_force_refresh_bypasses_cache() {
        let supplier = ScriptedSupplier::new();
        supplier.set_default_ok(SupplierMethod::GetStock, json!({ "stock": 4 })).await;
        let executor = executor(&supplier);

        executor
            .execute(SupplierMethod::GetStock, stock_params(), CallOptions::new())
            .await
            .unwrap();
        let refreshed = executor
            .execute(
                SupplierMethod::GetStock,
                stock_params(),
                CallOptions::new().force_refresh(true),
            )
            .await
            .unwrap();

        assert_eq!(refreshed.source, ResponseSource::Api);
        assert_eq!(supplier.call_count(SupplierMethod::GetStock).await, 2);
    }

    #[tokio::test]
    async fn test_mock_routing_is_tagged_and_flagged() {
        let supplier = ScriptedSupplier::new();
        supplier.set_default_ok(SupplierMethod::GetStock, json!({ "stock": 1 })).await;
        let executor = executor(&supplier);

        let result = executor
            .execute(
                SupplierMethod::GetStock,
                stock_params(),
                CallOptions::new().use_mock_data(true).use_proxy(true),
            )
            .await
            .unwrap();

        assert_eq!(result.source, ResponseSource::Mock);
        let payload = &supplier.calls().await[0];
        assert_eq!(payload["debugMock"], true);
        assert_eq!(payload["proxy"], true);
        assert_eq!(payload["action"], "getStock");
    }

    #[tokio::test]
    async fn test_timeout_is_classified() {
        let supplier = ScriptedSupplier::new();
        supplier.set_default_ok(SupplierMethod::GetStock, json!({ "stock": 1 })).await;
        supplier.set_latency(Duration::from_millis(200)).await;
        let executor = executor(&supplier);

        let err = executor
            .execute(
                SupplierMethod::GetStock,
                stock_params(),
                CallOptions::new().timeout(Duration::from_millis(20)),
            )
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::Timeout);
        assert_eq!(err.response_time_ms, Some(20));
        assert!(executor.cache().is_empty().await);
    }

    #[tokio::test]
    async fn test_transport_errors_are_classified() {
        let supplier = ScriptedSupplier::new();
        supplier
            .push_err(SupplierMethod::GetStock, InvokeError::new("Failed to fetch"))
            .await;
        supplier
            .push_err(
                SupplierMethod::GetStock,
                InvokeError::with_status("Service Unavailable", 503),
            )
            .await;
        supplier
            .push_err(SupplierMethod::GetStock, InvokeError::new("weird"))
            .await;
        let executor = executor(&supplier);

        let codes: Vec<ErrorCode> = {
            let mut codes = Vec::new();
            for _ in 0..3 {
                let err = executor
                    .execute(SupplierMethod::GetStock, stock_params(), CallOptions::new())
                    .await
                    .unwrap_err();
                codes.push(err.code);
            }
            codes
        };

        assert_eq!(
            codes,
            vec![
                ErrorCode::NetworkError,
                ErrorCode::ApiTempDown,
                ErrorCode::UnexpectedResponse
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_validation_is_not_cached() {
        let supplier = ScriptedSupplier::new();
        supplier
            .push_ok(
                SupplierMethod::GetStockWithCache,
                json!({ "success": "false", "message": "Kiosk expired" }),
            )
            .await;
        supplier
            .push_ok(
                SupplierMethod::GetStockWithCache,
                json!({ "success": "true", "name": "X", "stock": 2 }),
            )
            .await;
        let executor = executor(&supplier);

        let err = executor
            .execute(
                SupplierMethod::GetStockWithCache,
                stock_params(),
                CallOptions::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.message, "Kiosk expired");
        assert!(executor.cache().is_empty().await);

        let ok = executor
            .execute(
                SupplierMethod::GetStockWithCache,
                stock_params(),
                CallOptions::new(),
            )
            .await
            .unwrap();
        assert_eq!(ok.source, ResponseSource::Api);
        assert_eq!(executor.cache().len().await, 1);
    }

    #[tokio::test]
    async fn test_invalidate_drops_single_slot() {
        let supplier = ScriptedSupplier::new();
        supplier.set_default_ok(SupplierMethod::GetStock, json!({ "stock": 1 })).await;
        let executor = executor(&supplier);

        executor
            .execute(SupplierMethod::GetStock, stock_params(), CallOptions::new())
            .await
            .unwrap();
        assert!(executor.invalidate(SupplierMethod::GetStock, &stock_params()).await);
        assert!(executor.cache().is_empty().await);
    }
}
