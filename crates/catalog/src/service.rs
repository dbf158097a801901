//! Product service: stock and price lookups across every cache tier.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::KioskToken;
use serde_json::json;
use supplier::{
    CallExecutor, CallOptions, ErrorCode, RemoteInvoker, ResponseSource, SupplierMethod,
    TaphoammoError, params,
};

use crate::fallback::FallbackStore;
use crate::product::Product;
use crate::product_cache::ProductCache;

/// Tuning for [`ProductService`].
#[derive(Debug, Clone)]
pub struct ProductServiceConfig {
    /// Live attempts per lookup when the caller does not say otherwise.
    pub max_retries: u32,
    /// Backoff before retry `n` is `backoff_base * 2^n`.
    pub backoff_base: Duration,
    /// How long a parsed product stays valid in the per-product tier.
    pub product_ttl: Duration,
    pub call_timeout: Duration,
    pub use_proxy: bool,
}

impl Default for ProductServiceConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_base: Duration::from_millis(500),
            product_ttl: Duration::from_secs(60),
            call_timeout: Duration::from_secs(10),
            use_proxy: false,
        }
    }
}

/// Per-call options for [`ProductService::get_stock`].
#[derive(Debug, Clone, Default)]
pub struct GetStockOptions {
    pub force_refresh: bool,
    pub use_mock_data: bool,
    pub max_retries: Option<u32>,
}

impl GetStockOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }

    pub fn use_mock_data(mut self, mock: bool) -> Self {
        self.use_mock_data = mock;
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }
}

/// Answers "what is the stock and price of product X".
///
/// Tiers are consulted in order: the per-product memory cache, live supplier
/// calls with exponential backoff, then the persistent fallback store. Stale
/// persisted data is served only when no live attempt succeeded.
pub struct ProductService<I, F>
where
    I: RemoteInvoker,
    F: FallbackStore,
{
    executor: Arc<CallExecutor<I>>,
    store: Arc<F>,
    cache: ProductCache,
    config: ProductServiceConfig,
}

impl<I, F> ProductService<I, F>
where
    I: RemoteInvoker,
    F: FallbackStore + 'static,
{
    /// Creates a product service with default tuning.
    pub fn new(executor: Arc<CallExecutor<I>>, store: Arc<F>) -> Self {
        Self::with_config(executor, store, ProductServiceConfig::default())
    }

    pub fn with_config(
        executor: Arc<CallExecutor<I>>,
        store: Arc<F>,
        config: ProductServiceConfig,
    ) -> Self {
        Self {
            executor,
            store,
            cache: ProductCache::new(),
            config,
        }
    }

    pub fn config(&self) -> &ProductServiceConfig {
        &self.config
    }

    pub fn executor(&self) -> &Arc<CallExecutor<I>> {
        &self.executor
    }

    /// Returns the product tier entry for `kiosk_token` if it is still fresh.
    pub async fn cached_product(&self, kiosk_token: &KioskToken) -> Option<Product> {
        self.cache.get_fresh(kiosk_token, Utc::now()).await
    }

    /// Looks up stock and price for `kiosk_token`.
    ///
    /// Fails only when the live retry budget is exhausted and the fallback
    /// store has no row, or when the supplier reports a business condition
    /// (`STOCK_UNAVAILABLE`, `KIOSK_PENDING`) that stale data must not hide.
    #[tracing::instrument(skip(self, kiosk_token, options), fields(kiosk_token = %kiosk_token))]
    pub async fn get_stock(
        &self,
        kiosk_token: &KioskToken,
        options: GetStockOptions,
    ) -> Result<Product, TaphoammoError> {
        if !options.force_refresh
            && let Some(mut product) = self.cache.get_fresh(kiosk_token, Utc::now()).await
        {
            metrics::counter!("product_lookups_total", "tier" => "memory").increment(1);
            tracing::debug!("served from product cache");
            product.cached = true;
            return Ok(product);
        }

        let attempts = options
            .max_retries
            .unwrap_or(self.config.max_retries)
            .max(1);
        let mut last_error = TaphoammoError::unexpected("no live attempt was made");

        for attempt in 0..attempts {
            match self.fetch_live(kiosk_token, &options).await {
                Ok(product) => {
                    self.cache.put(product.clone()).await;
                    if !product.cached && !product.emergency {
                        self.spawn_write_back(&product);
                    }
                    metrics::counter!("product_lookups_total", "tier" => "live").increment(1);
                    return Ok(product);
                }
                Err(err) => {
                    let final_attempt =
                        attempt + 1 == attempts || Self::is_business_error(&err);
                    if final_attempt {
                        tracing::warn!(
                            attempt = attempt + 1,
                            attempts,
                            code = %err.code,
                            error = %err.message,
                            "stock lookup failed"
                        );
                    } else {
                        tracing::debug!(
                            attempt = attempt + 1,
                            attempts,
                            code = %err.code,
                            error = %err.message,
                            "stock lookup attempt failed, retrying"
                        );
                    }
                    last_error = err;
                    if final_attempt {
                        break;
                    }
                    tokio::time::sleep(self.backoff(attempt)).await;
                }
            }
        }

        if Self::is_business_error(&last_error) {
            metrics::counter!("product_lookups_total", "tier" => "failed").increment(1);
            return Err(last_error);
        }

        match self.load_emergency(kiosk_token, &last_error).await {
            Some(product) => {
                metrics::counter!("product_lookups_total", "tier" => "emergency").increment(1);
                Ok(product)
            }
            None => {
                metrics::counter!("product_lookups_total", "tier" => "failed").increment(1);
                Err(last_error)
            }
        }
    }

    /// Conditions reported by the supplier that neither a retry nor stale data
    /// can change. Every other failure is retried until the budget runs out.
    fn is_business_error(err: &TaphoammoError) -> bool {
        matches!(
            err.code,
            ErrorCode::StockUnavailable | ErrorCode::KioskPending
        )
    }

    /// Exponential backoff before the retry following `attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.config
            .backoff_base
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    async fn fetch_live(
        &self,
        kiosk_token: &KioskToken,
        options: &GetStockOptions,
    ) -> Result<Product, TaphoammoError> {
        let call_params = params([
            ("kioskToken", json!(kiosk_token.as_str())),
            ("forceRefresh", json!(options.force_refresh)),
            ("includePrice", json!(true)),
        ]);
        let call_options = CallOptions::new()
            .timeout(self.config.call_timeout)
            .force_refresh(options.force_refresh)
            .use_mock_data(options.use_mock_data)
            .use_proxy(self.config.use_proxy);

        let result = self
            .executor
            .execute(SupplierMethod::GetStockWithCache, call_params, call_options)
            .await?;

        Ok(Product::from_response(
            kiosk_token.clone(),
            &result.data,
            result.source == ResponseSource::Cache,
            self.config.product_ttl,
        ))
    }

    fn spawn_write_back(&self, product: &Product) {
        let store = Arc::clone(&self.store);
        let record = product.to_record();
        tokio::spawn(async move {
            let kiosk_token = record.kiosk_token.clone();
            if let Err(e) = store.save(record).await {
                tracing::warn!(%kiosk_token, error = %e, "failed to persist product snapshot");
            }
        });
    }

    async fn load_emergency(
        &self,
        kiosk_token: &KioskToken,
        cause: &TaphoammoError,
    ) -> Option<Product> {
        if let Err(e) = self
            .store
            .mark_sync_failure(kiosk_token, &cause.to_string())
            .await
        {
            tracing::debug!(error = %e, "failed to record sync failure");
        }

        match self.store.load(kiosk_token).await {
            Ok(Some(record)) => {
                tracing::warn!(
                    last_checked_at = %record.last_checked_at,
                    "serving emergency product data from fallback store"
                );
                Some(Product::from_record(record, self.config.product_ttl))
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "fallback store read failed");
                None
            }
        }
    }

    /// Clears the per-product tier and the executor's memory tier.
    ///
    /// The persistent store is left untouched.
    pub async fn clear_cache(&self) {
        self.cache.clear().await;
        self.executor.clear_cache().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback::InMemoryFallbackStore;
    use supplier::{InvokeError, ScriptedSupplier};

    fn service(
        supplier: &ScriptedSupplier,
        store: &InMemoryFallbackStore,
    ) -> ProductService<ScriptedSupplier, InMemoryFallbackStore> {
        let executor = Arc::new(CallExecutor::new(supplier.clone()));
        ProductService::with_config(
            executor,
            Arc::new(store.clone()),
            ProductServiceConfig {
                backoff_base: Duration::from_millis(1),
                ..ProductServiceConfig::default()
            },
        )
    }

    fn stock_body(stock: u64) -> serde_json::Value {
        json!({ "success": "true", "name": "Widget", "stock": stock, "price": 10 })
    }

    #[test]
    fn test_backoff_doubles() {
        let supplier = ScriptedSupplier::new();
        let store = InMemoryFallbackStore::new();
        let service = ProductService::new(
            Arc::new(CallExecutor::new(supplier)),
            Arc::new(store),
        );
        assert_eq!(service.backoff(0), Duration::from_millis(500));
        assert_eq!(service.backoff(1), Duration::from_millis(1000));
        assert_eq!(service.backoff(2), Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn test_live_result_is_cached_per_product() {
        let supplier = ScriptedSupplier::new();
        supplier.push_ok(SupplierMethod::GetStockWithCache, stock_body(5)).await;
        let store = InMemoryFallbackStore::new();
        let service = service(&supplier, &store);
        let token = KioskToken::new("K1");

        let first = service.get_stock(&token, GetStockOptions::new()).await.unwrap();
        assert_eq!(first.stock_quantity, 5);
        assert!(!first.cached);

        let second = service.get_stock(&token, GetStockOptions::new()).await.unwrap();
        assert!(second.cached);
        assert_eq!(second.stock_quantity, 5);
        assert_eq!(supplier.call_count(SupplierMethod::GetStockWithCache).await, 1);
    }

    #[tokio::test]
    async fn test_business_errors_are_not_masked_by_fallback() {
        let supplier = ScriptedSupplier::new();
        supplier
            .set_default_ok(
                SupplierMethod::GetStockWithCache,
                json!({ "success": false, "message": "Out of stock" }),
            )
            .await;
        let store = InMemoryFallbackStore::new();
        let ttl = Duration::from_secs(60);
        let product = Product::from_response(KioskToken::new("K1"), &stock_body(3), false, ttl);
        store.save(product.to_record()).await.unwrap();
        let service = service(&supplier, &store);

        let err = service
            .get_stock(&KioskToken::new("K1"), GetStockOptions::new().max_retries(3))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::StockUnavailable);
        assert_eq!(supplier.call_count(SupplierMethod::GetStockWithCache).await, 1);
    }

    #[tokio::test]
    async fn test_zero_retries_still_makes_one_attempt() {
        let supplier = ScriptedSupplier::new();
        supplier
            .push_err(SupplierMethod::GetStockWithCache, InvokeError::new("Failed to fetch"))
            .await;
        let store = InMemoryFallbackStore::new();
        let service = service(&supplier, &store);

        let err = service
            .get_stock(&KioskToken::new("K1"), GetStockOptions::new().max_retries(0))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NetworkError);
        assert_eq!(supplier.call_count(SupplierMethod::GetStockWithCache).await, 1);
    }

    #[tokio::test]
    async fn test_clear_cache_forces_live_call() {
        let supplier = ScriptedSupplier::new();
        supplier.set_default_ok(SupplierMethod::GetStockWithCache, stock_body(1)).await;
        let store = InMemoryFallbackStore::new();
        let service = service(&supplier, &store);
        let token = KioskToken::new("K1");

        service.get_stock(&token, GetStockOptions::new()).await.unwrap();
        service.clear_cache().await;
        assert!(service.cached_product(&token).await.is_none());

        let product = service.get_stock(&token, GetStockOptions::new()).await.unwrap();
        assert!(!product.cached);
        assert_eq!(supplier.call_count(SupplierMethod::GetStockWithCache).await, 2);
    }
}
