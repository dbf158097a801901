//! Supplier integration facade composed from the product and order services.

use std::sync::Arc;
use std::time::{Duration, Instant};

use catalog::{FallbackStore, GetStockOptions, Product, ProductService, ProductServiceConfig};
use common::{KioskToken, OrderId, UserToken};
use orders::{
    Order, OrderService, OrderServiceConfig, PollOptions, PollOutcome, ProductsResponse,
    StockAvailability,
};
use serde::Serialize;
use serde_json::json;
use supplier::{
    CallExecutor, CallOptions, ExecutorConfig, RemoteInvoker, SupplierMethod, TaphoammoError,
    params,
};

/// Values fixed for every call made through the facade.
#[derive(Debug, Clone, Default)]
pub struct IntegrationDefaults {
    /// Caller credential used for purchases and key retrieval.
    pub user_token: UserToken,
    pub use_proxy: bool,
}

/// Full tuning of a [`SupplierIntegration`].
#[derive(Debug, Clone, Default)]
pub struct IntegrationConfig {
    pub defaults: IntegrationDefaults,
    pub executor: ExecutorConfig,
    pub products: ProductServiceConfig,
    pub orders: OrderServiceConfig,
}

/// Outcome of a connectivity check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionStatus {
    pub ok: bool,
    pub response_time_ms: u64,
    pub message: String,
}

/// Per-token result of [`SupplierIntegration::import_products`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportResult {
    pub kiosk_token: KioskToken,
    pub success: bool,
    pub product: Option<Product>,
    pub error: Option<TaphoammoError>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportReport {
    pub results: Vec<ImportResult>,
}

impl ImportReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }
}

/// Entry point for everything the application asks of the supplier.
///
/// Constructed once by the composition root and shared behind an `Arc`.
/// All services share one call executor, so they share its memory tier.
pub struct SupplierIntegration<I, F>
where
    I: RemoteInvoker,
    F: FallbackStore,
{
    executor: Arc<CallExecutor<I>>,
    products: ProductService<I, F>,
    orders: OrderService<I>,
    defaults: IntegrationDefaults,
    call_timeout: Duration,
}

impl<I, F> SupplierIntegration<I, F>
where
    I: RemoteInvoker,
    F: FallbackStore + 'static,
{
    pub fn new(invoker: I, store: F, defaults: IntegrationDefaults) -> Self {
        Self::with_config(
            invoker,
            store,
            IntegrationConfig {
                defaults,
                ..IntegrationConfig::default()
            },
        )
    }

    /// Builds the facade; `defaults.use_proxy` overrides the service configs.
    pub fn with_config(invoker: I, store: F, config: IntegrationConfig) -> Self {
        let IntegrationConfig {
            defaults,
            executor,
            mut products,
            mut orders,
        } = config;
        products.use_proxy = defaults.use_proxy;
        orders.use_proxy = defaults.use_proxy;
        let call_timeout = executor.default_timeout;

        let executor = Arc::new(CallExecutor::with_config(invoker, executor));
        Self {
            products: ProductService::with_config(Arc::clone(&executor), Arc::new(store), products),
            orders: OrderService::with_config(Arc::clone(&executor), orders),
            executor,
            defaults,
            call_timeout,
        }
    }

    pub fn defaults(&self) -> &IntegrationDefaults {
        &self.defaults
    }

    pub fn products(&self) -> &ProductService<I, F> {
        &self.products
    }

    pub fn orders(&self) -> &OrderService<I> {
        &self.orders
    }

    pub async fn get_stock(
        &self,
        kiosk_token: &KioskToken,
        options: GetStockOptions,
    ) -> Result<Product, TaphoammoError> {
        self.products.get_stock(kiosk_token, options).await
    }

    /// Buys with the default user token.
    pub async fn buy_products(
        &self,
        kiosk_token: &KioskToken,
        quantity: u32,
        promotion: Option<&str>,
    ) -> Result<Order, TaphoammoError> {
        self.orders
            .buy_products(kiosk_token, quantity, &self.defaults.user_token, promotion)
            .await
    }

    pub async fn get_products(
        &self,
        order_id: &OrderId,
    ) -> Result<ProductsResponse, TaphoammoError> {
        self.orders
            .get_products(order_id, &self.defaults.user_token)
            .await
    }

    pub async fn check_stock_availability(
        &self,
        kiosk_token: &KioskToken,
        quantity: u64,
    ) -> Result<StockAvailability, TaphoammoError> {
        self.orders
            .check_stock_availability(kiosk_token, quantity)
            .await
    }

    pub async fn check_order_until_complete(
        &self,
        order_id: &OrderId,
        options: PollOptions,
    ) -> PollOutcome {
        self.orders
            .check_order_until_complete(order_id, &self.defaults.user_token, options)
            .await
    }

    /// Checks the supplier with a `test_connection` call. Never fails.
    #[tracing::instrument(skip(self, kiosk_token), fields(kiosk_token = %kiosk_token))]
    pub async fn test_connection(&self, kiosk_token: &KioskToken) -> ConnectionStatus {
        let started = Instant::now();
        let options = CallOptions::new()
            .timeout(self.call_timeout)
            .force_refresh(true)
            .cache_ttl(Duration::ZERO)
            .use_proxy(self.defaults.use_proxy);

        match self
            .executor
            .execute(
                SupplierMethod::TestConnection,
                params([("kioskToken", json!(kiosk_token.as_str()))]),
                options,
            )
            .await
        {
            Ok(result) => ConnectionStatus {
                ok: true,
                response_time_ms: result.response_time_ms,
                message: result
                    .data
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("Connection successful")
                    .to_string(),
            },
            Err(err) => {
                tracing::warn!(code = %err.code, error = %err.message, "connection test failed");
                ConnectionStatus {
                    ok: false,
                    response_time_ms: err
                        .response_time_ms
                        .unwrap_or_else(|| started.elapsed().as_millis() as u64),
                    message: err.to_string(),
                }
            }
        }
    }

    /// Refreshes every token in turn, recording each outcome.
    ///
    /// A failure never aborts the batch.
    #[tracing::instrument(skip(self, kiosk_tokens), fields(count = kiosk_tokens.len()))]
    pub async fn import_products(&self, kiosk_tokens: &[KioskToken]) -> ImportReport {
        let mut results = Vec::with_capacity(kiosk_tokens.len());

        for kiosk_token in kiosk_tokens {
            let outcome = self
                .products
                .get_stock(kiosk_token, GetStockOptions::new().force_refresh(true))
                .await;
            results.push(match outcome {
                Ok(product) => ImportResult {
                    kiosk_token: kiosk_token.clone(),
                    success: true,
                    product: Some(product),
                    error: None,
                },
                Err(err) => ImportResult {
                    kiosk_token: kiosk_token.clone(),
                    success: false,
                    product: None,
                    error: Some(err),
                },
            });
        }

        let report = ImportReport { results };
        metrics::counter!("product_imports_total", "outcome" => "success")
            .increment(report.succeeded() as u64);
        metrics::counter!("product_imports_total", "outcome" => "failure")
            .increment(report.failed() as u64);
        tracing::info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "product import finished"
        );
        report
    }

    /// Clears every memory tier. The persistent store is untouched.
    pub async fn clear_cache(&self) {
        self.products.clear_cache().await;
        tracing::info!("supplier caches cleared");
    }
}
