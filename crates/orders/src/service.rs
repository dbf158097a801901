//! Order service: purchases, key retrieval and bounded order polling.

use std::sync::Arc;
use std::time::Duration;

use catalog::parse_stock_quantity;
use common::{KioskToken, OrderId, UserToken};
use serde::Serialize;
use serde_json::{Value, json};
use supplier::{
    CallExecutor, CallOptions, ErrorCode, RemoteInvoker, SupplierMethod, TaphoammoError, params,
};

use crate::error::OrderError;
use crate::order::{Order, ProductsResponse, scalar_text};

const STILL_PROCESSING_MESSAGE: &str =
    "Order is still being processed by the supplier, please try again later";

/// Tuning for [`OrderService`].
#[derive(Debug, Clone)]
pub struct OrderServiceConfig {
    pub call_timeout: Duration,
    pub use_proxy: bool,
    pub poll: PollOptions,
}

impl Default for OrderServiceConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(10),
            use_proxy: false,
            poll: PollOptions::default(),
        }
    }
}

/// Bounds of one [`OrderService::check_order_until_complete`] run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Number of `getProducts` attempts; at least one is always made.
    pub max_retries: u32,
    /// Wait between attempts.
    pub delay: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            max_retries: 5,
            delay: Duration::from_millis(2000),
        }
    }
}

impl PollOptions {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }
}

/// Result of polling an order to completion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollOutcome {
    pub success: bool,
    pub product_keys: Vec<String>,
    pub message: Option<String>,
    /// `getProducts` calls made.
    pub attempts: u32,
    pub order: Order,
}

/// Whether a product can cover a requested quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StockAvailability {
    pub available: bool,
    pub stock: u64,
}

/// Places supplier orders and retrieves their keys.
///
/// Purchases are never retried; only key retrieval is polled.
pub struct OrderService<I: RemoteInvoker> {
    executor: Arc<CallExecutor<I>>,
    config: OrderServiceConfig,
}

impl<I: RemoteInvoker> OrderService<I> {
    pub fn new(executor: Arc<CallExecutor<I>>) -> Self {
        Self::with_config(executor, OrderServiceConfig::default())
    }

    pub fn with_config(executor: Arc<CallExecutor<I>>, config: OrderServiceConfig) -> Self {
        Self { executor, config }
    }

    pub fn config(&self) -> &OrderServiceConfig {
        &self.config
    }

    /// Order calls are never answered from, or stored in, the memory tier.
    fn uncached_options(&self) -> CallOptions {
        CallOptions::new()
            .timeout(self.config.call_timeout)
            .force_refresh(true)
            .cache_ttl(Duration::ZERO)
            .use_proxy(self.config.use_proxy)
    }

    /// Buys `quantity` units of `kiosk_token`.
    ///
    /// Exactly one supplier call is made. Any failure is returned as-is.
    #[tracing::instrument(
        skip(self, kiosk_token, user_token, promotion),
        fields(kiosk_token = %kiosk_token)
    )]
    pub async fn buy_products(
        &self,
        kiosk_token: &KioskToken,
        quantity: u32,
        user_token: &UserToken,
        promotion: Option<&str>,
    ) -> Result<Order, TaphoammoError> {
        let mut call_params = params([
            ("kioskToken", json!(kiosk_token.as_str())),
            ("userToken", json!(user_token.as_str())),
            ("quantity", json!(quantity)),
        ]);
        if let Some(code) = promotion.map(str::trim).filter(|p| !p.is_empty()) {
            call_params.insert("promotion".to_string(), json!(code));
        }

        let result = self
            .executor
            .execute(SupplierMethod::BuyProducts, call_params, self.uncached_options())
            .await?;

        let order_id = result
            .data
            .get("order_id")
            .or_else(|| result.data.get("orderId"))
            .and_then(scalar_text)
            .ok_or_else(|| TaphoammoError::unexpected("Response missing order_id"))?;
        let keys = product_keys_of(&result.data);

        metrics::counter!("orders_placed_total").increment(1);
        tracing::info!(%order_id, immediate_keys = keys.len(), "order placed");

        Ok(Order::pending(OrderId::new(order_id)).with_product_keys(keys))
    }

    /// Fetches the keys delivered for `order_id`.
    ///
    /// Returns `ORDER_PROCESSING` while the supplier is still fulfilling the
    /// order.
    #[tracing::instrument(skip(self, order_id, user_token), fields(order_id = %order_id))]
    pub async fn get_products(
        &self,
        order_id: &OrderId,
        user_token: &UserToken,
    ) -> Result<ProductsResponse, TaphoammoError> {
        let call_params = params([
            ("orderId", json!(order_id.as_str())),
            ("userToken", json!(user_token.as_str())),
        ]);

        let result = self
            .executor
            .execute(SupplierMethod::GetProducts, call_params, self.uncached_options())
            .await?;

        Ok(ProductsResponse::from_body(&result.data))
    }

    /// Polls `get_products` until keys arrive, a hard error occurs, or the
    /// attempt budget runs out.
    ///
    /// Never returns an error: every outcome is reported in [`PollOutcome`].
    #[tracing::instrument(skip(self, order_id, user_token, options), fields(order_id = %order_id))]
    pub async fn check_order_until_complete(
        &self,
        order_id: &OrderId,
        user_token: &UserToken,
        options: PollOptions,
    ) -> PollOutcome {
        let attempts = options.max_retries.max(1);
        let mut order = Order::pending(order_id.clone());
        let started = std::time::Instant::now();

        for attempt in 1..=attempts {
            // Pending and Processing both accept Processing.
            log_rejected(order.mark_processing());

            match self.get_products(order_id, user_token).await {
                Ok(response) if !response.is_empty() => {
                    let keys = response.product_keys();
                    log_rejected(order.complete(keys.clone()));
                    record_poll("completed", attempt, started);
                    tracing::info!(attempt, keys = keys.len(), "order completed");
                    return PollOutcome {
                        success: true,
                        product_keys: keys,
                        message: None,
                        attempts: attempt,
                        order,
                    };
                }
                Ok(_) => {
                    tracing::debug!(attempt, "order succeeded without keys, still processing");
                }
                Err(err) if err.code == ErrorCode::OrderProcessing => {
                    tracing::debug!(attempt, "order still processing");
                }
                Err(err) => {
                    log_rejected(order.fail(err.message.clone()));
                    record_poll("failed", attempt, started);
                    tracing::warn!(
                        attempt,
                        code = %err.code,
                        error = %err.message,
                        "order polling failed"
                    );
                    return PollOutcome {
                        success: false,
                        product_keys: Vec::new(),
                        message: Some(err.message),
                        attempts: attempt,
                        order,
                    };
                }
            }

            if attempt < attempts {
                tokio::time::sleep(options.delay).await;
            }
        }

        log_rejected(order.fail(STILL_PROCESSING_MESSAGE));
        record_poll("exhausted", attempts, started);
        tracing::warn!(attempts, "order still processing after every poll");
        PollOutcome {
            success: false,
            product_keys: Vec::new(),
            message: Some(STILL_PROCESSING_MESSAGE.to_string()),
            attempts,
            order,
        }
    }

    /// Reports whether `quantity` units of `kiosk_token` can be bought now.
    ///
    /// A `STOCK_UNAVAILABLE` answer is reported as unavailable with zero
    /// stock; every other failure is returned.
    #[tracing::instrument(skip(self, kiosk_token), fields(kiosk_token = %kiosk_token))]
    pub async fn check_stock_availability(
        &self,
        kiosk_token: &KioskToken,
        quantity: u64,
    ) -> Result<StockAvailability, TaphoammoError> {
        let call_params = params([("kioskToken", json!(kiosk_token.as_str()))]);
        let options = CallOptions::new()
            .timeout(self.config.call_timeout)
            .use_proxy(self.config.use_proxy);

        match self
            .executor
            .execute(SupplierMethod::GetStock, call_params, options)
            .await
        {
            Ok(result) => {
                let stock = parse_stock_quantity(&result.data);
                Ok(StockAvailability {
                    available: stock >= quantity.max(1),
                    stock,
                })
            }
            Err(err) if err.code == ErrorCode::StockUnavailable => {
                tracing::debug!(error = %err.message, "supplier reports stock unavailable");
                Ok(StockAvailability {
                    available: false,
                    stock: 0,
                })
            }
            Err(err) => Err(err),
        }
    }
}

/// Logs a state transition the poll loop expected to be legal.
fn log_rejected(transition: Result<(), OrderError>) {
    if let Err(err) = transition {
        tracing::error!(error = %err, "order transition rejected");
    }
}

fn record_poll(outcome: &'static str, attempts: u32, started: std::time::Instant) {
    metrics::counter!("order_polls_total", "outcome" => outcome).increment(1);
    metrics::histogram!("order_poll_attempts").record(f64::from(attempts));
    metrics::histogram!("order_poll_duration_seconds").record(started.elapsed().as_secs_f64());
}

/// Reads optional `product_keys` returned by a buy call.
fn product_keys_of(body: &Value) -> Vec<String> {
    body.get("product_keys")
        .and_then(Value::as_array)
        .map(|keys| {
            keys.iter()
                .filter_map(|k| match k {
                    Value::Object(map) => map.get("product").and_then(scalar_text),
                    other => scalar_text(other),
                })
                .collect()
        })
        .unwrap_or_default()
}
