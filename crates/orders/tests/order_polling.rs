//! Integration tests for order placement and polling.

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{KioskToken, OrderId, UserToken};
use orders::{OrderService, OrderStatus, PollOptions};
use serde_json::json;
use supplier::{CallExecutor, InvokeError, ScriptedSupplier, SupplierMethod};

struct TestHarness {
    service: OrderService<ScriptedSupplier>,
    supplier: ScriptedSupplier,
}

impl TestHarness {
    fn new() -> Self {
        let supplier = ScriptedSupplier::new();
        let service = OrderService::new(Arc::new(CallExecutor::new(supplier.clone())));
        Self { service, supplier }
    }

    async fn push_processing(&self) {
        self.supplier
            .push_ok(
                SupplierMethod::GetProducts,
                json!({ "success": "false", "description": "Order in processing" }),
            )
            .await;
    }

    async fn push_keys(&self, keys: &[&str]) {
        let data: Vec<_> = keys
            .iter()
            .enumerate()
            .map(|(i, k)| json!({ "id": i + 1, "product": k }))
            .collect();
        self.supplier
            .push_ok(
                SupplierMethod::GetProducts,
                json!({ "success": "true", "data": data }),
            )
            .await;
    }
}

fn user() -> UserToken {
    UserToken::new("user-token")
}

#[tokio::test]
async fn test_poll_completes_after_two_waits() {
    let h = TestHarness::new();
    h.push_processing().await;
    h.push_processing().await;
    h.push_keys(&["KEY-1", "KEY-2"]).await;

    let started = Instant::now();
    let outcome = h
        .service
        .check_order_until_complete(
            &OrderId::new("O1"),
            &user(),
            PollOptions::new(3, Duration::from_millis(10)),
        )
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.product_keys, vec!["KEY-1", "KEY-2"]);
    assert_eq!(outcome.attempts, 3);
    assert_eq!(outcome.order.status, OrderStatus::Completed);
    assert_eq!(h.supplier.call_count(SupplierMethod::GetProducts).await, 3);
    // Two waits of 10ms, and no wait after the final attempt.
    assert!(started.elapsed() >= Duration::from_millis(20));
}

#[tokio::test]
async fn test_poll_gives_up_after_max_retries() {
    let h = TestHarness::new();
    h.supplier
        .set_default_ok(
            SupplierMethod::GetProducts,
            json!({ "success": "false", "description": "Order in processing" }),
        )
        .await;

    let outcome = h
        .service
        .check_order_until_complete(
            &OrderId::new("O1"),
            &user(),
            PollOptions::new(3, Duration::from_millis(10)),
        )
        .await;

    assert!(!outcome.success);
    assert!(outcome.product_keys.is_empty());
    assert_eq!(outcome.attempts, 3);
    assert_eq!(h.supplier.call_count(SupplierMethod::GetProducts).await, 3);
    assert!(outcome.message.unwrap().contains("try again later"));
    assert_eq!(outcome.order.status, OrderStatus::Failed);
}

#[tokio::test]
async fn test_poll_treats_empty_success_as_processing() {
    let h = TestHarness::new();
    h.supplier
        .push_ok(
            SupplierMethod::GetProducts,
            json!({ "success": "true", "data": [] }),
        )
        .await;
    h.push_keys(&["KEY-1"]).await;

    let outcome = h
        .service
        .check_order_until_complete(
            &OrderId::new("O1"),
            &user(),
            PollOptions::new(3, Duration::from_millis(1)),
        )
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.attempts, 2);
}

#[tokio::test]
async fn test_poll_stops_on_hard_error() {
    let h = TestHarness::new();
    h.push_processing().await;
    h.supplier
        .push_ok(
            SupplierMethod::GetProducts,
            json!({ "success": "false", "message": "Order not found" }),
        )
        .await;

    let outcome = h
        .service
        .check_order_until_complete(
            &OrderId::new("O1"),
            &user(),
            PollOptions::new(5, Duration::from_millis(1)),
        )
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.attempts, 2);
    assert_eq!(outcome.message.as_deref(), Some("Order not found"));
    assert_eq!(outcome.order.message.as_deref(), Some("Order not found"));
    assert_eq!(outcome.order.status, OrderStatus::Failed);
    assert_eq!(h.supplier.call_count(SupplierMethod::GetProducts).await, 2);
}

#[tokio::test]
async fn test_poll_stops_on_transport_error() {
    let h = TestHarness::new();
    h.supplier
        .push_err(
            SupplierMethod::GetProducts,
            InvokeError::new("connection reset by peer"),
        )
        .await;

    let outcome = h
        .service
        .check_order_until_complete(
            &OrderId::new("O1"),
            &user(),
            PollOptions::new(5, Duration::from_millis(1)),
        )
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.attempts, 1);
}

#[tokio::test]
async fn test_buy_then_poll() {
    let h = TestHarness::new();
    h.supplier
        .push_ok(
            SupplierMethod::BuyProducts,
            json!({ "success": "true", "order_id": "ORD-7" }),
        )
        .await;
    h.push_processing().await;
    h.push_keys(&["KEY-9"]).await;

    let order = h
        .service
        .buy_products(&KioskToken::new("K1"), 1, &user(), None)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Pending);

    let outcome = h
        .service
        .check_order_until_complete(
            &order.order_id,
            &user(),
            PollOptions::new(3, Duration::from_millis(1)),
        )
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.order.order_id, order.order_id);
    assert_eq!(outcome.product_keys, vec!["KEY-9"]);

    let poll_payload = &h.supplier.calls().await[1];
    assert_eq!(poll_payload["orderId"], "ORD-7");
}

#[tokio::test]
async fn test_zero_retries_still_polls_once() {
    let h = TestHarness::new();
    h.push_keys(&["KEY-1"]).await;

    let outcome = h
        .service
        .check_order_until_complete(
            &OrderId::new("O1"),
            &user(),
            PollOptions::new(0, Duration::from_millis(1)),
        )
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.attempts, 1);
}
