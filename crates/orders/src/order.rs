//! Order model and delivered-key parsing.

use common::OrderId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{OrderError, Result};
use crate::state::OrderStatus;

/// A purchase accepted by the supplier.
///
/// Keys returned by the buy call itself are kept in `product_keys` while the
/// order is still `Pending`; polling replaces them with the delivered set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub product_keys: Vec<String>,
    pub message: Option<String>,
}

impl Order {
    /// Creates a pending order.
    pub fn pending(order_id: OrderId) -> Self {
        Self {
            order_id,
            status: OrderStatus::Pending,
            product_keys: Vec::new(),
            message: None,
        }
    }

    pub fn with_product_keys(mut self, keys: Vec<String>) -> Self {
        self.product_keys = keys;
        self
    }

    pub fn mark_processing(&mut self) -> Result<()> {
        self.transition(OrderStatus::Processing)
    }

    /// Attaches the delivered keys and completes the order.
    pub fn complete(&mut self, keys: Vec<String>) -> Result<()> {
        self.transition(OrderStatus::Completed)?;
        self.product_keys = keys;
        self.message = None;
        Ok(())
    }

    /// Fails the order with a caller-facing message.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<()> {
        self.transition(OrderStatus::Failed)?;
        self.message = Some(message.into());
        Ok(())
    }

    fn transition(&mut self, next: OrderStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(OrderError::InvalidTransition {
                order_id: self.order_id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

/// One delivered key from `getProducts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveredKey {
    pub id: String,
    pub product: String,
}

/// Parsed `getProducts` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductsResponse {
    pub success: bool,
    pub keys: Vec<DeliveredKey>,
}

impl ProductsResponse {
    /// Reads the `data` array of a validated body.
    ///
    /// Entries that are bare strings are taken as the key itself; entries
    /// without a usable `product` are skipped.
    pub fn from_body(body: &Value) -> Self {
        let keys = body
            .get("data")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .enumerate()
                    .filter_map(|(index, item)| delivered_key(index, item))
                    .collect()
            })
            .unwrap_or_default();

        Self { success: true, keys }
    }

    /// The key strings, in delivery order.
    pub fn product_keys(&self) -> Vec<String> {
        self.keys.iter().map(|k| k.product.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

fn delivered_key(index: usize, item: &Value) -> Option<DeliveredKey> {
    match item {
        Value::String(product) => Some(DeliveredKey {
            id: index.to_string(),
            product: product.clone(),
        }),
        Value::Object(map) => {
            let product = map.get("product").and_then(scalar_text)?;
            let id = map
                .get("id")
                .and_then(scalar_text)
                .unwrap_or_else(|| index.to_string());
            Some(DeliveredKey { id, product })
        }
        _ => None,
    }
}

/// Renders a string or number as text.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
