//! Order error types.

use common::OrderId;
use thiserror::Error;

use crate::state::OrderStatus;

/// Errors raised by the order state machine.
///
/// Supplier failures are not wrapped here; the order service returns them
/// as `TaphoammoError` unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrderError {
    #[error("Order {order_id} cannot move from {from} to {to}")]
    InvalidTransition {
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    },
}

/// Convenience type alias for order results.
pub type Result<T> = std::result::Result<T, OrderError>;
