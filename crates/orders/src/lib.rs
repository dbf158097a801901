//! Supplier orders: purchase, delivered-key retrieval and bounded polling.
//!
//! An order is created `Pending` by a successful buy call and moves to
//! `Completed` or `Failed` only through polling, never back.

pub mod error;
pub mod order;
pub mod service;
pub mod state;

pub use error::OrderError;
pub use order::{DeliveredKey, Order, ProductsResponse};
pub use service::{OrderService, OrderServiceConfig, PollOptions, PollOutcome, StockAvailability};
pub use state::OrderStatus;
