//! Identifier types shared by every crate of the supplier integration.

pub mod types;

pub use types::{KioskToken, OrderId, UserToken};
