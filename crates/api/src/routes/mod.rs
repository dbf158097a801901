//! HTTP handlers over the supplier integration facade.

pub mod admin;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod stock;

use std::sync::Arc;

use crate::integration::SupplierIntegration;

/// Shared application state accessible from all handlers.
pub type AppState<I, F> = Arc<SupplierIntegration<I, F>>;
