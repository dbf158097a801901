//! Product catalog layer over the supplier call executor.
//!
//! This crate provides:
//! - `Product` and defensive coercion of stock and price
//! - the per-product cache tier
//! - the persistent fallback store (in-memory and PostgreSQL)
//! - `ProductService` with retry, backoff and emergency fallback

pub mod error;
pub mod fallback;
pub mod parse;
pub mod product;
pub mod product_cache;
pub mod service;

pub use error::StoreError;
pub use fallback::{
    FallbackStore, InMemoryFallbackStore, PostgresFallbackStore, ProductRecord, SyncStatus,
};
pub use parse::{parse_price, parse_stock_quantity};
pub use product::Product;
pub use product_cache::ProductCache;
pub use service::{GetStockOptions, ProductService, ProductServiceConfig};
