//! Persistent fallback store: one row per product, read only as a last resort.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::KioskToken;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

pub use memory::InMemoryFallbackStore;
pub use postgres::PostgresFallbackStore;

/// Outcome of the most recent synchronization of a product row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    #[default]
    Success,
    Failed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Success => "success",
            SyncStatus::Failed => "failed",
        }
    }

    /// Parses the stored column value. Unknown values read as `Failed`.
    pub fn parse(s: &str) -> Self {
        match s {
            "success" => SyncStatus::Success,
            _ => SyncStatus::Failed,
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The persisted row for one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub kiosk_token: KioskToken,
    pub name: String,
    pub stock_quantity: u64,
    pub price: f64,
    pub last_checked_at: DateTime<Utc>,
    pub cached_until: DateTime<Utc>,
    pub last_sync_status: SyncStatus,
    pub sync_message: Option<String>,
}

/// Storage for the last known good state of each product.
///
/// Rows are written best-effort after fresh supplier reads and consulted only
/// when every live attempt has failed. All implementations must be
/// thread-safe (Send + Sync).
#[async_trait]
pub trait FallbackStore: Send + Sync {
    /// Loads the row for `kiosk_token`, or `None` if it was never written.
    async fn load(&self, kiosk_token: &KioskToken) -> Result<Option<ProductRecord>, StoreError>;

    /// Inserts or replaces the row keyed by `record.kiosk_token`.
    async fn save(&self, record: ProductRecord) -> Result<(), StoreError>;

    /// Records a failed synchronization without touching stock or price.
    ///
    /// Does nothing if no row exists for `kiosk_token`.
    async fn mark_sync_failure(
        &self,
        kiosk_token: &KioskToken,
        message: &str,
    ) -> Result<(), StoreError>;
}

#[async_trait]
impl<T: FallbackStore + ?Sized> FallbackStore for std::sync::Arc<T> {
    async fn load(&self, kiosk_token: &KioskToken) -> Result<Option<ProductRecord>, StoreError> {
        (**self).load(kiosk_token).await
    }

    async fn save(&self, record: ProductRecord) -> Result<(), StoreError> {
        (**self).save(record).await
    }

    async fn mark_sync_failure(
        &self,
        kiosk_token: &KioskToken,
        message: &str,
    ) -> Result<(), StoreError> {
        (**self).mark_sync_failure(kiosk_token, message).await
    }
}
