use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::KioskToken;
use tokio::sync::RwLock;

use super::{FallbackStore, ProductRecord, SyncStatus};
use crate::error::StoreError;

#[derive(Debug, Default)]
struct InMemoryFallbackState {
    rows: HashMap<KioskToken, ProductRecord>,
    fail_on_save: bool,
    fail_on_load: bool,
}

/// In-memory fallback store for tests and database-less deployments.
///
/// Provides the same interface as the PostgreSQL implementation.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFallbackStore {
    state: Arc<RwLock<InMemoryFallbackState>>,
}

impl InMemoryFallbackStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent save fail.
    pub async fn set_fail_on_save(&self, fail: bool) {
        self.state.write().await.fail_on_save = fail;
    }

    /// Makes every subsequent load fail.
    pub async fn set_fail_on_load(&self, fail: bool) {
        self.state.write().await.fail_on_load = fail;
    }

    /// Returns the number of stored rows.
    pub async fn row_count(&self) -> usize {
        self.state.read().await.rows.len()
    }
}

#[async_trait]
impl FallbackStore for InMemoryFallbackStore {
    async fn load(&self, kiosk_token: &KioskToken) -> Result<Option<ProductRecord>, StoreError> {
        let state = self.state.read().await;
        if state.fail_on_load {
            return Err(StoreError::Unavailable("load disabled".to_string()));
        }
        Ok(state.rows.get(kiosk_token).cloned())
    }

    async fn save(&self, record: ProductRecord) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.fail_on_save {
            return Err(StoreError::Unavailable("save disabled".to_string()));
        }
        state.rows.insert(record.kiosk_token.clone(), record);
        Ok(())
    }

    async fn mark_sync_failure(
        &self,
        kiosk_token: &KioskToken,
        message: &str,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.fail_on_save {
            return Err(StoreError::Unavailable("save disabled".to_string()));
        }
        if let Some(row) = state.rows.get_mut(kiosk_token) {
            row.last_sync_status = SyncStatus::Failed;
            row.sync_message = Some(message.to_string());
        }
        Ok(())
    }
}
