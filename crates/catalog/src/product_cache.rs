//! Second cache tier: the most recent parsed product per kiosk token.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::KioskToken;
use tokio::sync::RwLock;

use crate::product::Product;

/// Per-product cache consulted before any live call.
///
/// An entry is valid only while `now < last_checked + ttl`; stale entries
/// are removed by the read that finds them.
#[derive(Debug, Clone, Default)]
pub struct ProductCache {
    products: Arc<RwLock<HashMap<KioskToken, Product>>>,
}

impl ProductCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached product if it is still fresh at `now`.
    pub async fn get_fresh(&self, kiosk_token: &KioskToken, now: DateTime<Utc>) -> Option<Product> {
        {
            let products = self.products.read().await;
            match products.get(kiosk_token) {
                None => return None,
                Some(product) if product.is_fresh(now) => return Some(product.clone()),
                Some(_) => {}
            }
        }

        let mut products = self.products.write().await;
        match products.get(kiosk_token) {
            Some(product) if product.is_fresh(now) => Some(product.clone()),
            Some(_) => {
                products.remove(kiosk_token);
                None
            }
            None => None,
        }
    }

    /// Stores `product`, replacing any previous entry for its token.
    pub async fn put(&self, product: Product) {
        self.products
            .write()
            .await
            .insert(product.kiosk_token.clone(), product);
    }

    pub async fn remove(&self, kiosk_token: &KioskToken) -> Option<Product> {
        self.products.write().await.remove(kiosk_token)
    }

    pub async fn clear(&self) {
        self.products.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.products.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.products.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn product(token: &str, ttl: Duration) -> Product {
        let body = json!({ "name": "X", "stock": 2 });
        Product::from_response(KioskToken::new(token), &body, false, ttl)
    }

    #[tokio::test]
    async fn test_fresh_entry_is_returned() {
        let cache = ProductCache::new();
        cache.put(product("K1", Duration::from_secs(60))).await;

        let hit = cache.get_fresh(&KioskToken::new("K1"), Utc::now()).await;
        assert_eq!(hit.unwrap().stock_quantity, 2);
    }

    #[tokio::test]
    async fn test_stale_entry_is_evicted() {
        let cache = ProductCache::new();
        cache.put(product("K1", Duration::from_secs(60))).await;

        let later = Utc::now() + chrono::Duration::seconds(61);
        assert!(cache.get_fresh(&KioskToken::new("K1"), later).await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = ProductCache::new();
        cache.put(product("K1", Duration::from_secs(60))).await;
        cache.put(product("K2", Duration::from_secs(60))).await;
        assert_eq!(cache.len().await, 2);

        cache.clear().await;
        assert!(cache.is_empty().await);
    }
}
