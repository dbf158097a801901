//! Product model built from validated supplier responses.

use std::time::Duration;

use chrono::{DateTime, Utc};
use common::KioskToken;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::fallback::{ProductRecord, SyncStatus};
use crate::parse::{parse_price, parse_stock_quantity};

/// Stock and price of one supplier listing.
///
/// `cached` means the value did not come from a live call on this request;
/// `emergency` means it came from the persistent fallback store after every
/// live attempt failed. Callers use either flag to show a staleness warning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub kiosk_token: KioskToken,
    pub name: String,
    pub description: Option<String>,
    pub stock_quantity: u64,
    pub price: f64,
    pub cached: bool,
    pub emergency: bool,
    pub last_checked: DateTime<Utc>,
    #[serde(with = "duration_secs")]
    pub ttl: Duration,
}

impl Product {
    /// Builds a product from a validated `getStockWithCache` body.
    ///
    /// `served_from_cache` marks results the call executor answered from its
    /// own memory tier. The supplier's own `cached`/`emergency` flags are kept.
    pub fn from_response(
        kiosk_token: KioskToken,
        body: &Value,
        served_from_cache: bool,
        ttl: Duration,
    ) -> Self {
        let name = body
            .get("name")
            .or_else(|| body.get("product"))
            .and_then(text_of)
            .unwrap_or_default();
        let description = body
            .get("description")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string);

        Self {
            kiosk_token,
            name,
            description,
            stock_quantity: parse_stock_quantity(body),
            price: parse_price(body),
            cached: served_from_cache || flag(body, "cached"),
            emergency: flag(body, "emergency"),
            last_checked: Utc::now(),
            ttl,
        }
    }

    /// Rebuilds a product from its persisted fallback row.
    ///
    /// The result is always tagged `cached` and `emergency`.
    pub fn from_record(record: ProductRecord, ttl: Duration) -> Self {
        Self {
            kiosk_token: record.kiosk_token,
            name: record.name,
            description: None,
            stock_quantity: record.stock_quantity,
            price: record.price,
            cached: true,
            emergency: true,
            last_checked: record.last_checked_at,
            ttl,
        }
    }

    /// Converts a fresh product into the row written to the fallback store.
    pub fn to_record(&self) -> ProductRecord {
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::TimeDelta::zero());
        ProductRecord {
            kiosk_token: self.kiosk_token.clone(),
            name: self.name.clone(),
            stock_quantity: self.stock_quantity,
            price: self.price,
            last_checked_at: self.last_checked,
            cached_until: self.last_checked + ttl,
            last_sync_status: SyncStatus::Success,
            sync_message: None,
        }
    }

    /// Returns true while `now < last_checked + ttl`.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match chrono::Duration::from_std(self.ttl) {
            Ok(ttl) => now < self.last_checked + ttl,
            Err(_) => true,
        }
    }

    /// Returns true if callers should warn that the data may be outdated.
    pub fn may_be_outdated(&self) -> bool {
        self.cached || self.emergency
    }

    /// Returns true if at least `quantity` units are in stock.
    pub fn has_stock_for(&self, quantity: u64) -> bool {
        self.stock_quantity >= quantity
    }
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map.get("name").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

fn flag(body: &Value, key: &str) -> bool {
    match body.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ttl: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(ttl.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
