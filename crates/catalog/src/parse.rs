//! Defensive coercion of stock and price from heterogeneous supplier bodies.
//!
//! The supplier reports numbers as JSON numbers, numeric strings, under
//! alternate field names, or only inside a free-text message. Every parser
//! here returns a non-negative value and falls back to zero.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

const STOCK_FIELDS: &[&str] = &["stock", "stock_quantity", "stockQuantity", "quantity"];
const PRICE_FIELDS: &[&str] = &["price", "amount", "unit_price"];
const MESSAGE_FIELDS: &[&str] = &["message", "description"];

static STOCK_IN_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)stock\D*(\d[\d,.]*)").expect("valid stock regex"));
static FIRST_INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d[\d,.]*").expect("valid integer regex"));
static PRICE_IN_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)price\D*(\d[\d,.]*)").expect("valid price regex"));

/// Extracts a non-negative stock quantity from a supplier body.
///
/// Order: dedicated field, alternate field names, a `Stock: N` phrase in
/// the message or description, the first number in the message, then `0`.
pub fn parse_stock_quantity(body: &Value) -> u64 {
    if let Some(qty) = STOCK_FIELDS
        .iter()
        .find_map(|field| body.get(*field).and_then(coerce_quantity))
    {
        return qty;
    }

    for text in message_texts(body) {
        if let Some(qty) = STOCK_IN_TEXT
            .captures(text)
            .and_then(|c| c.get(1))
            .and_then(|m| parse_number_text(m.as_str()))
        {
            return to_quantity(qty);
        }
    }

    body.get("message")
        .and_then(Value::as_str)
        .and_then(|text| FIRST_INTEGER.find(text))
        .and_then(|m| parse_number_text(m.as_str()))
        .map(to_quantity)
        .unwrap_or(0)
}

/// Extracts a non-negative price from a supplier body.
pub fn parse_price(body: &Value) -> f64 {
    if let Some(price) = PRICE_FIELDS
        .iter()
        .find_map(|field| body.get(*field).and_then(coerce_price))
    {
        return price;
    }

    message_texts(body)
        .find_map(|text| {
            PRICE_IN_TEXT
                .captures(text)
                .and_then(|c| c.get(1))
                .and_then(|m| parse_number_text(m.as_str()))
        })
        .map(to_price)
        .unwrap_or(0.0)
}

fn message_texts(body: &Value) -> impl Iterator<Item = &str> {
    MESSAGE_FIELDS
        .iter()
        .filter_map(move |field| body.get(*field).and_then(Value::as_str))
}

/// Coerces a single JSON value to a quantity, or `None` if it is not numeric.
pub fn coerce_quantity(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Some(u)
            } else {
                n.as_f64().map(to_quantity)
            }
        }
        Value::String(s) => parse_number_text(s).map(to_quantity),
        _ => None,
    }
}

/// Coerces a single JSON value to a price, or `None` if it is not numeric.
pub fn coerce_price(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().map(to_price),
        Value::String(s) => parse_number_text(s).map(to_price),
        _ => None,
    }
}

fn to_quantity(raw: f64) -> u64 {
    if raw.is_finite() && raw > 0.0 {
        raw.floor() as u64
    } else {
        0
    }
}

fn to_price(raw: f64) -> f64 {
    if raw.is_finite() && raw > 0.0 { raw } else { 0.0 }
}

/// Parses human-formatted numbers such as `"12,000"`, `"1.234,5"` or `"7.5"`.
///
/// A repeated separator, or a lone one followed by exactly three digits, is
/// read as thousands grouping; otherwise the last separator is the decimal
/// point.
fn parse_number_text(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let negative = trimmed.starts_with('-');
    let cleaned: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();
    let cleaned = cleaned.trim_end_matches([',', '.']);
    if cleaned.is_empty() || !cleaned.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }

    let normalized = match cleaned.rfind([',', '.']) {
        None => cleaned.to_string(),
        Some(pos) => {
            let commas = cleaned.matches(',').count();
            let dots = cleaned.matches('.').count();
            let decimals = cleaned.len() - pos - 1;
            let grouping_only = (commas == 0 || dots == 0) && (commas + dots > 1 || decimals == 3);
            if grouping_only {
                cleaned.replace([',', '.'], "")
            } else {
                let (int_part, frac_part) = cleaned.split_at(pos);
                format!("{}.{}", int_part.replace([',', '.'], ""), &frac_part[1..])
            }
        }
    };

    let value: f64 = normalized.parse().ok()?;
    Some(if negative { -value } else { value })
}
