//! Shallow validation of raw supplier envelopes.
//!
//! The validator rejects envelopes that signal failure or lack the fields a
//! method must return. It never reshapes data; numeric coercion happens in
//! the catalog.

use serde_json::Value;

use crate::error::{TaphoammoError, classify_supplier_message};
use crate::invoke::SupplierMethod;

const GENERIC_FAILURE: &str = "Supplier reported a failure without a message";

/// Validates the raw response produced by `method`.
pub fn validate(method: SupplierMethod, raw: Option<&Value>) -> Result<(), TaphoammoError> {
    let Some(raw) = raw.filter(|v| !v.is_null()) else {
        return Err(TaphoammoError::unexpected(format!(
            "Empty response from supplier for {method}"
        )));
    };

    let Some(body) = raw.as_object() else {
        return Err(TaphoammoError::unexpected(format!(
            "Supplier response for {method} is not an object"
        )));
    };

    if is_failure_flag(body.get("success")) {
        let message = failure_message(raw);
        let code = classify_supplier_message(&message);
        return Err(TaphoammoError::new(code, message));
    }

    if method.requires_named_product()
        && !body.contains_key("product")
        && !body.contains_key("name")
    {
        return Err(TaphoammoError::unexpected("Response missing product name"));
    }

    Ok(())
}

fn is_failure_flag(flag: Option<&Value>) -> bool {
    match flag {
        Some(Value::Bool(false)) => true,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("false"),
        _ => false,
    }
}

/// Extracts the supplier's own explanation of a failed envelope.
pub fn failure_message(raw: &Value) -> String {
    ["message", "description", "error"]
        .iter()
        .find_map(|key| raw.get(*key).and_then(Value::as_str))
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| GENERIC_FAILURE.to_string())
}
