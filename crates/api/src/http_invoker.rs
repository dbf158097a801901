//! HTTP transport for supplier function calls.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use supplier::{InvokeError, RemoteInvoker};

/// Posts supplier payloads to `<base_url>/<function>`.
///
/// The hosting platform answers with a `{data, error}` envelope; `data` is
/// returned as the raw supplier body and `error` becomes an [`InvokeError`].
/// Bodies without an envelope are returned whole.
#[derive(Clone)]
pub struct HttpInvoker {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpInvoker {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self::with_client(Client::new(), base_url, api_key)
    }

    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, function: &str) -> String {
        format!("{}/{}", self.base_url, function)
    }
}

#[async_trait]
impl RemoteInvoker for HttpInvoker {
    async fn invoke(&self, function: &str, payload: Value) -> Result<Value, InvokeError> {
        let mut request = self.client.post(self.url(function)).json(&payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_connect() || e.is_request() {
                InvokeError::new(format!("network error: {e}"))
            } else {
                InvokeError::new(format!("HTTP request failed: {e}"))
            }
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| InvokeError::new(format!("network error while reading body: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|body| envelope_error(&body))
                .unwrap_or_else(|| {
                    let reason = status.canonical_reason().unwrap_or("error");
                    format!("HTTP {}: {reason}", status.as_u16())
                });
            return Err(InvokeError::with_status(message, status.as_u16()));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        let body: Value = serde_json::from_str(&text)
            .map_err(|e| InvokeError::new(format!("Failed to parse supplier response: {e}")))?;

        unwrap_envelope(body)
    }
}

impl std::fmt::Debug for HttpInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpInvoker")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Splits a `{data, error}` envelope.
///
/// Only a body whose keys are exactly `data` and `error` is an envelope;
/// supplier bodies may carry their own `error` field for the validator.
fn unwrap_envelope(body: Value) -> Result<Value, InvokeError> {
    match body {
        Value::Object(mut map)
            if map.len() == 2 && map.contains_key("data") && map.contains_key("error") =>
        {
            if let Some(message) = envelope_error(&Value::Object(map.clone())) {
                return Err(InvokeError::new(message));
            }
            Ok(map.remove("data").unwrap_or(Value::Null))
        }
        other => Ok(other),
    }
}

fn envelope_error(body: &Value) -> Option<String> {
    match body.get("error")? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => Some(
            map.get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| Value::Object(map.clone()).to_string()),
        ),
        other => Some(other.to_string()),
    }
}
