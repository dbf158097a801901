use async_trait::async_trait;
use serde_json::{Map, Value};

/// Name of the remote function every supplier call is routed through.
pub const SUPPLIER_FUNCTION: &str = "supplier-api";

/// Payload key carrying the supplier method name.
pub const ACTION_KEY: &str = "action";

/// Payload key asking the remote function to answer with mock data.
pub const DEBUG_MOCK_KEY: &str = "debugMock";

/// Payload key asking the remote function to route through its proxy.
pub const PROXY_KEY: &str = "proxy";

/// The supplier methods the integration uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupplierMethod {
    GetStock,
    GetStockWithCache,
    BuyProducts,
    GetProducts,
    TestConnection,
}

impl SupplierMethod {
    /// Returns the wire name sent as the payload `action`.
    pub fn as_str(&self) -> &'static str {
        match self {
            SupplierMethod::GetStock => "getStock",
            SupplierMethod::GetStockWithCache => "getStockWithCache",
            SupplierMethod::BuyProducts => "buyProducts",
            SupplierMethod::GetProducts => "getProducts",
            SupplierMethod::TestConnection => "test_connection",
        }
    }

    /// Returns true if a successful response must name a product.
    pub fn requires_named_product(&self) -> bool {
        matches!(self, SupplierMethod::GetStockWithCache)
    }
}

impl std::fmt::Display for SupplierMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transport-level failure reported by the remote-invocation primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeError {
    pub message: String,
    pub http_status: Option<u16>,
}

impl InvokeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            http_status: None,
        }
    }

    pub fn with_status(message: impl Into<String>, status: u16) -> Self {
        Self {
            message: message.into(),
            http_status: Some(status),
        }
    }
}

impl std::fmt::Display for InvokeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.http_status {
            Some(status) => write!(f, "{} (HTTP {})", self.message, status),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for InvokeError {}

/// Opaque primitive that reaches the supplier.
///
/// The integration never builds HTTP requests itself; it hands a JSON payload
/// to an implementation of this trait and receives the raw response body.
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait RemoteInvoker: Send + Sync {
    /// Invokes `function` with `payload` and returns the raw response body.
    async fn invoke(&self, function: &str, payload: Value) -> Result<Value, InvokeError>;
}

#[async_trait]
impl<T: RemoteInvoker + ?Sized> RemoteInvoker for std::sync::Arc<T> {
    async fn invoke(&self, function: &str, payload: Value) -> Result<Value, InvokeError> {
        (**self).invoke(function, payload).await
    }
}

/// Builds the payload sent to the remote function for one call.
pub fn build_payload(
    method: SupplierMethod,
    params: &Map<String, Value>,
    debug_mock: bool,
    use_proxy: bool,
) -> Value {
    let mut payload = params.clone();
    payload.insert(ACTION_KEY.to_string(), Value::from(method.as_str()));
    payload.insert(DEBUG_MOCK_KEY.to_string(), Value::Bool(debug_mock));
    payload.insert(PROXY_KEY.to_string(), Value::Bool(use_proxy));
    Value::Object(payload)
}
