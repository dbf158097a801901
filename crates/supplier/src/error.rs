use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of every failure that crosses the call executor.
///
/// Callers match on this exhaustively to decide between "try again later",
/// "permanently failed" and business outcomes such as "sold out".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The remote function could not be reached.
    NetworkError,
    /// No answer arrived within the call timeout.
    Timeout,
    /// Malformed or unrecognized supplier envelope.
    UnexpectedResponse,
    /// The kiosk listing is not yet active on the supplier side.
    KioskPending,
    /// The supplier reported a temporary outage.
    ApiTempDown,
    /// The supplier has no stock for the listing.
    StockUnavailable,
    /// The order was accepted but its keys are not ready yet.
    OrderProcessing,
}

impl ErrorCode {
    /// Returns the wire name of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NetworkError => "NETWORK_ERROR",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::UnexpectedResponse => "UNEXPECTED_RESPONSE",
            ErrorCode::KioskPending => "KIOSK_PENDING",
            ErrorCode::ApiTempDown => "API_TEMP_DOWN",
            ErrorCode::StockUnavailable => "STOCK_UNAVAILABLE",
            ErrorCode::OrderProcessing => "ORDER_PROCESSING",
        }
    }

    /// Returns true if the same call may succeed when repeated later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::NetworkError
                | ErrorCode::Timeout
                | ErrorCode::ApiTempDown
                | ErrorCode::OrderProcessing
        )
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The only error type surfaced by supplier calls.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("[{code}] {message}")]
pub struct TaphoammoError {
    pub message: String,
    pub code: ErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
}

impl TaphoammoError {
    /// Creates an error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code,
            http_status: None,
            response_time_ms: None,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NetworkError, message)
    }

    /// A timeout after `timeout_ms` milliseconds of waiting.
    pub fn timeout(timeout_ms: u64) -> Self {
        Self::new(
            ErrorCode::Timeout,
            format!("Supplier did not respond within {timeout_ms}ms"),
        )
        .with_response_time(timeout_ms)
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnexpectedResponse, message)
    }

    pub fn kiosk_pending(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::KioskPending, message)
    }

    pub fn temp_down(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ApiTempDown, message)
    }

    pub fn stock_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StockUnavailable, message)
    }

    pub fn order_processing(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::OrderProcessing, message)
    }

    /// Attaches the HTTP status reported by the transport.
    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    /// Attaches the elapsed time of the failed call.
    pub fn with_response_time(mut self, ms: u64) -> Self {
        self.response_time_ms = Some(ms);
        self
    }

    /// Returns true if the caller may retry the same call later.
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

const NETWORK_MARKERS: &[&str] = &[
    "connection refused",
    "failed to fetch",
    "fetch failed",
    "network",
    "connection reset",
    "connection closed",
    "dns error",
    "econnrefused",
    "econnreset",
    "unreachable",
];

/// Classifies a failure reported by the remote-invocation primitive.
pub fn classify_transport_error(message: &str, http_status: Option<u16>) -> ErrorCode {
    if matches!(http_status, Some(502..=504)) {
        return ErrorCode::ApiTempDown;
    }
    let lower = message.to_lowercase();
    if NETWORK_MARKERS.iter().any(|m| lower.contains(m)) {
        ErrorCode::NetworkError
    } else {
        ErrorCode::UnexpectedResponse
    }
}

/// Maps a supplier-authored failure message onto a business code.
///
/// Text that matches no known condition stays `UnexpectedResponse`.
pub fn classify_supplier_message(message: &str) -> ErrorCode {
    let lower = message.to_lowercase();
    if lower.contains("order in processing") || lower.contains("order is processing") {
        ErrorCode::OrderProcessing
    } else if lower.contains("kiosk pending") || lower.contains("kiosk is pending") {
        ErrorCode::KioskPending
    } else if lower.contains("out of stock")
        || lower.contains("not enough")
        || lower.contains("stock unavailable")
        || lower.contains("het hang")
    {
        ErrorCode::StockUnavailable
    } else if lower.contains("temporarily")
        || lower.contains("maintenance")
        || lower.contains("try again later")
    {
        ErrorCode::ApiTempDown
    } else {
        ErrorCode::UnexpectedResponse
    }
}

/// Convenience type alias for supplier call results.
pub type Result<T> = std::result::Result<T, TaphoammoError>;
