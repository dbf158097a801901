//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use supplier::{ErrorCode, TaphoammoError};

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Classified supplier failure.
    Supplier(TaphoammoError),
    /// Internal server error.
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<ErrorCode>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: msg,
                    code: None,
                },
            ),
            ApiError::Supplier(err) => (
                supplier_status(err.code),
                ErrorBody {
                    error: err.message,
                    code: Some(err.code),
                },
            ),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: msg,
                        code: None,
                    },
                )
            }
        };

        (status, axum::Json(body)).into_response()
    }
}

/// HTTP status for each supplier error code.
pub fn supplier_status(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorCode::NetworkError | ErrorCode::ApiTempDown => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::StockUnavailable | ErrorCode::KioskPending => StatusCode::CONFLICT,
        ErrorCode::OrderProcessing => StatusCode::ACCEPTED,
        ErrorCode::UnexpectedResponse => StatusCode::BAD_GATEWAY,
    }
}

impl From<TaphoammoError> for ApiError {
    fn from(err: TaphoammoError) -> Self {
        ApiError::Supplier(err)
    }
}
