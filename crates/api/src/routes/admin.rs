//! Administrative endpoints: connectivity check, bulk import and cache reset.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use catalog::FallbackStore;
use common::KioskToken;
use serde::Deserialize;
use supplier::RemoteInvoker;

use super::AppState;
use super::stock::parse_kiosk_token;
use crate::error::ApiError;
use crate::integration::{ConnectionStatus, ImportReport};

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub kiosk_tokens: Vec<String>,
}

/// GET /connection/{kiosk_token} — check the supplier. Always 200.
#[tracing::instrument(skip(state))]
pub async fn connection<I: RemoteInvoker + 'static, F: FallbackStore + 'static>(
    State(state): State<AppState<I, F>>,
    Path(kiosk_token): Path<String>,
) -> Result<Json<ConnectionStatus>, ApiError> {
    let kiosk_token = parse_kiosk_token(kiosk_token)?;
    Ok(Json(state.test_connection(&kiosk_token).await))
}

/// POST /admin/import — refresh a batch of products, one result per token.
#[tracing::instrument(skip(state, req))]
pub async fn import<I: RemoteInvoker + 'static, F: FallbackStore + 'static>(
    State(state): State<AppState<I, F>>,
    Json(req): Json<ImportRequest>,
) -> Result<Json<ImportReport>, ApiError> {
    let tokens: Vec<KioskToken> = req
        .kiosk_tokens
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(KioskToken::from)
        .collect();
    if tokens.is_empty() {
        return Err(ApiError::BadRequest("kiosk_tokens must not be empty".to_string()));
    }

    Ok(Json(state.import_products(&tokens).await))
}

/// POST /admin/cache/clear — drop every memory tier.
#[tracing::instrument(skip(state))]
pub async fn clear_cache<I: RemoteInvoker + 'static, F: FallbackStore + 'static>(
    State(state): State<AppState<I, F>>,
) -> StatusCode {
    state.clear_cache().await;
    StatusCode::NO_CONTENT
}
