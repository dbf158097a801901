//! Purchase and key retrieval endpoints.

use std::time::Duration;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use catalog::FallbackStore;
use common::OrderId;
use orders::{Order, PollOptions, PollOutcome, ProductsResponse};
use serde::Deserialize;
use supplier::RemoteInvoker;

use super::AppState;
use super::stock::parse_kiosk_token;
use crate::error::ApiError;

/// Largest poll budget a client may request.
pub const MAX_POLL_RETRIES: u32 = 20;
/// Longest wait between polls a client may request.
pub const MAX_POLL_DELAY_MS: u64 = 10_000;

#[derive(Debug, Deserialize)]
pub struct BuyRequest {
    pub kiosk_token: String,
    pub quantity: u32,
    pub promotion: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PollQuery {
    pub max_retries: Option<u32>,
    pub delay_ms: Option<u64>,
}

/// POST /orders — buy with the default user token. Never retried.
#[tracing::instrument(skip(state, req))]
pub async fn buy<I: RemoteInvoker + 'static, F: FallbackStore + 'static>(
    State(state): State<AppState<I, F>>,
    Json(req): Json<BuyRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    if req.quantity == 0 {
        return Err(ApiError::BadRequest("quantity must be at least 1".to_string()));
    }
    let kiosk_token = parse_kiosk_token(req.kiosk_token)?;

    let order = state
        .buy_products(&kiosk_token, req.quantity, req.promotion.as_deref())
        .await?;

    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders/{order_id}/products — delivered keys, 202 while processing.
#[tracing::instrument(skip(state))]
pub async fn products<I: RemoteInvoker + 'static, F: FallbackStore + 'static>(
    State(state): State<AppState<I, F>>,
    Path(order_id): Path<String>,
) -> Result<Json<ProductsResponse>, ApiError> {
    let order_id = parse_order_id(order_id)?;
    Ok(Json(state.get_products(&order_id).await?))
}

/// POST /orders/{order_id}/poll — poll until keys arrive or the budget runs out.
#[tracing::instrument(skip(state, query))]
pub async fn poll<I: RemoteInvoker + 'static, F: FallbackStore + 'static>(
    State(state): State<AppState<I, F>>,
    Path(order_id): Path<String>,
    Query(query): Query<PollQuery>,
) -> Result<Json<PollOutcome>, ApiError> {
    let order_id = parse_order_id(order_id)?;
    let options = poll_options(&query, state.orders().config().poll)?;

    Ok(Json(state.check_order_until_complete(&order_id, options).await))
}

fn poll_options(query: &PollQuery, defaults: PollOptions) -> Result<PollOptions, ApiError> {
    if let Some(max_retries) = query.max_retries
        && max_retries > MAX_POLL_RETRIES
    {
        return Err(ApiError::BadRequest(format!(
            "max_retries must be at most {MAX_POLL_RETRIES}"
        )));
    }
    if let Some(delay_ms) = query.delay_ms
        && delay_ms > MAX_POLL_DELAY_MS
    {
        return Err(ApiError::BadRequest(format!(
            "delay_ms must be at most {MAX_POLL_DELAY_MS}"
        )));
    }

    Ok(PollOptions::new(
        query.max_retries.unwrap_or(defaults.max_retries),
        query
            .delay_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.delay),
    ))
}

fn parse_order_id(raw: String) -> Result<OrderId, ApiError> {
    if raw.trim().is_empty() {
        return Err(ApiError::BadRequest("order_id must not be empty".to_string()));
    }
    Ok(OrderId::new(raw.trim()))
}
