//! Stock lookup endpoints.

use axum::Json;
use axum::extract::{Path, Query, State};
use catalog::{FallbackStore, GetStockOptions, Product};
use common::KioskToken;
use orders::StockAvailability;
use serde::{Deserialize, Serialize};
use supplier::RemoteInvoker;

use super::AppState;
use crate::error::ApiError;

const OUTDATED_WARNING: &str = "Supplier unreachable, stock data may be outdated";

#[derive(Debug, Default, Deserialize)]
pub struct StockQuery {
    #[serde(default)]
    pub force_refresh: bool,
    #[serde(default)]
    pub use_mock_data: bool,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    #[serde(default = "default_quantity")]
    pub quantity: u64,
}

fn default_quantity() -> u64 {
    1
}

#[derive(Serialize)]
pub struct StockResponse {
    #[serde(flatten)]
    pub product: Product,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<&'static str>,
}

/// GET /stock/{kiosk_token} — stock and price, degraded data flagged.
#[tracing::instrument(skip(state, query))]
pub async fn get<I: RemoteInvoker + 'static, F: FallbackStore + 'static>(
    State(state): State<AppState<I, F>>,
    Path(kiosk_token): Path<String>,
    Query(query): Query<StockQuery>,
) -> Result<Json<StockResponse>, ApiError> {
    let kiosk_token = parse_kiosk_token(kiosk_token)?;
    let options = GetStockOptions::new()
        .force_refresh(query.force_refresh)
        .use_mock_data(query.use_mock_data);

    let product = state.get_stock(&kiosk_token, options).await?;
    let warning = product.emergency.then_some(OUTDATED_WARNING);

    Ok(Json(StockResponse { product, warning }))
}

/// GET /stock/{kiosk_token}/availability — can `quantity` units be bought.
#[tracing::instrument(skip(state, query))]
pub async fn availability<I: RemoteInvoker + 'static, F: FallbackStore + 'static>(
    State(state): State<AppState<I, F>>,
    Path(kiosk_token): Path<String>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<StockAvailability>, ApiError> {
    let kiosk_token = parse_kiosk_token(kiosk_token)?;
    let availability = state
        .check_stock_availability(&kiosk_token, query.quantity)
        .await?;
    Ok(Json(availability))
}

pub(crate) fn parse_kiosk_token(raw: String) -> Result<KioskToken, ApiError> {
    if raw.trim().is_empty() {
        return Err(ApiError::BadRequest("kiosk_token must not be empty".to_string()));
    }
    Ok(KioskToken::new(raw.trim()))
}
