use crate::error::Result;
use crate::types::Candle;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Yahoo range string, e.g. "1mo", "3mo", "6mo", "1y".
    #[serde(default = "default_range")]
    pub range: String,
}

fn default_range() -> String {
    "3mo".to_string()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PriceResponse {
    symbol: String,
    /// Null when every source failed; the dashboard renders "no data".
    price: Option<f64>,
    timestamp: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryResponse {
    symbol: String,
    range: String,
    candles: Vec<Candle>,
}

async fn spot_price(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<PriceResponse>> {
    let price = state.market.spot_price(&symbol).await?;
    Ok(Json(PriceResponse {
        symbol,
        price,
        timestamp: chrono::Utc::now().timestamp_millis(),
    }))
}

async fn history(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>> {
    let candles = state.market.daily_history(&symbol, &query.range).await?;
    Ok(Json(HistoryResponse {
        symbol,
        range: query.range,
        candles,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/price/:symbol", get(spot_price))
        .route("/history/:symbol", get(history))
}
