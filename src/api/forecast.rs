use crate::error::{AppError, Result};
use crate::types::{Forecast, IndicatorParams};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ForecastQuery {
    /// Future days to predict; the dashboard offers 1-7.
    #[serde(default = "default_days")]
    pub days: usize,
    #[serde(default = "default_range")]
    pub range: String,
}

fn default_days() -> usize {
    5
}

fn default_range() -> String {
    "6mo".to_string()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ForecastResponse {
    symbol: String,
    days: usize,
    forecast: Forecast,
}

async fn forecast(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<ForecastQuery>,
) -> Result<Json<ForecastResponse>> {
    if query.days == 0 {
        return Err(AppError::BadRequest(
            "days must be at least 1".to_string(),
        ));
    }

    let table = super::build_indicator_table(
        &state,
        &symbol,
        &query.range,
        IndicatorParams::default(),
    )
    .await?;

    // model training is CPU-bound; keep it off the async workers
    let engine = state.forecaster.clone();
    let days = query.days;
    let forecast = tokio::task::spawn_blocking(move || engine.forecast(&table, days))
        .await
        .map_err(|e| AppError::Internal(format!("forecast task failed: {}", e)))?;

    Ok(Json(ForecastResponse {
        symbol,
        days: query.days,
        forecast,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/:symbol", get(forecast))
}
