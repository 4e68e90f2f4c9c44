use crate::analytics::{run_sma_backtest, summarize_signals, backtest::DEFAULT_INITIAL_CAPITAL};
use crate::error::Result;
use crate::types::{BacktestReport, IndicatorParams, IndicatorRow, SignalSummary};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

/// Per-call overrides of the indicator parameter defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisQuery {
    pub range: Option<String>,
    pub sma_short: Option<usize>,
    pub sma_long: Option<usize>,
    pub rsi_period: Option<usize>,
    pub macd_fast: Option<usize>,
    pub macd_slow: Option<usize>,
    pub macd_signal: Option<usize>,
    pub bb_period: Option<usize>,
    pub bb_std: Option<f64>,
    pub atr_period: Option<usize>,
    pub stoch_k: Option<usize>,
    pub stoch_d: Option<usize>,
}

impl AnalysisQuery {
    fn range(&self) -> &str {
        self.range.as_deref().unwrap_or("3mo")
    }

    fn params(&self) -> IndicatorParams {
        let defaults = IndicatorParams::default();
        IndicatorParams {
            sma_short: self.sma_short.unwrap_or(defaults.sma_short),
            sma_long: self.sma_long.unwrap_or(defaults.sma_long),
            rsi_period: self.rsi_period.unwrap_or(defaults.rsi_period),
            macd_fast: self.macd_fast.unwrap_or(defaults.macd_fast),
            macd_slow: self.macd_slow.unwrap_or(defaults.macd_slow),
            macd_signal: self.macd_signal.unwrap_or(defaults.macd_signal),
            bb_period: self.bb_period.unwrap_or(defaults.bb_period),
            bb_std: self.bb_std.unwrap_or(defaults.bb_std),
            atr_period: self.atr_period.unwrap_or(defaults.atr_period),
            stoch_k: self.stoch_k.unwrap_or(defaults.stoch_k),
            stoch_d: self.stoch_d.unwrap_or(defaults.stoch_d),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BacktestQuery {
    #[serde(default = "default_backtest_range")]
    pub range: String,
    pub capital: Option<f64>,
}

fn default_backtest_range() -> String {
    "6mo".to_string()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisResponse {
    symbol: String,
    params: IndicatorParams,
    summary: SignalSummary,
    latest: IndicatorRow,
    rows: Vec<IndicatorRow>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BacktestResponse {
    symbol: String,
    report: BacktestReport,
}

async fn analysis(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<AnalysisQuery>,
) -> Result<Json<AnalysisResponse>> {
    let table = super::build_indicator_table(&state, &symbol, query.range(), query.params()).await?;
    let summary = summarize_signals(&table)?;
    let latest = table.last_complete_row().cloned().ok_or_else(|| {
        crate::error::AppError::Internal("signal summary without a complete row".to_string())
    })?;

    Ok(Json(AnalysisResponse {
        symbol,
        params: table.params,
        summary,
        latest,
        rows: table.rows,
    }))
}

async fn backtest(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<BacktestQuery>,
) -> Result<Json<BacktestResponse>> {
    let table = super::build_indicator_table(
        &state,
        &symbol,
        &query.range,
        IndicatorParams::default(),
    )
    .await?;
    let capital = query.capital.unwrap_or(DEFAULT_INITIAL_CAPITAL);
    let report = run_sma_backtest(&table, capital)?;

    Ok(Json(BacktestResponse { symbol, report }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:symbol", get(analysis))
        .route("/:symbol/backtest", get(backtest))
}
