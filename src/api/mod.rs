pub mod analysis;
pub mod forecast;
pub mod health;
pub mod market;
pub mod news;

use crate::analytics::{compute_indicators, merge_sentiment};
use crate::error::Result;
use crate::types::{IndicatorParams, IndicatorTable};
use crate::AppState;
use axum::Router;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/api/market", market::router())
        .nest("/api/analysis", analysis::router())
        .nest("/api/forecast", forecast::router())
        .nest("/api/news", news::router())
}

/// Run the shared front half of the pipeline: fetch history, derive
/// indicators, merge news sentiment.
pub(crate) async fn build_indicator_table(
    state: &AppState,
    symbol: &str,
    range: &str,
    params: IndicatorParams,
) -> Result<IndicatorTable> {
    let candles = state.market.daily_history(symbol, range).await?;
    let table = compute_indicators(params, &candles)?;
    let sentiment = state.news.daily_sentiment().await;
    Ok(merge_sentiment(&table, &sentiment))
}
