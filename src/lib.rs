//! coinlens - cryptocurrency analytics dashboard server.
//!
//! Fetches OHLCV history and news, derives technical indicators,
//! aggregates buy/sell signals and produces short-horizon LSTM price
//! forecasts behind a small JSON API.

pub mod analytics;
pub mod api;
pub mod config;
pub mod error;
pub mod forecast;
pub mod services;
pub mod sources;
pub mod types;

use config::Config;
use forecast::ForecastEngine;
use services::{MarketDataService, NewsService};
use std::sync::Arc;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub market: Arc<MarketDataService>,
    pub news: Arc<NewsService>,
    pub forecaster: Arc<ForecastEngine>,
}

// Re-export commonly used types
pub use error::{AppError, Result};
pub use types::*;
