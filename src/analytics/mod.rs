//! Indicator computation and signal aggregation pipeline.
//!
//! Data flows strictly downstream: raw OHLCV columns are canonicalized,
//! indicators are derived, sentiment is merged by date, and the signal
//! aggregator and backtest consume the resulting table. Every stage is a
//! pure function of its inputs.

pub mod backtest;
pub mod indicators;
pub mod normalize;
pub mod sentiment;
pub mod signals;

pub use backtest::run_sma_backtest;
pub use indicators::compute_indicators;
pub use normalize::normalize_table;
pub use sentiment::merge_sentiment;
pub use signals::summarize_signals;

use thiserror::Error;

/// Errors from the analytics pipeline.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("required column '{0}' missing from source data")]
    MissingColumn(&'static str),

    #[error("source table is empty")]
    EmptyTable,

    #[error("insufficient data: {0}")]
    InsufficientHistory(String),
}
