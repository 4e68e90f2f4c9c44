use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One predicted future closing price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Result of a forecast request.
///
/// `points` is empty when the forecast could not be produced; `status`
/// carries the reason either way.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Forecast {
    pub status: String,
    pub points: Vec<ForecastPoint>,
}

impl Forecast {
    /// A forecast that could not be produced for lack of history.
    pub fn insufficient_data() -> Self {
        Self {
            status: "insufficient data".to_string(),
            points: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Equity-curve sample of the SMA crossover backtest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquityPoint {
    pub date: NaiveDate,
    /// Compounded strategy value.
    pub strategy: f64,
    /// Compounded buy-and-hold value.
    pub benchmark: f64,
}

/// Outcome of replaying the SMA crossover strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestReport {
    /// Strategy return over the period, in percent.
    pub strategy_return_pct: f64,
    /// Buy-and-hold return over the same period, in percent.
    pub benchmark_return_pct: f64,
    /// Initial capital both curves start from.
    pub initial_capital: f64,
    pub equity_curve: Vec<EquityPoint>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_forecast_is_empty() {
        let forecast = Forecast::insufficient_data();
        assert!(forecast.is_empty());
        assert_eq!(forecast.status, "insufficient data");
    }
}
