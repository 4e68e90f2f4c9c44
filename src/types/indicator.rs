use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Window lengths and multipliers for indicator computation.
///
/// Bollinger band width uses the sample standard deviation (ddof = 1)
/// over the trailing window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorParams {
    /// Short simple-moving-average window.
    pub sma_short: usize,
    /// Long simple-moving-average window.
    pub sma_long: usize,
    /// RSI smoothing period.
    pub rsi_period: usize,
    /// MACD fast EMA span.
    pub macd_fast: usize,
    /// MACD slow EMA span.
    pub macd_slow: usize,
    /// MACD signal-line EMA span.
    pub macd_signal: usize,
    /// Bollinger band window, also used for the CCI window.
    pub bb_period: usize,
    /// Bollinger band standard-deviation multiplier.
    pub bb_std: f64,
    /// ATR smoothing period.
    pub atr_period: usize,
    /// Stochastic %K window.
    pub stoch_k: usize,
    /// Stochastic %D smoothing window.
    pub stoch_d: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            sma_short: 5,
            sma_long: 20,
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bb_period: 20,
            bb_std: 2.0,
            atr_period: 14,
            stoch_k: 14,
            stoch_d: 3,
        }
    }
}

/// One dated row of the indicator table.
///
/// Derived columns are `None` until enough history has accumulated for
/// their window, or when a zero denominator makes the value undefined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorRow {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub sma_short: Option<f64>,
    pub sma_long: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_hist: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_lower: Option<f64>,
    pub stoch_k: Option<f64>,
    pub stoch_d: Option<f64>,
    pub atr: Option<f64>,
    pub obv: Option<f64>,
    pub cci: Option<f64>,
    /// Per-day sentiment score in [-1, 1]; 0.0 when no sentiment was
    /// available for the date.
    pub sentiment: f64,
}

impl IndicatorRow {
    /// True when every derived indicator column is defined.
    pub fn is_complete(&self) -> bool {
        self.sma_short.is_some()
            && self.sma_long.is_some()
            && self.rsi.is_some()
            && self.macd.is_some()
            && self.macd_signal.is_some()
            && self.macd_hist.is_some()
            && self.bb_upper.is_some()
            && self.bb_middle.is_some()
            && self.bb_lower.is_some()
            && self.stoch_k.is_some()
            && self.stoch_d.is_some()
            && self.atr.is_some()
            && self.obv.is_some()
            && self.cci.is_some()
    }
}

/// The full indicator table: one row per input candle, in date order,
/// along with the parameters that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorTable {
    pub params: IndicatorParams,
    pub rows: Vec<IndicatorRow>,
}

impl IndicatorTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The most recent row with every indicator defined, if any.
    pub fn last_complete_row(&self) -> Option<&IndicatorRow> {
        self.rows.iter().rev().find(|r| r.is_complete())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_row() -> IndicatorRow {
        IndicatorRow {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            volume: 1.0,
            sma_short: None,
            sma_long: None,
            rsi: None,
            macd: None,
            macd_signal: None,
            macd_hist: None,
            bb_upper: None,
            bb_middle: None,
            bb_lower: None,
            stoch_k: None,
            stoch_d: None,
            atr: None,
            obv: None,
            cci: None,
            sentiment: 0.0,
        }
    }

    fn complete_row() -> IndicatorRow {
        IndicatorRow {
            sma_short: Some(1.0),
            sma_long: Some(1.0),
            rsi: Some(50.0),
            macd: Some(0.0),
            macd_signal: Some(0.0),
            macd_hist: Some(0.0),
            bb_upper: Some(1.1),
            bb_middle: Some(1.0),
            bb_lower: Some(0.9),
            stoch_k: Some(50.0),
            stoch_d: Some(50.0),
            atr: Some(0.1),
            obv: Some(0.0),
            cci: Some(0.0),
            ..blank_row()
        }
    }

    #[test]
    fn test_default_params() {
        let params = IndicatorParams::default();
        assert_eq!(params.sma_short, 5);
        assert_eq!(params.sma_long, 20);
        assert_eq!(params.rsi_period, 14);
        assert_eq!(params.macd_fast, 12);
        assert_eq!(params.macd_slow, 26);
        assert_eq!(params.macd_signal, 9);
        assert_eq!(params.bb_period, 20);
        assert_eq!(params.bb_std, 2.0);
        assert_eq!(params.stoch_k, 14);
        assert_eq!(params.stoch_d, 3);
    }

    #[test]
    fn test_row_completeness() {
        assert!(!blank_row().is_complete());
        assert!(complete_row().is_complete());

        let mut partial = complete_row();
        partial.cci = None;
        assert!(!partial.is_complete());
    }

    #[test]
    fn test_last_complete_row_skips_trailing_incomplete() {
        let table = IndicatorTable {
            params: IndicatorParams::default(),
            rows: vec![blank_row(), complete_row(), blank_row()],
        };
        assert!(table.last_complete_row().is_some());

        let none = IndicatorTable {
            params: IndicatorParams::default(),
            rows: vec![blank_row()],
        };
        assert!(none.last_complete_row().is_none());
    }
}
