use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One daily OHLCV price bar.
///
/// Dates are unique and strictly increasing within a series. The
/// `low <= open,close <= high` relation is assumed from upstream data
/// and not validated here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candle {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// A single named column of upstream tabular data.
#[derive(Debug, Clone, PartialEq)]
pub struct RawColumn {
    pub name: String,
    pub values: Vec<f64>,
}

/// Tabular OHLCV data as it arrives from an upstream source, before
/// column names have been canonicalized.
///
/// Column names may be ticker-suffixed ("Close_BTC-USD"), flattened from
/// a hierarchical header, or inconsistently cased. Every column has one
/// value per entry of `dates`.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub dates: Vec<NaiveDate>,
    pub columns: Vec<RawColumn>,
}

impl RawTable {
    pub fn new(dates: Vec<NaiveDate>) -> Self {
        Self {
            dates,
            columns: Vec::new(),
        }
    }

    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.columns.push(RawColumn {
            name: name.into(),
            values,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}
