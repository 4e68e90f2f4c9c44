//! Yahoo Finance chart API client for daily OHLCV history.
//!
//! Responses arrive as parallel per-field arrays keyed by timestamp.
//! The client reassembles them into a raw table whose column names
//! still carry the ticker suffix, the shape the column normalizer
//! expects to clean up.

use crate::error::{AppError, Result};
use crate::types::RawTable;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: YahooChart,
}

#[derive(Debug, Deserialize)]
struct YahooChart {
    result: Option<Vec<YahooResult>>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct YahooError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct YahooResult {
    timestamp: Option<Vec<i64>>,
    indicators: YahooIndicators,
}

#[derive(Debug, Deserialize)]
struct YahooIndicators {
    quote: Vec<YahooQuote>,
}

#[derive(Debug, Deserialize)]
struct YahooQuote {
    open: Option<Vec<Option<f64>>>,
    high: Option<Vec<Option<f64>>>,
    low: Option<Vec<Option<f64>>>,
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<u64>>>,
}

/// Yahoo Finance API client.
pub struct YahooFinanceClient {
    client: Client,
}

impl YahooFinanceClient {
    /// Create a new client with the given request timeout.
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client }
    }

    /// Fetch daily history for a ticker over a range such as "1mo",
    /// "3mo", "6mo" or "1y". Rows with a null or non-positive close
    /// are skipped.
    pub async fn daily_history(&self, ticker: &str, range: &str) -> Result<RawTable> {
        let url = format!(
            "https://query1.finance.yahoo.com/v8/finance/chart/{}?range={}&interval=1d&includePrePost=false",
            ticker, range
        );

        debug!("Fetching Yahoo Finance history: {} ({})", ticker, range);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Yahoo request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalApi(format!(
                "Yahoo API error: {}",
                response.status()
            )));
        }

        let data: YahooChartResponse = response
            .json()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Failed to parse Yahoo response: {}", e)))?;

        if let Some(error) = data.chart.error {
            return Err(AppError::ExternalApi(format!(
                "Yahoo API error: {} - {}",
                error.code, error.description
            )));
        }

        let result = data
            .chart
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| AppError::ExternalApi("Empty Yahoo chart result".to_string()))?;

        let timestamps = result
            .timestamp
            .ok_or_else(|| AppError::ExternalApi("No timestamps in Yahoo response".to_string()))?;

        let quote = result
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| AppError::ExternalApi("No quote data in Yahoo response".to_string()))?;

        Ok(assemble_table(ticker, &timestamps, &quote))
    }
}

/// Reassemble Yahoo's parallel arrays into a ticker-suffixed raw table.
fn assemble_table(ticker: &str, timestamps: &[i64], quote: &YahooQuote) -> RawTable {
    let opens = quote.open.clone().unwrap_or_default();
    let highs = quote.high.clone().unwrap_or_default();
    let lows = quote.low.clone().unwrap_or_default();
    let closes = quote.close.clone().unwrap_or_default();
    let volumes = quote.volume.clone().unwrap_or_default();

    let mut dates = Vec::new();
    let mut open_col = Vec::new();
    let mut high_col = Vec::new();
    let mut low_col = Vec::new();
    let mut close_col = Vec::new();
    let mut volume_col = Vec::new();

    for (i, &ts) in timestamps.iter().enumerate() {
        let close = closes.get(i).and_then(|v| *v).unwrap_or(0.0);
        if close <= 0.0 {
            continue;
        }
        let Some(date) = DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive()) else {
            continue;
        };

        dates.push(date);
        open_col.push(opens.get(i).and_then(|v| *v).unwrap_or(close));
        high_col.push(highs.get(i).and_then(|v| *v).unwrap_or(close));
        low_col.push(lows.get(i).and_then(|v| *v).unwrap_or(close));
        close_col.push(close);
        volume_col.push(volumes.get(i).and_then(|v| *v).unwrap_or(0) as f64);
    }

    let mut table = RawTable::new(dates);
    table.push_column(format!("Open_{}", ticker), open_col);
    table.push_column(format!("High_{}", ticker), high_col);
    table.push_column(format!("Low_{}", ticker), low_col);
    table.push_column(format!("Close_{}", ticker), close_col);
    table.push_column(format!("Volume_{}", ticker), volume_col);
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_quote() -> YahooQuote {
        YahooQuote {
            open: Some(vec![Some(100.0), Some(101.0), None]),
            high: Some(vec![Some(102.0), Some(103.0), Some(104.0)]),
            low: Some(vec![Some(99.0), Some(100.0), Some(101.0)]),
            close: Some(vec![Some(101.0), Some(102.0), Some(103.0)]),
            volume: Some(vec![Some(1_000), Some(2_000), None]),
        }
    }

    #[test]
    fn test_assemble_table_columns_are_suffixed() {
        let table = assemble_table("BTC-USD", &[1_700_000_000, 1_700_086_400], &sample_quote());
        assert_eq!(table.dates.len(), 2);
        let names: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Open_BTC-USD",
                "High_BTC-USD",
                "Low_BTC-USD",
                "Close_BTC-USD",
                "Volume_BTC-USD"
            ]
        );
    }

    #[test]
    fn test_assemble_table_fills_null_fields_from_close() {
        let table = assemble_table(
            "BTC-USD",
            &[1_700_000_000, 1_700_086_400, 1_700_172_800],
            &sample_quote(),
        );
        // third row has null open/volume but a valid close
        assert_eq!(table.columns[0].values[2], 103.0);
        assert_eq!(table.columns[4].values[2], 0.0);
    }

    #[test]
    fn test_assemble_table_skips_invalid_close() {
        let quote = YahooQuote {
            open: Some(vec![Some(100.0), Some(101.0)]),
            high: Some(vec![Some(102.0), Some(103.0)]),
            low: Some(vec![Some(99.0), Some(100.0)]),
            close: Some(vec![None, Some(102.0)]),
            volume: Some(vec![Some(1_000), Some(2_000)]),
        };
        let table = assemble_table("ETH-USD", &[1_700_000_000, 1_700_086_400], &quote);
        assert_eq!(table.dates.len(), 1);
        assert_eq!(table.columns[3].values, vec![102.0]);
    }

    #[test]
    fn test_chart_error_deserialization() {
        let json = r#"{
            "chart": {
                "result": null,
                "error": {"code": "Not Found", "description": "No data"}
            }
        }"#;
        let parsed: YahooChartResponse = serde_json::from_str(json).unwrap();
        assert!(parsed.chart.result.is_none());
        assert_eq!(parsed.chart.error.unwrap().code, "Not Found");
    }
}
