//! Canonicalization of upstream OHLCV column names.

use super::AnalyticsError;
use crate::types::{Candle, RawColumn, RawTable};

/// A normalized table: canonical OHLCV candles plus any unrecognized
/// columns passed through with capitalized names.
#[derive(Debug, Clone)]
pub struct NormalizedTable {
    pub candles: Vec<Candle>,
    pub extras: Vec<RawColumn>,
}

/// Resolve heterogeneous column names to the canonical
/// `Open, High, Low, Close, Volume` schema.
///
/// Matching is case-insensitive on the `_`-delimited prefix of each
/// name, so ticker-suffixed columns like `Close_BTC-USD` resolve to
/// `Close`. Adjusted-close spellings also resolve to `Close`. When two
/// columns resolve to the same canonical name the first one wins.
/// Unrecognized columns are passed through with their first letter
/// capitalized. Fails when any of the five required columns cannot be
/// resolved.
pub fn normalize_table(raw: &RawTable) -> Result<NormalizedTable, AnalyticsError> {
    if raw.is_empty() {
        return Err(AnalyticsError::EmptyTable);
    }

    let mut open = None;
    let mut high = None;
    let mut low = None;
    let mut close = None;
    let mut volume = None;
    let mut extras = Vec::new();

    for column in &raw.columns {
        let base = canonical_base(&column.name);
        let slot = match base.as_str() {
            "open" => &mut open,
            "high" => &mut high,
            "low" => &mut low,
            "close" | "adj close" | "adjclose" | "adj_close" => &mut close,
            "volume" => &mut volume,
            _ => {
                extras.push(RawColumn {
                    name: capitalize(&column.name),
                    values: column.values.clone(),
                });
                continue;
            }
        };
        if slot.is_none() {
            *slot = Some(&column.values);
        }
    }

    let open = open.ok_or(AnalyticsError::MissingColumn("Open"))?;
    let high = high.ok_or(AnalyticsError::MissingColumn("High"))?;
    let low = low.ok_or(AnalyticsError::MissingColumn("Low"))?;
    let close = close.ok_or(AnalyticsError::MissingColumn("Close"))?;
    let volume = volume.ok_or(AnalyticsError::MissingColumn("Volume"))?;

    let candles = raw
        .dates
        .iter()
        .enumerate()
        .map(|(i, &date)| Candle {
            date,
            open: open[i],
            high: high[i],
            low: low[i],
            close: close[i],
            volume: volume[i],
        })
        .collect();

    Ok(NormalizedTable { candles, extras })
}

/// Lowercased `_`-prefix of a column name; the part before any ticker
/// suffix. "adj close" survives as a whole because the separator there
/// is a space, not an underscore.
fn canonical_base(name: &str) -> String {
    let trimmed = name.trim().to_lowercase();
    match trimmed.split_once('_') {
        // "adj_close" splits into a prefix that is itself meaningful
        Some(("adj", rest)) if rest.starts_with("close") => "adj_close".to_string(),
        Some((prefix, _)) => prefix.to_string(),
        None => trimmed,
    }
}

fn capitalize(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => lower,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dates(n: usize) -> Vec<NaiveDate> {
        (0..n)
            .map(|i| NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(i as u64))
            .collect()
    }

    fn full_table() -> RawTable {
        let mut table = RawTable::new(dates(2));
        table.push_column("Open_BTC-USD", vec![1.0, 2.0]);
        table.push_column("High_BTC-USD", vec![3.0, 4.0]);
        table.push_column("Low_BTC-USD", vec![0.5, 1.5]);
        table.push_column("Close_BTC-USD", vec![2.0, 3.0]);
        table.push_column("Volume_BTC-USD", vec![10.0, 20.0]);
        table
    }

    #[test]
    fn test_normalize_ticker_suffixed_columns() {
        let normalized = normalize_table(&full_table()).unwrap();
        assert_eq!(normalized.candles.len(), 2);
        assert_eq!(normalized.candles[0].close, 2.0);
        assert_eq!(normalized.candles[1].volume, 20.0);
        assert!(normalized.extras.is_empty());
    }

    #[test]
    fn test_normalize_case_insensitive() {
        let mut table = RawTable::new(dates(1));
        table.push_column("OPEN", vec![1.0]);
        table.push_column("high", vec![2.0]);
        table.push_column("Low", vec![0.5]);
        table.push_column("cLoSe", vec![1.5]);
        table.push_column("VOLUME", vec![5.0]);
        let normalized = normalize_table(&table).unwrap();
        assert_eq!(normalized.candles[0].open, 1.0);
        assert_eq!(normalized.candles[0].close, 1.5);
    }

    #[test]
    fn test_adjusted_close_resolves_to_close() {
        let mut table = RawTable::new(dates(1));
        table.push_column("Open", vec![1.0]);
        table.push_column("High", vec![2.0]);
        table.push_column("Low", vec![0.5]);
        table.push_column("Adj Close", vec![1.7]);
        table.push_column("Volume", vec![5.0]);
        let normalized = normalize_table(&table).unwrap();
        assert_eq!(normalized.candles[0].close, 1.7);
    }

    #[test]
    fn test_first_close_wins_on_duplicates() {
        let mut table = RawTable::new(dates(1));
        table.push_column("Open", vec![1.0]);
        table.push_column("High", vec![2.0]);
        table.push_column("Low", vec![0.5]);
        table.push_column("Close", vec![1.5]);
        table.push_column("Adj_Close", vec![1.7]);
        table.push_column("Volume", vec![5.0]);
        let normalized = normalize_table(&table).unwrap();
        assert_eq!(normalized.candles[0].close, 1.5);
    }

    #[test]
    fn test_missing_column_is_reported() {
        let mut table = RawTable::new(dates(1));
        table.push_column("Open", vec![1.0]);
        table.push_column("High", vec![2.0]);
        table.push_column("Low", vec![0.5]);
        table.push_column("Close", vec![1.5]);
        let err = normalize_table(&table).unwrap_err();
        assert!(matches!(err, AnalyticsError::MissingColumn("Volume")));
    }

    #[test]
    fn test_empty_table_is_rejected() {
        let table = RawTable::default();
        assert!(matches!(
            normalize_table(&table),
            Err(AnalyticsError::EmptyTable)
        ));
    }

    #[test]
    fn test_extras_pass_through_capitalized() {
        let mut table = full_table();
        table.push_column("market_cap", vec![100.0, 200.0]);
        let normalized = normalize_table(&table).unwrap();
        assert_eq!(normalized.extras.len(), 1);
        assert_eq!(normalized.extras[0].name, "Market_cap");
    }
}
