//! Joining per-day sentiment scores onto the indicator table.

use crate::types::{DailySentiment, IndicatorTable};
use std::collections::HashMap;

/// Left-join sentiment scores onto the indicator table by calendar date.
///
/// Rows keep their order and count; a row with no matching sentiment
/// date gets a neutral 0.0. When the sentiment source carries several
/// scores for one day the last one wins, so the merge stays
/// deterministic. An empty sentiment series leaves every row neutral.
pub fn merge_sentiment(table: &IndicatorTable, sentiment: &[DailySentiment]) -> IndicatorTable {
    let by_date: HashMap<_, _> = sentiment.iter().map(|s| (s.date, s.score)).collect();

    let mut merged = table.clone();
    for row in &mut merged.rows {
        row.sentiment = by_date.get(&row.date).copied().unwrap_or(0.0);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::compute_indicators;
    use crate::types::{Candle, IndicatorParams};
    use chrono::NaiveDate;

    fn day(i: u64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap() + chrono::Days::new(i)
    }

    fn table(rows: usize) -> IndicatorTable {
        let candles: Vec<Candle> = (0..rows)
            .map(|i| Candle {
                date: day(i as u64),
                open: 100.0,
                high: 101.0,
                low: 99.0,
                close: 100.0 + i as f64,
                volume: 1_000.0,
            })
            .collect();
        compute_indicators(IndicatorParams::default(), &candles).unwrap()
    }

    #[test]
    fn test_merge_preserves_row_count_and_order() {
        let table = table(10);
        let sentiment = vec![DailySentiment {
            date: day(3),
            score: 0.5,
        }];
        let merged = merge_sentiment(&table, &sentiment);
        assert_eq!(merged.len(), table.len());
        for (a, b) in merged.rows.iter().zip(&table.rows) {
            assert_eq!(a.date, b.date);
        }
    }

    #[test]
    fn test_missing_dates_default_to_neutral() {
        let table = table(6);
        let sentiment = vec![
            DailySentiment {
                date: day(0),
                score: 0.8,
            },
            DailySentiment {
                date: day(2),
                score: -0.3,
            },
        ];
        let merged = merge_sentiment(&table, &sentiment);
        assert_eq!(merged.rows[0].sentiment, 0.8);
        assert_eq!(merged.rows[1].sentiment, 0.0);
        assert_eq!(merged.rows[2].sentiment, -0.3);
        assert!(merged.rows[3..].iter().all(|r| r.sentiment == 0.0));
    }

    #[test]
    fn test_duplicate_dates_last_wins() {
        let table = table(3);
        let sentiment = vec![
            DailySentiment {
                date: day(1),
                score: 0.2,
            },
            DailySentiment {
                date: day(1),
                score: -0.6,
            },
        ];
        let merged = merge_sentiment(&table, &sentiment);
        assert_eq!(merged.rows[1].sentiment, -0.6);
    }

    #[test]
    fn test_empty_sentiment_leaves_all_neutral() {
        let table = table(4);
        let merged = merge_sentiment(&table, &[]);
        assert!(merged.rows.iter().all(|r| r.sentiment == 0.0));
    }

    #[test]
    fn test_input_table_untouched() {
        let table = table(4);
        let sentiment = vec![DailySentiment {
            date: day(0),
            score: 1.0,
        }];
        let _ = merge_sentiment(&table, &sentiment);
        assert!(table.rows.iter().all(|r| r.sentiment == 0.0));
    }
}
