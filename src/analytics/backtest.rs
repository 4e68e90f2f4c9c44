//! SMA crossover backtest against buy-and-hold.

use super::AnalyticsError;
use crate::types::{BacktestReport, EquityPoint, IndicatorTable};

/// Default starting capital for both equity curves.
pub const DEFAULT_INITIAL_CAPITAL: f64 = 10_000.0;

/// Replay the SMA crossover strategy over the indicator table.
///
/// The strategy holds a long position whenever the short SMA is above
/// the long SMA, with the position taking effect on the following day.
/// Rows where either SMA or the close is undefined are dropped before
/// the replay; fewer remaining rows than the long window is an
/// insufficient-history error. Both the strategy and the buy-and-hold
/// benchmark compound daily returns from the same starting capital.
pub fn run_sma_backtest(
    table: &IndicatorTable,
    initial_capital: f64,
) -> Result<BacktestReport, AnalyticsError> {
    let rows: Vec<_> = table
        .rows
        .iter()
        .filter(|r| r.sma_short.is_some() && r.sma_long.is_some())
        .collect();

    if rows.len() < table.params.sma_long {
        return Err(AnalyticsError::InsufficientHistory(format!(
            "{} usable rows, need at least {} for the crossover backtest",
            rows.len(),
            table.params.sma_long
        )));
    }

    let mut strategy_value = initial_capital;
    let mut benchmark_value = initial_capital;
    let mut equity_curve = Vec::with_capacity(rows.len());

    equity_curve.push(EquityPoint {
        date: rows[0].date,
        strategy: strategy_value,
        benchmark: benchmark_value,
    });

    for i in 1..rows.len() {
        let daily_return = rows[i].close / rows[i - 1].close - 1.0;

        // yesterday's signal decides today's exposure
        let prev = rows[i - 1];
        let held = prev.sma_short.unwrap_or(0.0) > prev.sma_long.unwrap_or(0.0);
        if held {
            strategy_value *= 1.0 + daily_return;
        }
        benchmark_value *= 1.0 + daily_return;

        equity_curve.push(EquityPoint {
            date: rows[i].date,
            strategy: strategy_value,
            benchmark: benchmark_value,
        });
    }

    Ok(BacktestReport {
        strategy_return_pct: (strategy_value / initial_capital - 1.0) * 100.0,
        benchmark_return_pct: (benchmark_value / initial_capital - 1.0) * 100.0,
        initial_capital,
        equity_curve,
    })
}
