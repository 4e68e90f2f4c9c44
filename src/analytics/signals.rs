//! Per-indicator classification and majority-vote aggregation.

use super::AnalyticsError;
use crate::types::{
    CompositeSignal, IndicatorRow, IndicatorSignal, IndicatorTable, SignalMap, SignalSummary,
    TrendNarrative,
};

/// Classify the most recent fully-defined row and combine the five
/// indicator votes into a composite signal.
///
/// Rows with any undefined indicator cell are skipped; when none
/// remains the aggregation fails with insufficient data. The trend
/// narrative is derived independently from the last two rows with
/// defined SMAs and does not participate in the vote.
pub fn summarize_signals(table: &IndicatorTable) -> Result<SignalSummary, AnalyticsError> {
    let last = table.last_complete_row().ok_or_else(|| {
        AnalyticsError::InsufficientHistory(
            "no row with all indicators defined".to_string(),
        )
    })?;

    let signals = classify_row(last);
    let composite = majority_vote(&signals);
    let trend = trend_narrative(table);

    Ok(SignalSummary {
        signals,
        composite,
        composite_label: composite.label().to_string(),
        trend,
        trend_message: trend.map(|t| t.message().to_string()),
    })
}

/// Fixed-threshold classification of one fully-defined row.
fn classify_row(row: &IndicatorRow) -> SignalMap {
    SignalMap {
        sma: classify_sma(row.sma_short.unwrap_or(0.0), row.sma_long.unwrap_or(0.0)),
        rsi: classify_rsi(row.rsi.unwrap_or(50.0)),
        macd: classify_macd(row.macd.unwrap_or(0.0), row.macd_signal.unwrap_or(0.0)),
        stoch: classify_stochastic(row.stoch_k.unwrap_or(50.0), row.stoch_d.unwrap_or(50.0)),
        cci: classify_cci(row.cci.unwrap_or(0.0)),
    }
}

fn classify_sma(short: f64, long: f64) -> IndicatorSignal {
    if short > long {
        IndicatorSignal::Buy
    } else if short < long {
        IndicatorSignal::Sell
    } else {
        IndicatorSignal::Neutral
    }
}

/// RSI above 70 is overbought, below 30 oversold.
fn classify_rsi(rsi: f64) -> IndicatorSignal {
    if rsi > 70.0 {
        IndicatorSignal::Sell
    } else if rsi < 30.0 {
        IndicatorSignal::Buy
    } else {
        IndicatorSignal::Neutral
    }
}

fn classify_macd(macd: f64, signal: f64) -> IndicatorSignal {
    if macd > signal {
        IndicatorSignal::Buy
    } else if macd < signal {
        IndicatorSignal::Sell
    } else {
        IndicatorSignal::Neutral
    }
}

/// Stochastic needs both the extreme zone and the cross direction:
/// overbought with %K below %D sells, oversold with %K above %D buys.
fn classify_stochastic(k: f64, d: f64) -> IndicatorSignal {
    if k > 80.0 && k < d {
        IndicatorSignal::Sell
    } else if k < 20.0 && k > d {
        IndicatorSignal::Buy
    } else {
        IndicatorSignal::Neutral
    }
}

fn classify_cci(cci: f64) -> IndicatorSignal {
    if cci > 100.0 {
        IndicatorSignal::Buy
    } else if cci < -100.0 {
        IndicatorSignal::Sell
    } else {
        IndicatorSignal::Neutral
    }
}

/// Majority vote; ties, including zero-zero, resolve to neutral.
fn majority_vote(signals: &SignalMap) -> CompositeSignal {
    let buys = signals.buy_count();
    let sells = signals.sell_count();
    if buys > sells {
        CompositeSignal::StrongBuy
    } else if sells > buys {
        CompositeSignal::StrongSell
    } else {
        CompositeSignal::Neutral
    }
}

/// Golden/dead cross detection over the last two rows with both SMAs
/// defined; a steady-state trend otherwise. None with fewer than two
/// such rows.
fn trend_narrative(table: &IndicatorTable) -> Option<TrendNarrative> {
    let mut defined = table
        .rows
        .iter()
        .rev()
        .filter_map(|r| Some((r.sma_short?, r.sma_long?)));
    let (last_short, last_long) = defined.next()?;
    let (prev_short, prev_long) = defined.next()?;

    let narrative = if last_short > last_long && prev_short <= prev_long {
        TrendNarrative::GoldenCross
    } else if last_short < last_long && prev_short >= prev_long {
        TrendNarrative::DeadCross
    } else if last_short > last_long {
        TrendNarrative::Uptrend
    } else {
        TrendNarrative::Downtrend
    };
    Some(narrative)
}
