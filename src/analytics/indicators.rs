//! Technical indicator derivation over daily OHLCV candles.
//!
//! `compute_indicators` is a pure transform: it never mutates its input
//! and produces one output row per input candle, in the same order.
//! Cells are `None` during an indicator's warm-up and wherever a zero
//! denominator makes the value undefined; no numeric edge case raises.

use super::AnalyticsError;
use crate::types::{Candle, IndicatorParams, IndicatorRow, IndicatorTable};

/// Derive the full indicator table from a candle series.
pub fn compute_indicators(
    params: IndicatorParams,
    candles: &[Candle],
) -> Result<IndicatorTable, AnalyticsError> {
    if candles.is_empty() {
        return Err(AnalyticsError::EmptyTable);
    }

    let close: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let high: Vec<f64> = candles.iter().map(|c| c.high).collect();
    let low: Vec<f64> = candles.iter().map(|c| c.low).collect();

    let sma_short = rolling_mean(&close, params.sma_short);
    let sma_long = rolling_mean(&close, params.sma_long);

    let rsi = compute_rsi(&close, params.rsi_period);

    // MACD: unadjusted EMA recursion seeded at the first value.
    let ema_fast = ewm_span(&close, params.macd_fast);
    let ema_slow = ewm_span(&close, params.macd_slow);
    let macd: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| f - s)
        .collect();
    let macd_signal = ewm_span(&macd, params.macd_signal);
    let macd_hist: Vec<f64> = macd
        .iter()
        .zip(&macd_signal)
        .map(|(m, s)| m - s)
        .collect();

    // Bollinger bands: sample standard deviation over the window.
    let bb_middle = rolling_mean(&close, params.bb_period);
    let bb_std = rolling_std(&close, params.bb_period);
    let bb_upper: Vec<Option<f64>> = bb_middle
        .iter()
        .zip(&bb_std)
        .map(|(&m, &s)| Some(m? + s? * params.bb_std))
        .collect();
    let bb_lower: Vec<Option<f64>> = bb_middle
        .iter()
        .zip(&bb_std)
        .map(|(&m, &s)| Some(m? - s? * params.bb_std))
        .collect();

    let (stoch_k, stoch_d) = compute_stochastic(&close, &high, &low, params.stoch_k, params.stoch_d);

    let atr = compute_atr(&close, &high, &low, params.atr_period);
    let obv = compute_obv(&close, candles);
    let cci = compute_cci(&close, &high, &low, params.bb_period);

    let rows = candles
        .iter()
        .enumerate()
        .map(|(i, c)| IndicatorRow {
            date: c.date,
            open: c.open,
            high: c.high,
            low: c.low,
            close: c.close,
            volume: c.volume,
            sma_short: sma_short[i],
            sma_long: sma_long[i],
            rsi: rsi[i],
            macd: Some(macd[i]),
            macd_signal: Some(macd_signal[i]),
            macd_hist: Some(macd_hist[i]),
            bb_upper: bb_upper[i],
            bb_middle: bb_middle[i],
            bb_lower: bb_lower[i],
            stoch_k: stoch_k[i],
            stoch_d: stoch_d[i],
            atr: Some(atr[i]),
            obv: Some(obv[i]),
            cci: cci[i],
            sentiment: 0.0,
        })
        .collect();

    Ok(IndicatorTable { params, rows })
}

/// Wilder-smoothed RSI.
///
/// Average gain/loss use the adjusted exponential weighted mean with
/// `com = period - 1`, first defined once `period` price changes have
/// accumulated. A zero average loss with positive average gain pins RSI
/// at 100; both zero leaves the cell undefined.
fn compute_rsi(close: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = close.len();
    let mut rsi = vec![None; n];
    if n < 2 || period == 0 {
        return rsi;
    }

    let mut gains = Vec::with_capacity(n - 1);
    let mut losses = Vec::with_capacity(n - 1);
    for i in 1..n {
        let change = close[i] - close[i - 1];
        gains.push(change.max(0.0));
        losses.push((-change).max(0.0));
    }

    let com = (period - 1) as f64;
    let avg_gain = ewm_com_adjusted(&gains, com, period);
    let avg_loss = ewm_com_adjusted(&losses, com, period);

    for i in 0..gains.len() {
        let (Some(gain), Some(loss)) = (avg_gain[i], avg_loss[i]) else {
            continue;
        };
        let value = if loss == 0.0 {
            if gain > 0.0 {
                Some(100.0)
            } else {
                None
            }
        } else {
            let rs = gain / loss;
            Some(100.0 - 100.0 / (1.0 + rs))
        };
        rsi[i + 1] = value;
    }

    rsi
}

/// Stochastic oscillator fast and slow lines.
///
/// %K = 100 * (Close - min(Low, k)) / (max(High, k) - min(Low, k)); a
/// flat range leaves %K undefined. %D is the simple moving average of
/// %K over the D window and requires a full window of defined %K values.
fn compute_stochastic(
    close: &[f64],
    high: &[f64],
    low: &[f64],
    k_period: usize,
    d_period: usize,
) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    let low_min = rolling_min(low, k_period);
    let high_max = rolling_max(high, k_period);

    let stoch_k: Vec<Option<f64>> = close
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let (ll, hh) = (low_min[i]?, high_max[i]?);
            let range = hh - ll;
            if range == 0.0 {
                None
            } else {
                Some(100.0 * (c - ll) / range)
            }
        })
        .collect();

    let stoch_d = rolling_mean_opt(&stoch_k, d_period);
    (stoch_k, stoch_d)
}

/// Average true range via the unadjusted exponential recursion with
/// `alpha = 1 / period`. The first row's true range has no prior close
/// and falls back to the high-low span.
fn compute_atr(close: &[f64], high: &[f64], low: &[f64], period: usize) -> Vec<f64> {
    let n = close.len();
    let mut tr = Vec::with_capacity(n);
    for i in 0..n {
        let span = high[i] - low[i];
        let range = if i == 0 {
            span
        } else {
            let prev_close = close[i - 1];
            span.max((high[i] - prev_close).abs())
                .max((low[i] - prev_close).abs())
        };
        tr.push(range);
    }

    let alpha = 1.0 / period.max(1) as f64;
    ewm_alpha(&tr, alpha)
}

/// On-balance volume: cumulative signed volume. The first row has no
/// prior close and contributes zero, so OBV starts at 0.
fn compute_obv(close: &[f64], candles: &[Candle]) -> Vec<f64> {
    let mut obv = Vec::with_capacity(close.len());
    let mut running = 0.0;
    for (i, candle) in candles.iter().enumerate() {
        if i > 0 {
            if close[i] > close[i - 1] {
                running += candle.volume;
            } else if close[i] < close[i - 1] {
                running -= candle.volume;
            }
        }
        obv.push(running);
    }
    obv
}

/// Commodity channel index from typical-price deviation.
///
/// The mean deviation is the mean absolute deviation of the window's
/// typical prices around that window's own mean; zero deviation leaves
/// the cell undefined.
fn compute_cci(close: &[f64], high: &[f64], low: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = close.len();
    let tp: Vec<f64> = (0..n).map(|i| (high[i] + low[i] + close[i]) / 3.0).collect();
    let sma_tp = rolling_mean(&tp, period);

    (0..n)
        .map(|i| {
            let mean = sma_tp[i]?;
            let window = &tp[i + 1 - period..=i];
            let mad = window.iter().map(|v| (v - mean).abs()).sum::<f64>() / period as f64;
            if mad == 0.0 {
                None
            } else {
                Some((tp[i] - mean) / (0.015 * mad))
            }
        })
        .collect()
}

// Rolling and exponential kernels. All return one entry per input value.

fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let n = values.len();
    let mut out = vec![None; n];
    if window == 0 || window > n {
        return out;
    }
    let mut sum: f64 = values[..window].iter().sum();
    out[window - 1] = Some(sum / window as f64);
    for i in window..n {
        sum += values[i] - values[i - window];
        out[i] = Some(sum / window as f64);
    }
    out
}

/// Rolling sample standard deviation (ddof = 1). Windows shorter than
/// two have no sample variance and stay undefined.
fn rolling_std(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let n = values.len();
    let mut out = vec![None; n];
    if window < 2 || window > n {
        return out;
    }
    for i in (window - 1)..n {
        let slice = &values[i + 1 - window..=i];
        let mean = slice.iter().sum::<f64>() / window as f64;
        let variance =
            slice.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (window - 1) as f64;
        out[i] = Some(variance.sqrt());
    }
    out
}

fn rolling_min(values: &[f64], window: usize) -> Vec<Option<f64>> {
    rolling_fold(values, window, f64::INFINITY, f64::min)
}

fn rolling_max(values: &[f64], window: usize) -> Vec<Option<f64>> {
    rolling_fold(values, window, f64::NEG_INFINITY, f64::max)
}

fn rolling_fold(
    values: &[f64],
    window: usize,
    init: f64,
    fold: fn(f64, f64) -> f64,
) -> Vec<Option<f64>> {
    let n = values.len();
    let mut out = vec![None; n];
    if window == 0 || window > n {
        return out;
    }
    for i in (window - 1)..n {
        let acc = values[i + 1 - window..=i].iter().copied().fold(init, fold);
        out[i] = Some(acc);
    }
    out
}

/// Rolling mean over an already-gapped series; defined only where the
/// whole window is defined.
fn rolling_mean_opt(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let n = values.len();
    let mut out = vec![None; n];
    if window == 0 || window > n {
        return out;
    }
    for i in (window - 1)..n {
        let slice = &values[i + 1 - window..=i];
        if slice.iter().all(|v| v.is_some()) {
            let sum: f64 = slice.iter().map(|v| v.unwrap()).sum();
            out[i] = Some(sum / window as f64);
        }
    }
    out
}

/// Unadjusted exponential weighted mean with span-derived alpha,
/// seeded at the first value.
fn ewm_span(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    ewm_alpha(values, alpha)
}

fn ewm_alpha(values: &[f64], alpha: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut ema = match values.first() {
        Some(&first) => first,
        None => return out,
    };
    out.push(ema);
    for &value in &values[1..] {
        ema = alpha * value + (1.0 - alpha) * ema;
        out.push(ema);
    }
    out
}

/// Adjusted exponential weighted mean with `alpha = 1 / (1 + com)`:
/// a finite weighted average over all values seen so far, undefined
/// until `min_periods` observations have accumulated.
fn ewm_com_adjusted(values: &[f64], com: f64, min_periods: usize) -> Vec<Option<f64>> {
    let alpha = 1.0 / (1.0 + com);
    let decay = 1.0 - alpha;
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    values
        .iter()
        .enumerate()
        .map(|(i, &value)| {
            numerator = value + decay * numerator;
            denominator = 1.0 + decay * denominator;
            if i + 1 >= min_periods.max(1) {
                Some(numerator / denominator)
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_candles(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(i as u64),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1_000.0,
            })
            .collect()
    }

    fn rising_candles(count: usize) -> Vec<Candle> {
        let closes: Vec<f64> = (0..count).map(|i| 100.0 + i as f64).collect();
        make_candles(&closes)
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let result = compute_indicators(IndicatorParams::default(), &[]);
        assert!(matches!(result, Err(AnalyticsError::EmptyTable)));
    }

    #[test]
    fn test_row_count_and_order_preserved() {
        let candles = rising_candles(50);
        let table = compute_indicators(IndicatorParams::default(), &candles).unwrap();
        assert_eq!(table.len(), 50);
        for (row, candle) in table.rows.iter().zip(&candles) {
            assert_eq!(row.date, candle.date);
            assert_eq!(row.close, candle.close);
        }
    }

    #[test]
    fn test_sma_warm_up_counts() {
        let candles = rising_candles(30);
        let table = compute_indicators(IndicatorParams::default(), &candles).unwrap();
        let defined_long = table.rows.iter().filter(|r| r.sma_long.is_some()).count();
        // rows - long_window + 1 trailing rows are defined
        assert_eq!(defined_long, 30 - 20 + 1);
        assert!(table.rows[18].sma_long.is_none());
        assert!(table.rows[19].sma_long.is_some());
        assert!(table.rows[3].sma_short.is_none());
        assert!(table.rows[4].sma_short.is_some());
    }

    #[test]
    fn test_sma_values_match_window_mean() {
        let candles = make_candles(&[10.0, 20.0, 30.0, 40.0, 50.0, 60.0]);
        let mut params = IndicatorParams::default();
        params.sma_short = 3;
        let table = compute_indicators(params, &candles).unwrap();
        assert!((table.rows[2].sma_short.unwrap() - 20.0).abs() < 1e-9);
        assert!((table.rows[5].sma_short.unwrap() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_rsi_warm_up_and_bounds() {
        let candles = rising_candles(40);
        let table = compute_indicators(IndicatorParams::default(), &candles).unwrap();
        assert!(table.rows[13].rsi.is_none());
        assert!(table.rows[14].rsi.is_some());
        for row in &table.rows {
            if let Some(rsi) = row.rsi {
                assert!((0.0..=100.0).contains(&rsi), "RSI out of range: {}", rsi);
            }
        }
    }

    #[test]
    fn test_rsi_is_100_with_no_losses() {
        let candles = rising_candles(40);
        let table = compute_indicators(IndicatorParams::default(), &candles).unwrap();
        let last_rsi = table.rows.last().unwrap().rsi.unwrap();
        assert!((last_rsi - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_rsi_undefined_on_flat_series() {
        let candles = make_candles(&[100.0; 40]);
        let table = compute_indicators(IndicatorParams::default(), &candles).unwrap();
        // no gains and no losses: 0/0 stays undefined
        assert!(table.rows.iter().all(|r| r.rsi.is_none()));
    }

    #[test]
    fn test_macd_hist_is_macd_minus_signal() {
        let candles = rising_candles(60);
        let table = compute_indicators(IndicatorParams::default(), &candles).unwrap();
        for row in &table.rows {
            let (macd, signal, hist) = (
                row.macd.unwrap(),
                row.macd_signal.unwrap(),
                row.macd_hist.unwrap(),
            );
            assert!((hist - (macd - signal)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_bollinger_band_ordering() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        let candles = make_candles(&closes);
        let table = compute_indicators(IndicatorParams::default(), &candles).unwrap();
        let mut seen = 0;
        for row in &table.rows {
            if let (Some(upper), Some(middle), Some(lower)) =
                (row.bb_upper, row.bb_middle, row.bb_lower)
            {
                assert!(lower <= middle && middle <= upper);
                seen += 1;
            }
        }
        assert_eq!(seen, 60 - 20 + 1);
    }

    #[test]
    fn test_stochastic_bounds_and_flat_range() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64 * 0.9).cos() * 3.0).collect();
        let candles = make_candles(&closes);
        let table = compute_indicators(IndicatorParams::default(), &candles).unwrap();
        for row in &table.rows {
            if let Some(k) = row.stoch_k {
                assert!((0.0..=100.0).contains(&k));
            }
            if let Some(d) = row.stoch_d {
                assert!((0.0..=100.0).contains(&d));
            }
        }

        // flat candles: high == low across every window
        let flat: Vec<Candle> = (0..30)
            .map(|i| Candle {
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(i as u64),
                open: 100.0,
                high: 100.0,
                low: 100.0,
                close: 100.0,
                volume: 1_000.0,
            })
            .collect();
        let table = compute_indicators(IndicatorParams::default(), &flat).unwrap();
        assert!(table.rows.iter().all(|r| r.stoch_k.is_none()));
        assert!(table.rows.iter().all(|r| r.stoch_d.is_none()));
    }

    #[test]
    fn test_atr_positive_for_nonzero_ranges() {
        let candles = rising_candles(30);
        let table = compute_indicators(IndicatorParams::default(), &candles).unwrap();
        for row in &table.rows {
            assert!(row.atr.unwrap() > 0.0);
        }
    }

    #[test]
    fn test_obv_signed_accumulation() {
        let candles = make_candles(&[100.0, 101.0, 100.5, 100.5, 102.0]);
        let table = compute_indicators(IndicatorParams::default(), &candles).unwrap();
        let obv: Vec<f64> = table.rows.iter().map(|r| r.obv.unwrap()).collect();
        // starts at zero, +1000 on the rise, -1000 on the fall, flat on
        // an unchanged close, +1000 on the final rise
        assert_eq!(obv, vec![0.0, 1_000.0, 0.0, 0.0, 1_000.0]);
    }

    #[test]
    fn test_cci_undefined_on_constant_series() {
        let candles: Vec<Candle> = (0..30)
            .map(|i| Candle {
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(i as u64),
                open: 100.0,
                high: 100.0,
                low: 100.0,
                close: 100.0,
                volume: 1_000.0,
            })
            .collect();
        let table = compute_indicators(IndicatorParams::default(), &candles).unwrap();
        assert!(table.rows.iter().all(|r| r.cci.is_none()));
    }

    #[test]
    fn test_cci_warm_up_is_window_minus_one() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + (i as f64 * 1.3).sin() * 4.0).collect();
        let candles = make_candles(&closes);
        let table = compute_indicators(IndicatorParams::default(), &candles).unwrap();
        assert!(table.rows[18].cci.is_none());
        assert!(table.rows[19].cci.is_some());
    }

    #[test]
    fn test_input_not_mutated() {
        let candles = rising_candles(25);
        let snapshot = candles.clone();
        let _ = compute_indicators(IndicatorParams::default(), &candles).unwrap();
        assert_eq!(candles, snapshot);
    }

    #[test]
    fn test_ewm_com_adjusted_matches_weighted_average() {
        // com = 1 -> alpha = 0.5; adjusted mean of [1, 2] is
        // (2 + 0.5 * 1) / (1 + 0.5)
        let out = ewm_com_adjusted(&[1.0, 2.0], 1.0, 1);
        assert!((out[0].unwrap() - 1.0).abs() < 1e-12);
        assert!((out[1].unwrap() - (2.5 / 1.5)).abs() < 1e-12);
    }

    #[test]
    fn test_rolling_std_sample_convention() {
        // sample std of [1, 2, 3] is 1
        let out = rolling_std(&[1.0, 2.0, 3.0], 3);
        assert!((out[2].unwrap() - 1.0).abs() < 1e-12);
    }
}
