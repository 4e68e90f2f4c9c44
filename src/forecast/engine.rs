//! The forecasting procedure: feature extraction, scaling, windowing,
//! train-or-load, and iterative rollout.

use super::checkpoint::{Checkpoint, CheckpointStore};
use super::lstm::{LstmConfig, LstmNetwork};
use super::scaler::MinMaxScaler;
use crate::types::{Forecast, ForecastPoint, IndicatorTable};
use chrono::Days;
use ndarray::{s, Array2, Array3};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Number of feature columns fed to the sequence model.
pub const FEATURE_COUNT: usize = 16;

/// Model and training hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastConfig {
    /// Trailing rows fed as model input per prediction step.
    pub lookback: usize,
    /// Hidden width of each LSTM layer.
    pub hidden_size: usize,
    /// Number of stacked LSTM layers.
    pub num_layers: usize,
    /// Inter-layer dropout probability during training.
    pub dropout: f64,
    /// Passes over the windowed training set.
    pub epochs: usize,
    pub learning_rate: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            lookback: 60,
            hidden_size: 50,
            num_layers: 2,
            dropout: 0.2,
            epochs: 3,
            learning_rate: 0.01,
        }
    }
}

/// Produces closing-price forecasts from an indicator table.
pub struct ForecastEngine {
    config: ForecastConfig,
    store: CheckpointStore,
}

impl ForecastEngine {
    pub fn new(config: ForecastConfig, store: CheckpointStore) -> Self {
        Self { config, store }
    }

    /// Forecast the next `days_to_predict` closing prices.
    ///
    /// Rows with any undefined feature are excluded up front. When
    /// fewer than `lookback + days_to_predict + 1` usable rows remain
    /// the result is a soft "insufficient data" outcome with an empty
    /// point list, never an error. A fingerprint-matched checkpoint is
    /// reused along with its persisted scaler; otherwise a fresh model
    /// is trained on everything except the final `days_to_predict`
    /// rows and saved.
    pub fn forecast(&self, table: &IndicatorTable, days_to_predict: usize) -> Forecast {
        if days_to_predict == 0 {
            return Forecast {
                status: "nothing to predict".to_string(),
                points: Vec::new(),
            };
        }

        let lookback = self.config.lookback;
        let complete: Vec<_> = table.rows.iter().filter(|r| r.is_complete()).collect();
        let n_rows = complete.len();

        // the final horizon rows are held out of both scaler fit and
        // training, so at least one training window must fit before them
        if n_rows < lookback + days_to_predict + 1 {
            return Forecast::insufficient_data();
        }

        let mut matrix = Array2::zeros((n_rows, FEATURE_COUNT));
        for (i, row) in complete.iter().enumerate() {
            let features = [
                row.close,
                row.volume,
                row.sma_short.unwrap_or(0.0),
                row.sma_long.unwrap_or(0.0),
                row.rsi.unwrap_or(0.0),
                row.macd.unwrap_or(0.0),
                row.macd_signal.unwrap_or(0.0),
                row.bb_upper.unwrap_or(0.0),
                row.bb_middle.unwrap_or(0.0),
                row.bb_lower.unwrap_or(0.0),
                row.stoch_k.unwrap_or(0.0),
                row.stoch_d.unwrap_or(0.0),
                row.atr.unwrap_or(0.0),
                row.obv.unwrap_or(0.0),
                row.cci.unwrap_or(0.0),
                row.sentiment,
            ];
            for (j, value) in features.into_iter().enumerate() {
                matrix[[i, j]] = value;
            }
        }

        let train_rows = n_rows - days_to_predict;
        let key = CheckpointStore::fingerprint(
            &feature_signature(table),
            lookback,
            train_rows,
            complete[0].date,
            complete[train_rows - 1].date,
        );

        let Checkpoint { scaler, model } = match self.store.load(&key) {
            Some(checkpoint) => checkpoint,
            None => {
                let checkpoint = self.train_checkpoint(&matrix, train_rows, days_to_predict);
                if let Err(e) = self.store.save(&key, &checkpoint) {
                    warn!("Failed to persist forecast checkpoint: {}", e);
                }
                checkpoint
            }
        };

        let scaled = scaler.transform(matrix.view());

        // roll the window forward one synthetic day at a time; every
        // feature except Close stays frozen at its last observed value
        let mut window = scaled.slice(s![n_rows - lookback.., ..]).to_owned();
        let mut predictions = Vec::with_capacity(days_to_predict);
        for _ in 0..days_to_predict {
            let predicted = model.forward(window.view());
            predictions.push(predicted);

            // shift the window up one row; the vacated last row keeps
            // its feature values and takes the predicted close
            for t in 0..lookback - 1 {
                let next = window.row(t + 1).to_owned();
                window.row_mut(t).assign(&next);
            }
            window[[lookback - 1, 0]] = predicted;
        }

        let last_date = complete[n_rows - 1].date;
        let points = predictions
            .iter()
            .enumerate()
            .map(|(i, &scaled_close)| ForecastPoint {
                date: last_date + Days::new(i as u64 + 1),
                close: scaler.inverse_value(0, scaled_close),
            })
            .collect();

        Forecast {
            status: "forecast complete".to_string(),
            points,
        }
    }

    /// Fit the scaler on the pre-horizon rows, build supervised
    /// windows over them, and train a fresh network.
    fn train_checkpoint(
        &self,
        matrix: &Array2<f64>,
        train_rows: usize,
        days_to_predict: usize,
    ) -> Checkpoint {
        let lookback = self.config.lookback;

        // the scaler never sees the rows it will later predict across
        let scaler = MinMaxScaler::fit(matrix.slice(s![..train_rows, ..]));
        let scaled_train = scaler.transform(matrix.slice(s![..train_rows, ..]));

        let n_windows = train_rows - lookback;
        let mut x = Array3::zeros((n_windows, lookback, FEATURE_COUNT));
        let mut y = ndarray::Array1::zeros(n_windows);
        for w in 0..n_windows {
            x.slice_mut(s![w, .., ..])
                .assign(&scaled_train.slice(s![w..w + lookback, ..]));
            y[w] = scaled_train[[w + lookback, 0]];
        }

        info!(
            "Training forecast model: {} windows of {} rows, horizon {}",
            n_windows, lookback, days_to_predict
        );

        let mut model = LstmNetwork::new(LstmConfig {
            input_size: FEATURE_COUNT,
            hidden_size: self.config.hidden_size,
            num_layers: self.config.num_layers,
            dropout: self.config.dropout,
        });
        model.train(&x, y.view(), self.config.epochs, self.config.learning_rate);

        Checkpoint { scaler, model }
    }
}

/// The feature-set signature used for checkpoint fingerprinting. SMA
/// names carry their windows so parameter changes key new checkpoints.
fn feature_signature(table: &IndicatorTable) -> Vec<String> {
    let params = &table.params;
    vec![
        "Close".to_string(),
        "Volume".to_string(),
        format!("SMA{}", params.sma_short),
        format!("SMA{}", params.sma_long),
        "RSI".to_string(),
        "MACD".to_string(),
        "MACD_Signal".to_string(),
        "BB_Upper".to_string(),
        "BB_Middle".to_string(),
        "BB_Lower".to_string(),
        "Stoch_%K".to_string(),
        "Stoch_%D".to_string(),
        "ATR".to_string(),
        "OBV".to_string(),
        "CCI".to_string(),
        "Sentiment_Score".to_string(),
    ]
}
