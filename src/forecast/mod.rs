//! Sequence-model price forecasting.
//!
//! The engine extracts a fixed multivariate feature matrix from the
//! indicator table, scales it, trains or loads a stacked LSTM, and
//! rolls the model forward one day at a time to produce point
//! estimates of future closing prices.

pub mod checkpoint;
pub mod engine;
pub mod lstm;
pub mod scaler;

pub use checkpoint::{Checkpoint, CheckpointStore};
pub use engine::{ForecastConfig, ForecastEngine};
pub use lstm::LstmNetwork;
pub use scaler::MinMaxScaler;
