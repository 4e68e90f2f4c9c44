//! Per-column min-max scaling to the unit interval.

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// Min-max scaler fitted per feature column.
///
/// A constant column (zero range) scales to 0.0 rather than dividing
/// by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    mins: Vec<f64>,
    ranges: Vec<f64>,
}

impl MinMaxScaler {
    /// Fit column minima and ranges over the given rows.
    pub fn fit(data: ArrayView2<'_, f64>) -> Self {
        let cols = data.ncols();
        let mut mins = vec![f64::INFINITY; cols];
        let mut maxs = vec![f64::NEG_INFINITY; cols];

        for row in data.rows() {
            for (j, &value) in row.iter().enumerate() {
                mins[j] = mins[j].min(value);
                maxs[j] = maxs[j].max(value);
            }
        }

        let ranges = mins
            .iter()
            .zip(&maxs)
            .map(|(lo, hi)| hi - lo)
            .collect();

        Self { mins, ranges }
    }

    pub fn n_features(&self) -> usize {
        self.mins.len()
    }

    /// Scale every cell to [0, 1] relative to the fitted bounds.
    /// Values outside the fitted range map outside the unit interval.
    pub fn transform(&self, data: ArrayView2<'_, f64>) -> Array2<f64> {
        let mut scaled = data.to_owned();
        for mut row in scaled.rows_mut() {
            for (j, value) in row.iter_mut().enumerate() {
                *value = if self.ranges[j] == 0.0 {
                    0.0
                } else {
                    (*value - self.mins[j]) / self.ranges[j]
                };
            }
        }
        scaled
    }

    /// Map one scaled value of the given column back to original units.
    pub fn inverse_value(&self, column: usize, scaled: f64) -> f64 {
        scaled * self.ranges[column] + self.mins[column]
    }
}
