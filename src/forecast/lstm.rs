//! Stacked LSTM sequence model with analytic backpropagation.
//!
//! The network maps a window of scaled feature rows to one scalar: the
//! next scaled closing price. Training runs truncated
//! backpropagation-through-time per sequence with plain SGD and global
//! gradient-norm clipping; inverted dropout is applied between layers
//! during training only.

use ndarray::{s, Array1, Array2, Array3, ArrayView1, ArrayView2, Axis};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Shape and training hyperparameters of the network.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LstmConfig {
    pub input_size: usize,
    pub hidden_size: usize,
    pub num_layers: usize,
    /// Inter-layer dropout probability during training.
    pub dropout: f64,
}

/// One LSTM cell: four gates with input and recurrent weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LstmCell {
    input_size: usize,
    hidden_size: usize,

    w_ii: Array2<f64>,
    w_hi: Array2<f64>,
    b_i: Array1<f64>,

    w_if: Array2<f64>,
    w_hf: Array2<f64>,
    b_f: Array1<f64>,

    w_ig: Array2<f64>,
    w_hg: Array2<f64>,
    b_g: Array1<f64>,

    w_io: Array2<f64>,
    w_ho: Array2<f64>,
    b_o: Array1<f64>,
}

/// Intermediate activations of one forward step, kept for backprop.
struct StepCache {
    x: Array1<f64>,
    h_prev: Array1<f64>,
    c_prev: Array1<f64>,
    i: Array1<f64>,
    f: Array1<f64>,
    g: Array1<f64>,
    o: Array1<f64>,
    c: Array1<f64>,
}

/// Accumulated parameter gradients for one cell.
struct CellGradients {
    w_ii: Array2<f64>,
    w_hi: Array2<f64>,
    b_i: Array1<f64>,
    w_if: Array2<f64>,
    w_hf: Array2<f64>,
    b_f: Array1<f64>,
    w_ig: Array2<f64>,
    w_hg: Array2<f64>,
    b_g: Array1<f64>,
    w_io: Array2<f64>,
    w_ho: Array2<f64>,
    b_o: Array1<f64>,
}

impl CellGradients {
    fn zeros(input_size: usize, hidden_size: usize) -> Self {
        Self {
            w_ii: Array2::zeros((hidden_size, input_size)),
            w_hi: Array2::zeros((hidden_size, hidden_size)),
            b_i: Array1::zeros(hidden_size),
            w_if: Array2::zeros((hidden_size, input_size)),
            w_hf: Array2::zeros((hidden_size, hidden_size)),
            b_f: Array1::zeros(hidden_size),
            w_ig: Array2::zeros((hidden_size, input_size)),
            w_hg: Array2::zeros((hidden_size, hidden_size)),
            b_g: Array1::zeros(hidden_size),
            w_io: Array2::zeros((hidden_size, input_size)),
            w_ho: Array2::zeros((hidden_size, hidden_size)),
            b_o: Array1::zeros(hidden_size),
        }
    }

    fn squared_norm(&self) -> f64 {
        [
            &self.w_ii, &self.w_hi, &self.w_if, &self.w_hf, &self.w_ig, &self.w_hg, &self.w_io,
            &self.w_ho,
        ]
        .iter()
        .map(|m| m.iter().map(|v| v * v).sum::<f64>())
        .sum::<f64>()
            + [&self.b_i, &self.b_f, &self.b_g, &self.b_o]
                .iter()
                .map(|b| b.iter().map(|v| v * v).sum::<f64>())
                .sum::<f64>()
    }

    fn scale(&mut self, factor: f64) {
        for m in [
            &mut self.w_ii,
            &mut self.w_hi,
            &mut self.w_if,
            &mut self.w_hf,
            &mut self.w_ig,
            &mut self.w_hg,
            &mut self.w_io,
            &mut self.w_ho,
        ] {
            m.mapv_inplace(|v| v * factor);
        }
        for b in [&mut self.b_i, &mut self.b_f, &mut self.b_g, &mut self.b_o] {
            b.mapv_inplace(|v| v * factor);
        }
    }
}

impl LstmCell {
    fn new(input_size: usize, hidden_size: usize) -> Self {
        let limit = (1.0 / hidden_size as f64).sqrt();
        let weights = |rows, cols| Array2::random((rows, cols), Uniform::new(-limit, limit));

        Self {
            input_size,
            hidden_size,
            w_ii: weights(hidden_size, input_size),
            w_hi: weights(hidden_size, hidden_size),
            b_i: Array1::zeros(hidden_size),
            w_if: weights(hidden_size, input_size),
            w_hf: weights(hidden_size, hidden_size),
            // forget-gate bias starts at one so early training retains state
            b_f: Array1::from_elem(hidden_size, 1.0),
            w_ig: weights(hidden_size, input_size),
            w_hg: weights(hidden_size, hidden_size),
            b_g: Array1::zeros(hidden_size),
            w_io: weights(hidden_size, input_size),
            w_ho: weights(hidden_size, hidden_size),
            b_o: Array1::zeros(hidden_size),
        }
    }

    fn init_state(&self) -> (Array1<f64>, Array1<f64>) {
        (
            Array1::zeros(self.hidden_size),
            Array1::zeros(self.hidden_size),
        )
    }

    /// One forward step, returning the new hidden state and the cache
    /// needed to backpropagate through it.
    fn forward(
        &self,
        x: &Array1<f64>,
        h_prev: &Array1<f64>,
        c_prev: &Array1<f64>,
    ) -> (Array1<f64>, StepCache) {
        let i = sigmoid(self.w_ii.dot(x) + self.w_hi.dot(h_prev) + &self.b_i);
        let f = sigmoid(self.w_if.dot(x) + self.w_hf.dot(h_prev) + &self.b_f);
        let g = tanh(self.w_ig.dot(x) + self.w_hg.dot(h_prev) + &self.b_g);
        let o = sigmoid(self.w_io.dot(x) + self.w_ho.dot(h_prev) + &self.b_o);

        let c = &f * c_prev + &i * &g;
        let h = &o * &c.mapv(f64::tanh);

        let cache = StepCache {
            x: x.clone(),
            h_prev: h_prev.clone(),
            c_prev: c_prev.clone(),
            i,
            f,
            g,
            o,
            c: c.clone(),
        };
        (h, cache)
    }

    /// Backward through one step. `dh` is the total gradient arriving
    /// at this step's hidden output, `dc_next` the gradient flowing
    /// back from the following cell state. Returns gradients for the
    /// step input, previous hidden state and previous cell state.
    fn backward(
        &self,
        cache: &StepCache,
        dh: &Array1<f64>,
        dc_next: &Array1<f64>,
        grads: &mut CellGradients,
    ) -> (Array1<f64>, Array1<f64>, Array1<f64>) {
        let tanh_c = cache.c.mapv(f64::tanh);

        let d_o = dh * &tanh_c;
        let da_o = &d_o * &(&cache.o * &cache.o.mapv(|v| 1.0 - v));

        let dc = dh * &cache.o * tanh_c.mapv(|v| 1.0 - v * v) + dc_next;

        let d_f = &dc * &cache.c_prev;
        let da_f = &d_f * &(&cache.f * &cache.f.mapv(|v| 1.0 - v));

        let d_i = &dc * &cache.g;
        let da_i = &d_i * &(&cache.i * &cache.i.mapv(|v| 1.0 - v));

        let d_g = &dc * &cache.i;
        let da_g = &d_g * &cache.g.mapv(|v| 1.0 - v * v);

        grads.w_ii += &outer(&da_i, &cache.x);
        grads.w_hi += &outer(&da_i, &cache.h_prev);
        grads.b_i += &da_i;
        grads.w_if += &outer(&da_f, &cache.x);
        grads.w_hf += &outer(&da_f, &cache.h_prev);
        grads.b_f += &da_f;
        grads.w_ig += &outer(&da_g, &cache.x);
        grads.w_hg += &outer(&da_g, &cache.h_prev);
        grads.b_g += &da_g;
        grads.w_io += &outer(&da_o, &cache.x);
        grads.w_ho += &outer(&da_o, &cache.h_prev);
        grads.b_o += &da_o;

        let dx = self.w_ii.t().dot(&da_i)
            + self.w_if.t().dot(&da_f)
            + self.w_ig.t().dot(&da_g)
            + self.w_io.t().dot(&da_o);
        let dh_prev = self.w_hi.t().dot(&da_i)
            + self.w_hf.t().dot(&da_f)
            + self.w_hg.t().dot(&da_g)
            + self.w_ho.t().dot(&da_o);
        let dc_prev = &dc * &cache.f;

        (dx, dh_prev, dc_prev)
    }

    fn apply_gradients(&mut self, grads: &CellGradients, learning_rate: f64) {
        self.w_ii.scaled_add(-learning_rate, &grads.w_ii);
        self.w_hi.scaled_add(-learning_rate, &grads.w_hi);
        self.b_i.scaled_add(-learning_rate, &grads.b_i);
        self.w_if.scaled_add(-learning_rate, &grads.w_if);
        self.w_hf.scaled_add(-learning_rate, &grads.w_hf);
        self.b_f.scaled_add(-learning_rate, &grads.b_f);
        self.w_ig.scaled_add(-learning_rate, &grads.w_ig);
        self.w_hg.scaled_add(-learning_rate, &grads.w_hg);
        self.b_g.scaled_add(-learning_rate, &grads.b_g);
        self.w_io.scaled_add(-learning_rate, &grads.w_io);
        self.w_ho.scaled_add(-learning_rate, &grads.w_ho);
        self.b_o.scaled_add(-learning_rate, &grads.b_o);
    }
}

/// Stacked LSTM with a linear scalar head.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmNetwork {
    pub config: LstmConfig,
    cells: Vec<LstmCell>,
    w_out: Array1<f64>,
    b_out: f64,
    /// Mean training loss per epoch of the most recent fit.
    #[serde(skip)]
    pub loss_history: Vec<f64>,
}

const GRADIENT_CLIP: f64 = 5.0;

impl LstmNetwork {
    /// Create a freshly initialized network.
    pub fn new(config: LstmConfig) -> Self {
        let mut cells = Vec::with_capacity(config.num_layers);
        cells.push(LstmCell::new(config.input_size, config.hidden_size));
        for _ in 1..config.num_layers {
            cells.push(LstmCell::new(config.hidden_size, config.hidden_size));
        }

        let limit = (1.0 / config.hidden_size as f64).sqrt();
        Self {
            config,
            cells,
            w_out: Array1::random(config.hidden_size, Uniform::new(-limit, limit)),
            b_out: 0.0,
            loss_history: Vec::new(),
        }
    }

    /// Run one sequence `[seq_len, input_size]` through the network and
    /// return the scalar prediction. No dropout is applied.
    pub fn forward(&self, sequence: ArrayView2<'_, f64>) -> f64 {
        let mut states: Vec<(Array1<f64>, Array1<f64>)> =
            self.cells.iter().map(|cell| cell.init_state()).collect();

        for t in 0..sequence.nrows() {
            let mut layer_input = sequence.row(t).to_owned();
            for (layer, cell) in self.cells.iter().enumerate() {
                let (h_prev, c_prev) = &states[layer];
                let (h, cache) = cell.forward(&layer_input, h_prev, c_prev);
                layer_input = h.clone();
                states[layer] = (h, cache.c);
            }
        }

        let final_hidden = &states[self.cells.len() - 1].0;
        self.w_out.dot(final_hidden) + self.b_out
    }

    /// Train on supervised windows `x: [samples, seq_len, features]`
    /// against scalar targets, one SGD step per sequence.
    pub fn train(
        &mut self,
        x: &Array3<f64>,
        y: ArrayView1<'_, f64>,
        epochs: usize,
        learning_rate: f64,
    ) {
        let n_samples = x.shape()[0];
        self.loss_history.clear();
        if n_samples == 0 {
            return;
        }

        for epoch in 0..epochs {
            let mut epoch_loss = 0.0;
            for sample in 0..n_samples {
                let sequence = x.slice(s![sample, .., ..]);
                epoch_loss += self.train_sequence(sequence, y[sample], learning_rate);
            }
            let mean_loss = epoch_loss / n_samples as f64;
            self.loss_history.push(mean_loss);
            debug!("epoch {}: training loss {:.6}", epoch + 1, mean_loss);
        }
    }

    /// Forward + BPTT + SGD update for a single sequence; returns its
    /// squared-error loss.
    fn train_sequence(
        &mut self,
        sequence: ArrayView2<'_, f64>,
        target: f64,
        learning_rate: f64,
    ) -> f64 {
        let seq_len = sequence.nrows();
        let num_layers = self.cells.len();
        let mut rng = rand::thread_rng();

        // one inverted-dropout mask per layer boundary, per sequence
        let keep = 1.0 - self.config.dropout;
        let masks: Vec<Array1<f64>> = (1..num_layers)
            .map(|_| {
                Array1::from_shape_fn(self.config.hidden_size, |_| {
                    if keep < 1.0 && rng.gen::<f64>() >= keep {
                        0.0
                    } else {
                        1.0 / keep
                    }
                })
            })
            .collect();

        // forward, caching every step
        let mut caches: Vec<Vec<StepCache>> = (0..num_layers)
            .map(|_| Vec::with_capacity(seq_len))
            .collect();
        let mut states: Vec<(Array1<f64>, Array1<f64>)> =
            self.cells.iter().map(|cell| cell.init_state()).collect();

        for t in 0..seq_len {
            let mut layer_input = sequence.row(t).to_owned();
            for (layer, cell) in self.cells.iter().enumerate() {
                if layer > 0 {
                    layer_input = &layer_input * &masks[layer - 1];
                }
                let (h_prev, c_prev) = &states[layer];
                let (h, cache) = cell.forward(&layer_input, h_prev, c_prev);
                layer_input = h.clone();
                states[layer] = (h, cache.c.clone());
                caches[layer].push(cache);
            }
        }

        let final_hidden = states[num_layers - 1].0.clone();
        let prediction = self.w_out.dot(&final_hidden) + self.b_out;
        let error = prediction - target;
        let loss = error * error;

        // output head gradients
        let d_pred = 2.0 * error;
        let mut grad_w_out = &final_hidden * d_pred;
        let mut grad_b_out = d_pred;

        // gradient arriving at each layer's hidden outputs from above
        let hidden = self.config.hidden_size;
        let mut incoming: Vec<Vec<Array1<f64>>> = (0..num_layers)
            .map(|_| (0..seq_len).map(|_| Array1::zeros(hidden)).collect())
            .collect();
        incoming[num_layers - 1][seq_len - 1] = &self.w_out * d_pred;

        let mut all_grads: Vec<CellGradients> = self
            .cells
            .iter()
            .map(|cell| CellGradients::zeros(cell.input_size, cell.hidden_size))
            .collect();

        for layer in (0..num_layers).rev() {
            let mut dh_carry = Array1::zeros(hidden);
            let mut dc_carry = Array1::zeros(hidden);

            for t in (0..seq_len).rev() {
                let dh_total = &dh_carry + &incoming[layer][t];
                let (dx, dh_prev, dc_prev) = self.cells[layer].backward(
                    &caches[layer][t],
                    &dh_total,
                    &dc_carry,
                    &mut all_grads[layer],
                );
                if layer > 0 {
                    // undo the dropout scaling on the way down
                    incoming[layer - 1][t] = &dx * &masks[layer - 1];
                }
                dh_carry = dh_prev;
                dc_carry = dc_prev;
            }
        }

        // global gradient-norm clipping across every parameter
        let mut squared_norm: f64 = all_grads.iter().map(|g| g.squared_norm()).sum();
        squared_norm += grad_w_out.iter().map(|v| v * v).sum::<f64>() + grad_b_out * grad_b_out;
        let norm = squared_norm.sqrt();
        if norm > GRADIENT_CLIP {
            let factor = GRADIENT_CLIP / norm;
            for grads in &mut all_grads {
                grads.scale(factor);
            }
            grad_w_out.mapv_inplace(|v| v * factor);
            grad_b_out *= factor;
        }

        for (cell, grads) in self.cells.iter_mut().zip(&all_grads) {
            cell.apply_gradients(grads, learning_rate);
        }
        self.w_out.scaled_add(-learning_rate, &grad_w_out);
        self.b_out -= learning_rate * grad_b_out;

        loss
    }
}

fn sigmoid(x: Array1<f64>) -> Array1<f64> {
    x.mapv(|v| 1.0 / (1.0 + (-v).exp()))
}

fn tanh(x: Array1<f64>) -> Array1<f64> {
    x.mapv(f64::tanh)
}

fn outer(a: &Array1<f64>, b: &Array1<f64>) -> Array2<f64> {
    let a = a.view().insert_axis(Axis(1));
    let b = b.view().insert_axis(Axis(0));
    &a * &b
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn small_config() -> LstmConfig {
        LstmConfig {
            input_size: 4,
            hidden_size: 8,
            num_layers: 2,
            dropout: 0.2,
        }
    }

    #[test]
    fn test_forward_produces_finite_scalar() {
        let network = LstmNetwork::new(small_config());
        let sequence = Array2::zeros((10, 4));
        let prediction = network.forward(sequence.view());
        assert!(prediction.is_finite());
    }

    #[test]
    fn test_forward_is_deterministic() {
        let network = LstmNetwork::new(small_config());
        let sequence = Array2::from_elem((10, 4), 0.3);
        let first = network.forward(sequence.view());
        let second = network.forward(sequence.view());
        assert_eq!(first, second);
    }

    #[test]
    fn test_training_reduces_loss_on_constant_target() {
        let mut config = small_config();
        config.dropout = 0.0;
        let mut network = LstmNetwork::new(config);

        let x = Array3::from_elem((8, 6, 4), 0.5);
        let y = Array1::from_elem(8, 0.7);
        network.train(&x, y.view(), 30, 0.05);

        let history = &network.loss_history;
        assert_eq!(history.len(), 30);
        assert!(
            history.last().unwrap() < history.first().unwrap(),
            "loss did not decrease: {:?} -> {:?}",
            history.first(),
            history.last()
        );
    }

    #[test]
    fn test_train_on_empty_set_is_a_no_op() {
        let mut network = LstmNetwork::new(small_config());
        let x = Array3::zeros((0, 6, 4));
        let y = Array1::zeros(0);
        network.train(&x, y.view(), 3, 0.01);
        assert!(network.loss_history.is_empty());
    }

    #[test]
    fn test_serde_round_trip_preserves_predictions() {
        let network = LstmNetwork::new(small_config());
        let bytes = bincode::serialize(&network).unwrap();
        let restored: LstmNetwork = bincode::deserialize(&bytes).unwrap();

        let sequence = Array2::from_elem((5, 4), 0.25);
        assert_eq!(
            network.forward(sequence.view()),
            restored.forward(sequence.view())
        );
    }

    #[test]
    fn test_layer_count_matches_config() {
        let network = LstmNetwork::new(small_config());
        assert_eq!(network.cells.len(), 2);
        assert_eq!(network.cells[0].input_size, 4);
        assert_eq!(network.cells[1].input_size, 8);
    }
}
