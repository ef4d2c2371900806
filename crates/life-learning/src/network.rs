//! Dense feed-forward regression network with an Adam optimizer.
//!
//! The network is a stack of fully connected ReLU layers followed by a
//! single linear output unit. Weights use Glorot uniform initialization
//! from a seeded RNG, biases start at zero. Gradients are computed by
//! backpropagation over mini-batches.

use crate::config::LossKind;
use ndarray::{Array1, Array2, ArrayView1, Axis, Zip};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Transition point between the quadratic and linear parts of the Huber loss.
const HUBER_DELTA: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Activation {
    Relu,
    Linear,
}

#[derive(Debug, Clone)]
struct Dense {
    /// `(inputs, outputs)`
    weights: Array2<f64>,
    bias: Array1<f64>,
    activation: Activation,
}

impl Dense {
    fn glorot_uniform(inputs: usize, outputs: usize, activation: Activation, rng: &mut StdRng) -> Self {
        let limit = (6.0 / (inputs + outputs) as f64).sqrt();
        let weights = Array2::from_shape_fn((inputs, outputs), |_| rng.gen_range(-limit..limit));
        Self {
            weights,
            bias: Array1::zeros(outputs),
            activation,
        }
    }

    fn forward(&self, input: &Array2<f64>) -> Array2<f64> {
        let mut output = input.dot(&self.weights) + &self.bias;
        if self.activation == Activation::Relu {
            output.mapv_inplace(|v| v.max(0.0));
        }
        output
    }
}

struct LayerGradients {
    weights: Array2<f64>,
    bias: Array1<f64>,
}

/// A trained or trainable dense regression network.
#[derive(Debug, Clone)]
pub struct Network {
    layers: Vec<Dense>,
}

impl Network {
    /// Build `inputs → hidden[0] → … → hidden[n-1] → 1`.
    ///
    /// The same `seed` always yields the same initial weights.
    pub fn new(inputs: usize, hidden: &[usize], seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut layers = Vec::with_capacity(hidden.len() + 1);
        let mut width = inputs;
        for &units in hidden {
            layers.push(Dense::glorot_uniform(width, units, Activation::Relu, &mut rng));
            width = units;
        }
        layers.push(Dense::glorot_uniform(width, 1, Activation::Linear, &mut rng));
        Self { layers }
    }

    pub fn n_inputs(&self) -> usize {
        self.layers.first().map_or(0, |l| l.weights.nrows())
    }

    /// Layer widths, output unit included.
    pub fn layer_sizes(&self) -> Vec<usize> {
        self.layers.iter().map(|l| l.weights.ncols()).collect()
    }

    /// Total number of trainable weights and biases.
    pub fn n_parameters(&self) -> usize {
        self.layers
            .iter()
            .map(|l| l.weights.len() + l.bias.len())
            .sum()
    }

    /// One prediction per row of `features`.
    pub fn predict(&self, features: &Array2<f64>) -> Array1<f64> {
        let mut activation = features.clone();
        for layer in &self.layers {
            activation = layer.forward(&activation);
        }
        activation.column(0).to_owned()
    }

    /// Mean loss of the network's predictions on `features`.
    pub fn loss(&self, features: &Array2<f64>, targets: &Array1<f64>, kind: LossKind) -> f64 {
        loss_value(kind, &self.predict(features), targets)
    }

    /// One pass over the data in shuffled mini-batches.
    ///
    /// Returns the mean training loss across batches, weighted by batch
    /// size.
    pub fn fit_epoch(
        &mut self,
        features: &Array2<f64>,
        targets: &Array1<f64>,
        batch_size: usize,
        kind: LossKind,
        optimizer: &mut Adam,
        rng: &mut StdRng,
    ) -> f64 {
        let n = features.nrows();
        if n == 0 {
            return 0.0;
        }

        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(rng);

        let mut total = 0.0;
        for batch in order.chunks(batch_size.max(1)) {
            let x = features.select(Axis(0), batch);
            let y = targets.select(Axis(0), batch);
            let (loss, gradients) = self.backward(&x, &y, kind);
            optimizer.step(self, &gradients);
            total += loss * batch.len() as f64;
        }
        total / n as f64
    }

    fn backward(&self, x: &Array2<f64>, y: &Array1<f64>, kind: LossKind) -> (f64, Vec<LayerGradients>) {
        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        activations.push(x.clone());
        for layer in &self.layers {
            let next = layer.forward(&activations[activations.len() - 1]);
            activations.push(next);
        }

        let output = activations[self.layers.len()].column(0).to_owned();
        let (loss, grad_output) = loss_and_gradient(kind, output.view(), y.view());

        let mut delta = grad_output.insert_axis(Axis(1));
        let mut gradients = Vec::with_capacity(self.layers.len());
        for (index, layer) in self.layers.iter().enumerate().rev() {
            if layer.activation == Activation::Relu {
                delta.zip_mut_with(&activations[index + 1], |d, &a| {
                    if a <= 0.0 {
                        *d = 0.0;
                    }
                });
            }
            let input = &activations[index];
            gradients.push(LayerGradients {
                weights: input.t().dot(&delta),
                bias: delta.sum_axis(Axis(0)),
            });
            delta = delta.dot(&layer.weights.t());
        }
        gradients.reverse();
        (loss, gradients)
    }
}

/// Mean loss of precomputed predictions.
pub(crate) fn loss_value(kind: LossKind, predictions: &Array1<f64>, targets: &Array1<f64>) -> f64 {
    loss_and_gradient(kind, predictions.view(), targets.view()).0
}

/// Mean loss over the batch and its gradient with respect to each prediction.
fn loss_and_gradient(
    kind: LossKind,
    predictions: ArrayView1<f64>,
    targets: ArrayView1<f64>,
) -> (f64, Array1<f64>) {
    let n = predictions.len().max(1) as f64;
    let mut total = 0.0;
    let mut gradient = Array1::zeros(predictions.len());

    Zip::from(&mut gradient)
        .and(predictions)
        .and(targets)
        .for_each(|g, &p, &t| {
            let residual = p - t;
            let (value, slope) = match kind {
                LossKind::MeanSquaredError => (residual * residual, 2.0 * residual),
                LossKind::Huber if residual.abs() <= HUBER_DELTA => {
                    (0.5 * residual * residual, residual)
                }
                LossKind::Huber => (
                    HUBER_DELTA * (residual.abs() - 0.5 * HUBER_DELTA),
                    HUBER_DELTA * residual.signum(),
                ),
            };
            total += value;
            *g = slope / n;
        });

    (total / n, gradient)
}

#[derive(Debug, Clone)]
struct Moments {
    weights_m: Array2<f64>,
    weights_v: Array2<f64>,
    bias_m: Array1<f64>,
    bias_v: Array1<f64>,
}

/// Adam optimizer state for one network.
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    steps: i32,
    moments: Vec<Moments>,
}

impl Adam {
    pub fn new(learning_rate: f64, network: &Network) -> Self {
        let moments = network
            .layers
            .iter()
            .map(|layer| Moments {
                weights_m: Array2::zeros(layer.weights.raw_dim()),
                weights_v: Array2::zeros(layer.weights.raw_dim()),
                bias_m: Array1::zeros(layer.bias.len()),
                bias_v: Array1::zeros(layer.bias.len()),
            })
            .collect();
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
            steps: 0,
            moments,
        }
    }

    fn step(&mut self, network: &mut Network, gradients: &[LayerGradients]) {
        self.steps = self.steps.saturating_add(1);
        let (b1, b2, eps) = (self.beta1, self.beta2, self.epsilon);
        let step_size = self.learning_rate * (1.0 - b2.powi(self.steps)).sqrt()
            / (1.0 - b1.powi(self.steps));

        let update = |param: &mut f64, m: &mut f64, v: &mut f64, g: f64| {
            *m = b1 * *m + (1.0 - b1) * g;
            *v = b2 * *v + (1.0 - b2) * g * g;
            *param -= step_size * *m / (v.sqrt() + eps);
        };

        for ((layer, grads), moments) in network
            .layers
            .iter_mut()
            .zip(gradients)
            .zip(&mut self.moments)
        {
            Zip::from(&mut layer.weights)
                .and(&mut moments.weights_m)
                .and(&mut moments.weights_v)
                .and(&grads.weights)
                .for_each(|w, m, v, &g| update(w, m, v, g));
            Zip::from(&mut layer.bias)
                .and(&mut moments.bias_m)
                .and(&mut moments.bias_v)
                .and(&grads.bias)
                .for_each(|b, m, v, &g| update(b, m, v, g));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_architecture() {
        let network = Network::new(5, &[128, 64], 7);
        assert_eq!(network.n_inputs(), 5);
        assert_eq!(network.layer_sizes(), vec![128, 64, 1]);
        assert_eq!(network.n_parameters(), 5 * 128 + 128 + 128 * 64 + 64 + 64 + 1);
    }

    #[test]
    fn test_glorot_bounds_and_seeding() {
        let a = Network::new(4, &[8], 42);
        let b = Network::new(4, &[8], 42);
        let c = Network::new(4, &[8], 43);

        let limit = (6.0_f64 / 12.0).sqrt();
        assert!(a.layers[0].weights.iter().all(|w| w.abs() <= limit));
        assert!(a.layers[0].bias.iter().all(|&b| b == 0.0));
        assert_eq!(a.layers[0].weights, b.layers[0].weights);
        assert_ne!(a.layers[0].weights, c.layers[0].weights);
    }

    #[test]
    fn test_predict_shape() {
        let network = Network::new(3, &[4, 2], 1);
        let x = Array2::zeros((6, 3));
        let y = network.predict(&x);
        assert_eq!(y.len(), 6);
        // Zero input and zero biases give a zero output.
        assert!(y.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_huber_loss_and_gradient() {
        let p = array![0.5, 3.0, -2.0];
        let t = array![0.0, 0.0, 0.0];
        let (loss, grad) = loss_and_gradient(LossKind::Huber, p.view(), t.view());
        // 0.125 + 2.5 + 1.5 over 3 rows
        assert!((loss - 4.125 / 3.0).abs() < 1e-12);
        assert!((grad[0] - 0.5 / 3.0).abs() < 1e-12);
        assert!((grad[1] - 1.0 / 3.0).abs() < 1e-12);
        assert!((grad[2] + 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_mse_loss_and_gradient() {
        let p = array![1.0, 3.0];
        let t = array![0.0, 1.0];
        let (loss, grad) = loss_and_gradient(LossKind::MeanSquaredError, p.view(), t.view());
        assert_eq!(loss, 2.5);
        assert_eq!(grad.to_vec(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_gradient_matches_finite_difference() {
        let mut network = Network::new(2, &[3], 11);
        let x = array![[0.2, 0.9], [0.7, 0.1], [0.5, 0.5]];
        let y = array![1.0, 0.0, 0.5];

        let (_, gradients) = network.backward(&x, &y, LossKind::MeanSquaredError);
        let analytic = gradients[0].weights[[1, 2]];

        let h = 1e-6;
        network.layers[0].weights[[1, 2]] += h;
        let plus = network.loss(&x, &y, LossKind::MeanSquaredError);
        network.layers[0].weights[[1, 2]] -= 2.0 * h;
        let minus = network.loss(&x, &y, LossKind::MeanSquaredError);
        let numeric = (plus - minus) / (2.0 * h);

        assert!((analytic - numeric).abs() < 1e-5, "{analytic} vs {numeric}");
    }

    #[test]
    fn test_training_reduces_loss() {
        let x = Array2::from_shape_fn((40, 2), |(i, j)| ((i * (j + 1)) % 7) as f64 / 7.0);
        let y = x.column(0).mapv(|v| 2.0 * v + 1.0) + x.column(1).mapv(|v| -v);

        let mut network = Network::new(2, &[16, 8], 3);
        let mut optimizer = Adam::new(0.01, &network);
        let mut rng = StdRng::seed_from_u64(3);

        let before = network.loss(&x, &y, LossKind::MeanSquaredError);
        for _ in 0..200 {
            network.fit_epoch(&x, &y, 8, LossKind::MeanSquaredError, &mut optimizer, &mut rng);
        }
        let after = network.loss(&x, &y, LossKind::MeanSquaredError);

        assert!(after.is_finite());
        assert!(after < before * 0.1, "loss went from {before} to {after}");
    }
}
