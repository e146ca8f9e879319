use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::backward::Gradients;
use crate::errors::{ModelError, Result};
use crate::DEFAULT_INIT_STD;

/// Weights and biases of a single LSTM cell plus its softmax output layer.
///
/// Gate weights act on the stacked column `[h_{t-1}; x_t]`, so each has
/// shape `[hidden_dim, hidden_dim + input_dim]`. Biases are column vectors.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LstmParams {
    pub wf: Array2<f64>, // forget gate
    pub wi: Array2<f64>, // input gate
    pub wc: Array2<f64>, // candidate
    pub wo: Array2<f64>, // output gate
    pub wy: Array2<f64>, // output projection [output_dim, hidden_dim]

    pub bf: Array2<f64>,
    pub bi: Array2<f64>,
    pub bc: Array2<f64>,
    pub bo: Array2<f64>,
    pub by: Array2<f64>,

    input_dim: usize,
    hidden_dim: usize,
    output_dim: usize,
}

impl LstmParams {
    /// Random normal weights (std `DEFAULT_INIT_STD`) and zero biases
    pub fn new(input_dim: usize, hidden_dim: usize, output_dim: usize) -> Result<Self> {
        let mut rng = rand::rng();
        Self::init_with(&mut rng, input_dim, hidden_dim, output_dim, DEFAULT_INIT_STD)
    }

    /// Reproducible initialization from a fixed seed
    pub fn seeded(
        input_dim: usize,
        hidden_dim: usize,
        output_dim: usize,
        init_std: f64,
        seed: u64,
    ) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::init_with(&mut rng, input_dim, hidden_dim, output_dim, init_std)
    }

    fn init_with<R: Rng + ?Sized>(
        rng: &mut R,
        input_dim: usize,
        hidden_dim: usize,
        output_dim: usize,
        init_std: f64,
    ) -> Result<Self> {
        if input_dim == 0 || hidden_dim == 0 || output_dim == 0 {
            return Err(ModelError::InvalidInput {
                message: format!(
                    "model dimensions must be positive (input_dim={input_dim}, hidden_dim={hidden_dim}, output_dim={output_dim})"
                ),
            });
        }
        let normal = Normal::new(0.0, init_std).map_err(|e| ModelError::InvalidInput {
            message: format!("invalid init_std {init_std}: {e}"),
        })?;

        let concat_dim = hidden_dim + input_dim;
        let mut weight = |rows: usize, cols: usize| {
            Array2::from_shape_fn((rows, cols), |_| normal.sample(&mut *rng))
        };

        let wf = weight(hidden_dim, concat_dim);
        let wi = weight(hidden_dim, concat_dim);
        let wc = weight(hidden_dim, concat_dim);
        let wo = weight(hidden_dim, concat_dim);
        let wy = weight(output_dim, hidden_dim);

        tracing::debug!(
            input_dim,
            hidden_dim,
            output_dim,
            init_std,
            "Initialized LSTM parameters"
        );

        Ok(LstmParams {
            wf,
            wi,
            wc,
            wo,
            wy,
            bf: Array2::zeros((hidden_dim, 1)),
            bi: Array2::zeros((hidden_dim, 1)),
            bc: Array2::zeros((hidden_dim, 1)),
            bo: Array2::zeros((hidden_dim, 1)),
            by: Array2::zeros((output_dim, 1)),
            input_dim,
            hidden_dim,
            output_dim,
        })
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    pub fn hidden_dim(&self) -> usize {
        self.hidden_dim
    }

    pub fn output_dim(&self) -> usize {
        self.output_dim
    }

    /// Total number of scalar parameters
    pub fn parameters(&self) -> usize {
        self.named_tensors().iter().map(|(_, t)| t.len()).sum()
    }

    /// Every parameter tensor with its field name, in a fixed order
    pub fn named_tensors(&self) -> [(&'static str, &Array2<f64>); 10] {
        [
            ("wf", &self.wf),
            ("wi", &self.wi),
            ("wc", &self.wc),
            ("wo", &self.wo),
            ("wy", &self.wy),
            ("bf", &self.bf),
            ("bi", &self.bi),
            ("bc", &self.bc),
            ("bo", &self.bo),
            ("by", &self.by),
        ]
    }

    /// Expected shape of every tensor for the stored dimensions
    fn expected_shapes(&self) -> [(usize, usize); 10] {
        let gate = (self.hidden_dim, self.hidden_dim + self.input_dim);
        let gate_bias = (self.hidden_dim, 1);
        [
            gate,
            gate,
            gate,
            gate,
            (self.output_dim, self.hidden_dim),
            gate_bias,
            gate_bias,
            gate_bias,
            gate_bias,
            (self.output_dim, 1),
        ]
    }

    /// Check that every tensor agrees with the recorded dimensions.
    ///
    /// Construction always satisfies this; deserialized parameters may not.
    pub fn validate(&self) -> Result<()> {
        if self.input_dim == 0 || self.hidden_dim == 0 || self.output_dim == 0 {
            return Err(ModelError::InvalidInput {
                message: "model dimensions must be positive".to_string(),
            });
        }
        for ((name, tensor), expected) in self.named_tensors().iter().zip(self.expected_shapes()) {
            if tensor.dim() != expected {
                return Err(ModelError::shape(
                    format!("parameter {name}"),
                    expected,
                    tensor.dim(),
                ));
            }
        }
        Ok(())
    }

    /// Plain gradient descent: `param -= learning_rate * grad` for every tensor
    pub fn apply_gradients(&mut self, grads: &Gradients, learning_rate: f64) {
        self.wf.scaled_add(-learning_rate, &grads.wf);
        self.wi.scaled_add(-learning_rate, &grads.wi);
        self.wc.scaled_add(-learning_rate, &grads.wc);
        self.wo.scaled_add(-learning_rate, &grads.wo);
        self.wy.scaled_add(-learning_rate, &grads.wy);

        self.bf.scaled_add(-learning_rate, &grads.bf);
        self.bi.scaled_add(-learning_rate, &grads.bi);
        self.bc.scaled_add(-learning_rate, &grads.bc);
        self.bo.scaled_add(-learning_rate, &grads.bo);
        self.by.scaled_add(-learning_rate, &grads.by);
    }
}
