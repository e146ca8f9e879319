use ndarray::{Array2, Array3, Axis, concatenate, stack};
use tracing::instrument;

use crate::activations::{sigmoid, softmax, tanh};
use crate::errors::{ModelError, Result};
use crate::one_hot::one_hot;
use crate::params::LstmParams;

/// Everything the backward pass needs from one timestep.
///
/// Gate and state tensors are `[hidden_dim, batch_size]`; `y` is
/// `[output_dim, batch_size]`.
#[derive(Clone, Debug, PartialEq)]
pub struct StepCache {
    pub h: Array2<f64>,
    pub c: Array2<f64>,
    pub f: Array2<f64>,
    pub i: Array2<f64>,
    pub c_tilde: Array2<f64>,
    pub o: Array2<f64>,
    pub y: Array2<f64>,
}

/// Ordered record of a forward pass, one `StepCache` per timestep
#[derive(Clone, Debug, PartialEq)]
pub struct Trace {
    steps: Vec<StepCache>,
    batch_size: usize,
    hidden_dim: usize,
    output_dim: usize,
}

impl Trace {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn hidden_dim(&self) -> usize {
        self.hidden_dim
    }

    pub fn output_dim(&self) -> usize {
        self.output_dim
    }

    pub fn steps(&self) -> &[StepCache] {
        &self.steps
    }

    pub fn step(&self, t: usize) -> Option<&StepCache> {
        self.steps.get(t)
    }

    /// Output distributions stacked as `[seq_length, output_dim, batch_size]`
    pub fn outputs(&self) -> Result<Array3<f64>> {
        let views: Vec<_> = self.steps.iter().map(|s| s.y.view()).collect();
        Ok(stack(Axis(0), &views)?)
    }
}

pub(crate) fn check_batch(params: &LstmParams, batch: &Array2<usize>) -> Result<()> {
    let (batch_size, seq_length) = batch.dim();
    if batch_size == 0 || seq_length == 0 {
        return Err(ModelError::shape(
            "batch [batch_size, seq_length]",
            "both dimensions > 0",
            batch.dim(),
        ));
    }
    params.validate()
}

/// Run the LSTM over every column of `batch` (`[batch_size, seq_length]`).
///
/// Returns the per-step softmax outputs, `[seq_length, output_dim,
/// batch_size]`, together with the trace consumed by
/// [`crate::backward::backward`]. Parameters are only read.
#[instrument(skip_all, fields(batch_size = batch.nrows(), seq_length = batch.ncols()))]
pub fn forward(params: &LstmParams, batch: &Array2<usize>) -> Result<(Array3<f64>, Trace)> {
    check_batch(params, batch)?;

    let (batch_size, seq_length) = batch.dim();
    let hidden_dim = params.hidden_dim();

    let mut h_prev = Array2::<f64>::zeros((hidden_dim, batch_size));
    let mut c_prev = Array2::<f64>::zeros((hidden_dim, batch_size));
    let mut steps = Vec::with_capacity(seq_length);

    for t in 0..seq_length {
        let x_t = one_hot(&batch.column(t), params.input_dim())?;
        let concat = concatenate(Axis(0), &[h_prev.view(), x_t.view()])?;

        // Gate pre-activations only read `concat`, so they run side by side
        let ((f, i), (c_tilde, o)) = rayon::join(
            || {
                rayon::join(
                    || sigmoid(&(params.wf.dot(&concat) + &params.bf)),
                    || sigmoid(&(params.wi.dot(&concat) + &params.bi)),
                )
            },
            || {
                rayon::join(
                    || tanh(&(params.wc.dot(&concat) + &params.bc)),
                    || sigmoid(&(params.wo.dot(&concat) + &params.bo)),
                )
            },
        );

        let c = &f * &c_prev + &i * &c_tilde;
        let h = &o * &tanh(&c);
        let y = softmax(&(params.wy.dot(&h) + &params.by));

        h_prev = h.clone();
        c_prev = c.clone();
        steps.push(StepCache {
            h,
            c,
            f,
            i,
            c_tilde,
            o,
            y,
        });
    }

    let trace = Trace {
        steps,
        batch_size,
        hidden_dim,
        output_dim: params.output_dim(),
    };
    let outputs = trace.outputs()?;

    tracing::debug!(steps = trace.len(), "Forward pass complete");
    Ok((outputs, trace))
}
