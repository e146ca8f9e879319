use ndarray::{Array2, Axis, concatenate, s};
use tracing::instrument;

use crate::activations::{sigmoid_derivative_from_output, tanh, tanh_derivative_from_output};
use crate::errors::{ModelError, Result};
use crate::forward::{Trace, check_batch};
use crate::one_hot::one_hot;
use crate::params::LstmParams;

/// Gradient accumulator, one tensor per parameter with matching shape
#[derive(Clone, Debug, PartialEq)]
pub struct Gradients {
    pub wf: Array2<f64>,
    pub wi: Array2<f64>,
    pub wc: Array2<f64>,
    pub wo: Array2<f64>,
    pub wy: Array2<f64>,

    pub bf: Array2<f64>,
    pub bi: Array2<f64>,
    pub bc: Array2<f64>,
    pub bo: Array2<f64>,
    pub by: Array2<f64>,
}

impl Gradients {
    pub fn zeros_like(params: &LstmParams) -> Self {
        Gradients {
            wf: Array2::zeros(params.wf.dim()),
            wi: Array2::zeros(params.wi.dim()),
            wc: Array2::zeros(params.wc.dim()),
            wo: Array2::zeros(params.wo.dim()),
            wy: Array2::zeros(params.wy.dim()),
            bf: Array2::zeros(params.bf.dim()),
            bi: Array2::zeros(params.bi.dim()),
            bc: Array2::zeros(params.bc.dim()),
            bo: Array2::zeros(params.bo.dim()),
            by: Array2::zeros(params.by.dim()),
        }
    }

    /// Gradient tensors named like the parameters they belong to
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

    /// L2 norm over every accumulated entry
    pub fn global_norm(&self) -> f64 {
        self.named_tensors()
            .iter()
            .map(|(_, g)| g.iter().map(|v| v * v).sum::<f64>())
            .sum::<f64>()
            .sqrt()
    }
}

/// Column sums as a `[rows, 1]` vector
#[inline]
fn column_sum(grad: &Array2<f64>) -> Array2<f64> {
    grad.sum_axis(Axis(1)).insert_axis(Axis(1))
}

fn check_trace(
    params: &LstmParams,
    batch: &Array2<usize>,
    targets: &Array2<usize>,
    trace: &Trace,
) -> Result<()> {
    check_batch(params, batch)?;
    if targets.dim() != batch.dim() {
        return Err(ModelError::shape(
            "targets [batch_size, seq_length]",
            batch.dim(),
            targets.dim(),
        ));
    }
    let (batch_size, seq_length) = batch.dim();
    if trace.len() != seq_length {
        return Err(ModelError::shape("trace length", seq_length, trace.len()));
    }
    if trace.batch_size() != batch_size {
        return Err(ModelError::shape(
            "trace batch size",
            batch_size,
            trace.batch_size(),
        ));
    }
    if trace.hidden_dim() != params.hidden_dim() {
        return Err(ModelError::shape(
            "trace hidden size",
            params.hidden_dim(),
            trace.hidden_dim(),
        ));
    }
    if trace.output_dim() != params.output_dim() {
        return Err(ModelError::shape(
            "trace output size",
            params.output_dim(),
            trace.output_dim(),
        ));
    }
    Ok(())
}

/// Backpropagation through time over a finished forward pass.
///
/// Produces the gradient of the cross-entropy summed over every timestep
/// and batch column, `sum_t sum_b -ln y_t[target_t, b]`. Steps are visited
/// from the last to the first because `dh_next` and `dC_next` flow
/// backwards in time.
#[instrument(skip_all, fields(seq_length = trace.len(), batch_size = trace.batch_size()))]
pub fn compute_gradients(
    params: &LstmParams,
    batch: &Array2<usize>,
    targets: &Array2<usize>,
    trace: &Trace,
) -> Result<Gradients> {
    check_trace(params, batch, targets, trace)?;

    let (batch_size, seq_length) = batch.dim();
    let hidden_dim = params.hidden_dim();
    let steps = trace.steps();

    let mut grads = Gradients::zeros_like(params);
    let zeros = Array2::<f64>::zeros((hidden_dim, batch_size));
    let mut dh_next = zeros.clone();
    let mut dc_next = zeros.clone();

    for t in (0..seq_length).rev() {
        let step = &steps[t];
        let (h_prev, c_prev) = if t == 0 {
            (&zeros, &zeros)
        } else {
            (&steps[t - 1].h, &steps[t - 1].c)
        };

        // Softmax + cross-entropy: dL/dlogits = y - one_hot(target)
        let target_t = one_hot(&targets.column(t), params.output_dim())?;
        let dy = &step.y - &target_t;
        grads.wy += &dy.dot(&step.h.t());
        grads.by += &column_sum(&dy);

        let dh = params.wy.t().dot(&dy) + &dh_next;
        let tanh_c = tanh(&step.c);

        let d_o = &dh * &tanh_c * &sigmoid_derivative_from_output(&step.o);

        let x_t = one_hot(&batch.column(t), params.input_dim())?;
        let concat = concatenate(Axis(0), &[h_prev.view(), x_t.view()])?;
        let concat_t = concat.t();

        let dc = &dh * &step.o * &tanh_derivative_from_output(&tanh_c) + &dc_next;
        let dc_tilde = &dc * &step.i * &tanh_derivative_from_output(&step.c_tilde);
        let di = &dc * &step.c_tilde * &sigmoid_derivative_from_output(&step.i);
        let df = &dc * c_prev * &sigmoid_derivative_from_output(&step.f);

        // The four outer products are independent
        let ((gwf, gwi), (gwc, gwo)) = rayon::join(
            || rayon::join(|| df.dot(&concat_t), || di.dot(&concat_t)),
            || rayon::join(|| dc_tilde.dot(&concat_t), || d_o.dot(&concat_t)),
        );
        grads.wf += &gwf;
        grads.wi += &gwi;
        grads.wc += &gwc;
        grads.wo += &gwo;

        grads.bf += &column_sum(&df);
        grads.bi += &column_sum(&di);
        grads.bc += &column_sum(&dc_tilde);
        grads.bo += &column_sum(&d_o);

        dc_next = &dc * &step.f;

        let d_concat = params.wf.t().dot(&df)
            + params.wi.t().dot(&di)
            + params.wc.t().dot(&dc_tilde)
            + params.wo.t().dot(&d_o);
        // Rows past hidden_dim belong to the one-hot input and carry nothing back
        dh_next = d_concat.slice(s![..hidden_dim, ..]).to_owned();
    }

    tracing::debug!(grad_norm = grads.global_norm(), "Backward pass complete");
    Ok(grads)
}

/// One training update: BPTT followed by a single gradient-descent step.
///
/// A learning rate of zero is accepted and leaves `params` untouched.
#[instrument(skip_all, fields(learning_rate = learning_rate))]
pub fn backward(
    params: &mut LstmParams,
    batch: &Array2<usize>,
    targets: &Array2<usize>,
    trace: &Trace,
    learning_rate: f64,
) -> Result<()> {
    if !learning_rate.is_finite() || learning_rate < 0.0 {
        return Err(ModelError::InvalidInput {
            message: format!("learning rate must be finite and non-negative, got {learning_rate}"),
        });
    }

    let grads = compute_gradients(params, batch, targets, trace)?;
    if learning_rate == 0.0 {
        return Ok(());
    }
    params.apply_gradients(&grads, learning_rate);
    Ok(())
}
