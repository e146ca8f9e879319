use ndarray::Array2;
use tracing::{info, instrument};

use crate::backward::backward;
use crate::errors::{ModelError, Result};
use crate::forward::forward;
use crate::loss::cross_entropy;
use crate::model_config::TrainingConfig;
use crate::params::LstmParams;

/// Loss history of a training run, one entry per epoch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingReport {
    /// Summed cross-entropy measured before each update
    pub losses: Vec<f64>,
}

impl TrainingReport {
    pub fn first_loss(&self) -> Option<f64> {
        self.losses.first().copied()
    }

    pub fn final_loss(&self) -> Option<f64> {
        self.losses.last().copied()
    }

    pub fn mean_loss(&self) -> Option<f64> {
        if self.losses.is_empty() {
            return None;
        }
        Some(self.losses.iter().sum::<f64>() / self.losses.len() as f64)
    }
}

/// Forward, loss, backward. Returns the loss of the parameters before the update.
pub fn train_step(
    params: &mut LstmParams,
    batch: &Array2<usize>,
    targets: &Array2<usize>,
    learning_rate: f64,
) -> Result<f64> {
    let (outputs, trace) = forward(params, batch)?;
    let loss = cross_entropy(&outputs, targets)?;
    backward(params, batch, targets, &trace, learning_rate)?;
    Ok(loss)
}

/// Repeat [`train_step`] on one fixed batch for `config.epochs` epochs.
///
/// Unrolled length is capped by `config.max_seq_len`: BPTT without clipping
/// degrades on long sequences, so the cap is enforced here rather than in
/// the backward pass. A NaN or infinite loss stops training with
/// [`ModelError::Training`].
#[instrument(skip_all, fields(epochs = config.epochs, lr = config.learning_rate))]
pub fn train(
    params: &mut LstmParams,
    batch: &Array2<usize>,
    targets: &Array2<usize>,
    config: &TrainingConfig,
) -> Result<TrainingReport> {
    if !config.learning_rate.is_finite() || config.learning_rate < 0.0 {
        return Err(ModelError::InvalidInput {
            message: format!(
                "learning_rate must be finite and non-negative, got {}",
                config.learning_rate
            ),
        });
    }
    if batch.ncols() > config.max_seq_len {
        return Err(ModelError::InvalidInput {
            message: format!(
                "sequence length {} exceeds max_seq_len {}",
                batch.ncols(),
                config.max_seq_len
            ),
        });
    }

    let mut report = TrainingReport {
        losses: Vec::with_capacity(config.epochs),
    };
    let tokens = batch.len() as f64;

    for epoch in 0..config.epochs {
        let loss = train_step(params, batch, targets, config.learning_rate)?;
        if !loss.is_finite() {
            return Err(ModelError::Training {
                message: format!("training diverged at epoch {epoch}: loss is {loss}"),
            });
        }
        report.losses.push(loss);

        if config.log_every > 0 && (epoch % config.log_every == 0 || epoch + 1 == config.epochs) {
            info!(
                epoch = epoch,
                loss = loss,
                loss_per_token = loss / tokens,
                "Training epoch completed"
            );
        }
    }

    Ok(report)
}

/// Cut a token stream into non-overlapping next-token windows.
///
/// Window `k` covers `tokens[k*L .. k*L + L]` as input and the same span
/// shifted by one as target, so each row of the returned `[windows, L]`
/// arrays is one training sequence. A trailing remainder shorter than a
/// full window is dropped.
pub fn sequence_windows(
    tokens: &[usize],
    seq_length: usize,
) -> Result<(Array2<usize>, Array2<usize>)> {
    if seq_length == 0 {
        return Err(ModelError::InvalidInput {
            message: "seq_length must be positive".to_string(),
        });
    }
    let windows = tokens.len().saturating_sub(1) / seq_length;
    if windows == 0 {
        return Err(ModelError::InvalidInput {
            message: format!(
                "need at least {} tokens for one window of length {}, got {}",
                seq_length + 1,
                seq_length,
                tokens.len()
            ),
        });
    }

    let inputs = Array2::from_shape_fn((windows, seq_length), |(w, t)| tokens[w * seq_length + t]);
    let targets =
        Array2::from_shape_fn((windows, seq_length), |(w, t)| tokens[w * seq_length + t + 1]);
    Ok((inputs, targets))
}
