use ndarray::{Array2, Array3};

use crate::errors::{ModelError, Result};

const MIN_PROB: f64 = 1e-15;

/// Cross-entropy summed over timesteps and batch columns.
///
/// `outputs` is `[seq_length, output_dim, batch_size]` as returned by
/// [`crate::forward::forward`]; `targets` is `[batch_size, seq_length]`.
/// This is the loss whose gradient [`crate::backward::compute_gradients`]
/// returns.
pub fn cross_entropy(outputs: &Array3<f64>, targets: &Array2<usize>) -> Result<f64> {
    let (seq_length, output_dim, batch_size) = outputs.dim();
    if targets.dim() != (batch_size, seq_length) {
        return Err(ModelError::shape(
            "targets [batch_size, seq_length]",
            (batch_size, seq_length),
            targets.dim(),
        ));
    }

    let mut loss = 0.0;
    for ((b, t), &target) in targets.indexed_iter() {
        if target >= output_dim {
            return Err(ModelError::IndexOutOfRange {
                index: target,
                position: b,
                vocab_size: output_dim,
            });
        }
        let prob_target = outputs[[t, target, b]];
        loss -= prob_target.max(MIN_PROB).ln(); // numerical stability
    }

    Ok(loss)
}

/// Per-token average of [`cross_entropy`], convenient for logging
pub fn mean_cross_entropy(outputs: &Array3<f64>, targets: &Array2<usize>) -> Result<f64> {
    let total = cross_entropy(outputs, targets)?;
    Ok(total / targets.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_cross_entropy_sums_over_batch_and_time() {
        // seq 2, output 2, batch 1
        let outputs = Array3::from_shape_vec((2, 2, 1), vec![0.5, 0.5, 0.25, 0.75]).unwrap();
        let targets = array![[0, 1]];

        let expected = -(0.5_f64.ln()) - 0.75_f64.ln();
        assert_abs_diff_eq!(cross_entropy(&outputs, &targets).unwrap(), expected, epsilon = 1e-12);
        assert_abs_diff_eq!(
            mean_cross_entropy(&outputs, &targets).unwrap(),
            expected / 2.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_cross_entropy_clamps_zero_probability() {
        let outputs = Array3::from_shape_vec((1, 2, 1), vec![0.0, 1.0]).unwrap();
        let loss = cross_entropy(&outputs, &array![[0]]).unwrap();
        assert!(loss.is_finite());
        assert_abs_diff_eq!(loss, -(MIN_PROB.ln()), epsilon = 1e-9);
    }

    #[test]
    fn test_cross_entropy_rejects_bad_targets() {
        let outputs = Array3::from_elem((1, 2, 1), 0.5);
        assert!(matches!(
            cross_entropy(&outputs, &array![[2]]),
            Err(ModelError::IndexOutOfRange { index: 2, .. })
        ));
        assert!(matches!(
            cross_entropy(&outputs, &array![[0, 1]]),
            Err(ModelError::ShapeMismatch { .. })
        ));
    }
}
