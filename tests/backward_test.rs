use lstm::{
    Gradients, LstmParams, ModelError, backward, compute_gradients, cross_entropy, forward,
};
use ndarray::{Array2, array};

const FD_EPS: f64 = 1e-5;
const FD_TOLERANCE: f64 = 1e-4;

fn tensor_mut<'a>(params: &'a mut LstmParams, name: &str) -> &'a mut Array2<f64> {
    match name {
        "wf" => &mut params.wf,
        "wi" => &mut params.wi,
        "wc" => &mut params.wc,
        "wo" => &mut params.wo,
        "wy" => &mut params.wy,
        "bf" => &mut params.bf,
        "bi" => &mut params.bi,
        "bc" => &mut params.bc,
        "bo" => &mut params.bo,
        "by" => &mut params.by,
        other => panic!("unknown parameter {other}"),
    }
}

fn loss(params: &LstmParams, batch: &Array2<usize>, targets: &Array2<usize>) -> f64 {
    let (outputs, _) = forward(params, batch).unwrap();
    cross_entropy(&outputs, targets).unwrap()
}

/// Compare every analytic gradient entry against a central finite difference
fn check_gradients(params: &LstmParams, batch: &Array2<usize>, targets: &Array2<usize>) {
    let (_, trace) = forward(params, batch).unwrap();
    let grads = compute_gradients(params, batch, targets, &trace).unwrap();

    for (name, analytic) in grads.named_tensors() {
        for ((r, c), &expected) in analytic.indexed_iter() {
            let mut plus = params.clone();
            tensor_mut(&mut plus, name)[[r, c]] += FD_EPS;
            let mut minus = params.clone();
            tensor_mut(&mut minus, name)[[r, c]] -= FD_EPS;

            let numeric = (loss(&plus, batch, targets) - loss(&minus, batch, targets)) / (2.0 * FD_EPS);
            assert!(
                (numeric - expected).abs() < FD_TOLERANCE,
                "{name}[{r},{c}]: analytic {expected}, numeric {numeric}"
            );
        }
    }
}

#[test]
fn test_gradient_check_small_model() {
    // hidden_dim=2, vocab_size=3, seq_length=2, batch_size=1
    let params = LstmParams::seeded(3, 2, 3, 0.5, 42).unwrap();
    check_gradients(&params, &array![[0, 2]], &array![[1, 0]]);
}

#[test]
fn test_gradient_check_with_nonzero_biases() {
    let mut params = LstmParams::seeded(3, 2, 3, 0.8, 5).unwrap();
    params.bf.fill(0.3);
    params.bi.fill(-0.2);
    params.bc.fill(0.1);
    params.bo.fill(0.4);
    params.by = array![[0.5], [-0.5], [0.1]];
    check_gradients(&params, &array![[2, 1]], &array![[0, 2]]);
}

#[test]
fn test_gradient_check_batched_longer_sequence() {
    let params = LstmParams::seeded(4, 3, 4, 0.5, 9).unwrap();
    let batch = array![[0, 1, 2], [3, 3, 1]];
    let targets = array![[1, 2, 3], [3, 1, 0]];
    check_gradients(&params, &batch, &targets);
}

#[test]
fn test_gradient_check_single_step() {
    let params = LstmParams::seeded(3, 2, 3, 0.5, 1).unwrap();
    check_gradients(&params, &array![[1]], &array![[2]]);
}

#[test]
fn test_gradient_shapes_match_params() {
    let params = LstmParams::seeded(5, 4, 5, 0.1, 2).unwrap();
    let batch = array![[0, 1]];
    let (_, trace) = forward(&params, &batch).unwrap();
    let grads = compute_gradients(&params, &batch, &array![[1, 2]], &trace).unwrap();

    for ((name, g), (_, p)) in grads.named_tensors().iter().zip(params.named_tensors().iter()) {
        assert_eq!(g.dim(), p.dim(), "gradient shape for {name}");
    }
    assert!(grads.global_norm() > 0.0);
    assert_eq!(Gradients::zeros_like(&params).global_norm(), 0.0);
}

#[test]
fn test_zero_learning_rate_leaves_params_unchanged() {
    let mut params = LstmParams::seeded(5, 4, 5, 0.2, 3).unwrap();
    let before = params.clone();
    let batch = array![[0, 1, 2]];
    let (_, trace) = forward(&params, &batch).unwrap();

    backward(&mut params, &batch, &array![[1, 2, 0]], &trace, 0.0).unwrap();

    assert_eq!(params, before);
}

#[test]
fn test_update_is_plain_gradient_descent() {
    let mut params = LstmParams::seeded(3, 2, 3, 0.4, 8).unwrap();
    let batch = array![[0, 1]];
    let targets = array![[1, 2]];
    let (_, trace) = forward(&params, &batch).unwrap();
    let grads = compute_gradients(&params, &batch, &targets, &trace).unwrap();
    let before = params.clone();

    backward(&mut params, &batch, &targets, &trace, 0.5).unwrap();

    for ((name, updated), ((_, original), (_, grad))) in params
        .named_tensors()
        .into_iter()
        .zip(before.named_tensors().into_iter().zip(grads.named_tensors()))
    {
        let expected = original - &(0.5 * grad);
        let max_diff = (updated - &expected).iter().fold(0.0f64, |m, v| m.max(v.abs()));
        assert!(max_diff < 1e-12, "{name} differs from param - lr * grad by {max_diff}");
    }
}

#[test]
fn test_single_step_backward_runs() {
    let mut params = LstmParams::seeded(3, 2, 3, 0.1, 4).unwrap();
    let batch = array![[2]];
    let (_, trace) = forward(&params, &batch).unwrap();
    assert!(backward(&mut params, &batch, &array![[0]], &trace, 0.1).is_ok());
}

#[test]
fn test_targets_shape_mismatch_fails() {
    let mut params = LstmParams::seeded(3, 2, 3, 0.1, 4).unwrap();
    let batch = array![[0, 1]];
    let (_, trace) = forward(&params, &batch).unwrap();

    let result = backward(&mut params, &batch, &array![[0, 1, 2]], &trace, 0.1);
    assert!(matches!(result, Err(ModelError::ShapeMismatch { .. })));
}

#[test]
fn test_trace_length_mismatch_fails() {
    let mut params = LstmParams::seeded(3, 2, 3, 0.1, 4).unwrap();
    let (_, trace) = forward(&params, &array![[0, 1, 2]]).unwrap();

    let result = backward(&mut params, &array![[0, 1]], &array![[1, 2]], &trace, 0.1);
    assert!(matches!(result, Err(ModelError::ShapeMismatch { .. })));
}

#[test]
fn test_trace_batch_mismatch_fails() {
    let mut params = LstmParams::seeded(3, 2, 3, 0.1, 4).unwrap();
    let (_, trace) = forward(&params, &array![[0, 1]]).unwrap();

    let batch = array![[0, 1], [1, 0]];
    let result = backward(&mut params, &batch, &batch, &trace, 0.1);
    assert!(matches!(result, Err(ModelError::ShapeMismatch { .. })));
}

#[test]
fn test_trace_from_other_hidden_size_fails() {
    let other = LstmParams::seeded(3, 5, 3, 0.1, 4).unwrap();
    let mut params = LstmParams::seeded(3, 2, 3, 0.1, 4).unwrap();
    let batch = array![[0, 1]];
    let (_, trace) = forward(&other, &batch).unwrap();

    let result = backward(&mut params, &batch, &batch, &trace, 0.1);
    assert!(matches!(result, Err(ModelError::ShapeMismatch { .. })));
}

#[test]
fn test_trace_from_other_output_size_fails() {
    let other = LstmParams::seeded(3, 2, 4, 0.1, 4).unwrap();
    let mut params = LstmParams::seeded(3, 2, 3, 0.1, 4).unwrap();
    let batch = array![[0, 1]];
    let (_, trace) = forward(&other, &batch).unwrap();
    let before = params.clone();

    let result = backward(&mut params, &batch, &batch, &trace, 0.1);
    assert!(matches!(result, Err(ModelError::ShapeMismatch { .. })));
    assert_eq!(params, before);
}

#[test]
fn test_target_out_of_range_fails() {
    let mut params = LstmParams::seeded(3, 2, 3, 0.1, 4).unwrap();
    let batch = array![[0, 1]];
    let (_, trace) = forward(&params, &batch).unwrap();
    let before = params.clone();

    let result = backward(&mut params, &batch, &array![[0, 3]], &trace, 0.1);
    assert!(matches!(result, Err(ModelError::IndexOutOfRange { index: 3, .. })));
    assert_eq!(params, before);
}

#[test]
fn test_invalid_learning_rate_fails() {
    let mut params = LstmParams::seeded(3, 2, 3, 0.1, 4).unwrap();
    let batch = array![[0, 1]];
    let (_, trace) = forward(&params, &batch).unwrap();

    for lr in [-0.1, f64::NAN, f64::INFINITY] {
        let result = backward(&mut params, &batch, &batch, &trace, lr);
        assert!(matches!(result, Err(ModelError::InvalidInput { .. })));
    }
}
