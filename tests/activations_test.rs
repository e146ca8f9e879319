use approx::assert_abs_diff_eq;
use lstm::activations::{
    sigmoid, sigmoid_derivative_from_output, softmax, tanh, tanh_derivative_from_output,
};
use ndarray::{Array1, Array2, Array3, array};
use proptest::prelude::*;

#[test]
fn test_sigmoid_known_values() {
    let x = array![-2.0, 0.0, 2.0];
    let y = sigmoid(&x);

    assert_abs_diff_eq!(y[1], 0.5, epsilon = 1e-12);
    assert_abs_diff_eq!(y[2], 1.0 / (1.0 + (-2.0f64).exp()), epsilon = 1e-12);
    // sigmoid(-x) = 1 - sigmoid(x)
    assert_abs_diff_eq!(y[0], 1.0 - y[2], epsilon = 1e-12);
}

#[test]
fn test_sigmoid_saturates_without_nan() {
    let x = array![-1000.0, 1000.0];
    let y = sigmoid(&x);
    assert!(y.iter().all(|v| v.is_finite()));
    assert_abs_diff_eq!(y[0], 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(y[1], 1.0, epsilon = 1e-12);
}

#[test]
fn test_activations_preserve_shape() {
    let x = Array3::<f64>::from_shape_fn((2, 3, 4), |(a, b, c)| (a + b) as f64 - c as f64);
    assert_eq!(sigmoid(&x).shape(), &[2, 3, 4]);
    assert_eq!(tanh(&x).shape(), &[2, 3, 4]);

    let v = Array1::<f64>::zeros(5);
    assert_eq!(tanh(&v), Array1::<f64>::zeros(5));
}

#[test]
fn test_derivatives_from_outputs() {
    let s = sigmoid(&array![[0.0, 1.5]]);
    let ds = sigmoid_derivative_from_output(&s);
    assert_abs_diff_eq!(ds[[0, 0]], 0.25, epsilon = 1e-12);

    let t = tanh(&array![[0.0, 0.7]]);
    let dt = tanh_derivative_from_output(&t);
    assert_abs_diff_eq!(dt[[0, 0]], 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(dt[[0, 1]], 1.0 - 0.7f64.tanh().powi(2), epsilon = 1e-12);
}

#[test]
fn test_softmax_stable_for_large_logits() {
    let x = array![[1000.0, -1000.0], [1001.0, -999.0], [999.0, -1001.0]];
    let y = softmax(&x);

    assert!(y.iter().all(|v| v.is_finite() && *v >= 0.0));
    for column in y.columns() {
        assert_abs_diff_eq!(column.sum(), 1.0, epsilon = 1e-12);
    }
    // Shifting a column by a constant leaves its distribution unchanged
    assert_abs_diff_eq!(y[[1, 0]], y[[1, 1]], epsilon = 1e-12);
}

#[test]
fn test_softmax_uniform_for_equal_logits() {
    let y = softmax(&Array2::<f64>::zeros((4, 3)));
    assert!(y.iter().all(|&v| (v - 0.25).abs() < 1e-12));
}

proptest! {
    #[test]
    fn prop_softmax_columns_are_distributions(
        (rows, cols, values) in (1usize..8, 1usize..5)
            .prop_flat_map(|(r, c)| (Just(r), Just(c), prop::collection::vec(-500.0f64..500.0, r * c)))
    ) {
        let x = Array2::from_shape_vec((rows, cols), values).unwrap();
        let y = softmax(&x);

        prop_assert_eq!(y.dim(), (rows, cols));
        for column in y.columns() {
            prop_assert!(column.iter().all(|&p| p >= 0.0));
            prop_assert!((column.sum() - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn prop_sigmoid_in_unit_interval(x in prop::collection::vec(-1e4f64..1e4, 1..32)) {
        let y = sigmoid(&Array1::from(x));
        prop_assert!(y.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }
}
