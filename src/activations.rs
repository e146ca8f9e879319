use ndarray::{Array, Array2, ArrayBase, Data, Dimension};

#[inline]
fn sigmoid_scalar(x: f64) -> f64 {
    // Both branches equal 1 / (1 + e^{-x}); the split keeps exp() from overflowing.
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Logistic sigmoid, applied elementwise
///
/// sigmoid(x) = 1 / (1 + e^{-x})
pub fn sigmoid<S, D>(x: &ArrayBase<S, D>) -> Array<f64, D>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    x.mapv(sigmoid_scalar)
}

/// Hyperbolic tangent, applied elementwise
pub fn tanh<S, D>(x: &ArrayBase<S, D>) -> Array<f64, D>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    x.mapv(f64::tanh)
}

/// Column-wise softmax: every column of `x` is one class distribution.
///
/// The column max is subtracted before exponentiating, so any finite input
/// produces non-negative columns summing to one.
pub fn softmax<S>(x: &ArrayBase<S, ndarray::Ix2>) -> Array2<f64>
where
    S: Data<Elem = f64>,
{
    let mut result = x.to_owned();

    for mut column in result.columns_mut() {
        let max_val = column.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        column.mapv_inplace(|v| (v - max_val).exp());
        let sum_exp = column.sum();
        column /= sum_exp;
    }

    result
}

/// d/dx sigmoid(x), expressed through the already computed output s = sigmoid(x)
#[inline]
pub fn sigmoid_derivative_from_output<S, D>(s: &ArrayBase<S, D>) -> Array<f64, D>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    s.mapv(|v| v * (1.0 - v))
}

/// d/dx tanh(x), expressed through the already computed output t = tanh(x)
#[inline]
pub fn tanh_derivative_from_output<S, D>(t: &ArrayBase<S, D>) -> Array<f64, D>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    t.mapv(|v| 1.0 - v * v)
}
