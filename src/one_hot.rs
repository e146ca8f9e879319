use ndarray::{Array2, ArrayBase, Data, Ix1};

use crate::errors::{ModelError, Result};

/// Project token indices onto indicator columns.
///
/// Returns a `[vocab_size, indices.len()]` matrix with a single `1.0` per
/// column, at the row named by the index. An index outside the vocabulary
/// is an error; nothing is clamped.
pub fn one_hot<S>(indices: &ArrayBase<S, Ix1>, vocab_size: usize) -> Result<Array2<f64>>
where
    S: Data<Elem = usize>,
{
    if vocab_size == 0 {
        return Err(ModelError::InvalidInput {
            message: "one-hot vocabulary size must be positive".to_string(),
        });
    }

    let mut encoded = Array2::zeros((vocab_size, indices.len()));
    for (position, &index) in indices.iter().enumerate() {
        if index >= vocab_size {
            return Err(ModelError::IndexOutOfRange {
                index,
                position,
                vocab_size,
            });
        }
        encoded[[index, position]] = 1.0;
    }

    Ok(encoded)
}
