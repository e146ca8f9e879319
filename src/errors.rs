use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        context: String,
        expected: String,
        actual: String,
    },

    #[error("Index {index} at position {position} is out of range for vocabulary size {vocab_size}")]
    IndexOutOfRange {
        index: usize,
        position: usize,
        vocab_size: usize,
    },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Training error: {message}")]
    Training { message: String },

    #[error("Tokenization error: {message}")]
    Tokenization { message: String },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

impl ModelError {
    pub(crate) fn shape(
        context: impl Into<String>,
        expected: impl std::fmt::Debug,
        actual: impl std::fmt::Debug,
    ) -> Self {
        ModelError::ShapeMismatch {
            context: context.into(),
            expected: format!("{expected:?}"),
            actual: format!("{actual:?}"),
        }
    }

    pub(crate) fn serialization<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ModelError::Serialization {
            source: Box::new(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;
