pub mod activations;
pub mod backward;
pub mod errors;
pub mod forward;
pub mod loss;
pub mod lstm;
pub mod model_config;
pub mod model_persistence;
pub mod one_hot;
pub mod params;
pub mod train;
pub mod vocab;
// Re-export key structs for easier access
pub use backward::{Gradients, backward, compute_gradients};
pub use errors::{ModelError, Result};
pub use forward::{StepCache, Trace, forward};
pub use loss::{cross_entropy, mean_cross_entropy};
pub use lstm::Lstm;
pub use model_config::{Config, ModelConfig, TrainingConfig};
pub use model_persistence::{ModelFormat, ModelMetadata, VersionedModel};
pub use one_hot::one_hot;
pub use params::LstmParams;
pub use train::{TrainingReport, sequence_windows, train, train_step};
pub use vocab::Vocab;

// Constants
pub const MAX_SEQ_LEN: usize = 64;
pub const MAX_VOCAB_SIZE: usize = 512;
pub const DEFAULT_HIDDEN_DIM: usize = 32;
pub const DEFAULT_SEQ_LEN: usize = 16;
pub const DEFAULT_INIT_STD: f64 = 0.01;
pub const DEFAULT_LEARNING_RATE: f64 = 0.1;
pub const DEFAULT_EPOCHS: usize = 200;
pub const DEFAULT_LOG_EVERY: usize = 10;
