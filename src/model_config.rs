use std::fs;

use serde::{Deserialize, Serialize};

use crate::errors::{ModelError, Result};
use crate::{
    DEFAULT_EPOCHS, DEFAULT_HIDDEN_DIM, DEFAULT_INIT_STD, DEFAULT_LEARNING_RATE, DEFAULT_LOG_EVERY,
    DEFAULT_SEQ_LEN, MAX_SEQ_LEN,
};

/// Shape and initialization of the network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Width of the hidden and cell state
    pub hidden_dim: usize,
    /// Standard deviation of the normal weight initialization
    pub init_std: f64,
    /// Fixed seed for reproducible initialization; `None` draws from the thread RNG
    pub seed: Option<u64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            hidden_dim: DEFAULT_HIDDEN_DIM,
            init_std: DEFAULT_INIT_STD,
            seed: None,
        }
    }
}

/// Knobs of the training loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Plain gradient-descent step size; zero freezes the parameters
    pub learning_rate: f64,
    pub epochs: usize,
    /// Length of each training window cut from the token stream
    pub seq_length: usize,
    /// Upper bound on the unrolled length; longer batches are rejected
    pub max_seq_len: usize,
    /// Emit an epoch log line every `log_every` epochs (0 disables)
    pub log_every: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            learning_rate: DEFAULT_LEARNING_RATE,
            epochs: DEFAULT_EPOCHS,
            seq_length: DEFAULT_SEQ_LEN,
            max_seq_len: MAX_SEQ_LEN,
            log_every: DEFAULT_LOG_EVERY,
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.learning_rate.is_finite() || self.learning_rate < 0.0 {
            return Err(ModelError::InvalidInput {
                message: format!(
                    "learning_rate must be finite and non-negative, got {}",
                    self.learning_rate
                ),
            });
        }
        if self.seq_length == 0 {
            return Err(ModelError::InvalidInput {
                message: "seq_length must be positive".to_string(),
            });
        }
        if self.seq_length > self.max_seq_len {
            return Err(ModelError::InvalidInput {
                message: format!(
                    "seq_length {} exceeds max_seq_len {}",
                    self.seq_length, self.max_seq_len
                ),
            });
        }
        Ok(())
    }
}

impl ModelConfig {
    pub fn validate(&self) -> Result<()> {
        if self.hidden_dim == 0 {
            return Err(ModelError::InvalidInput {
                message: "hidden_dim must be positive".to_string(),
            });
        }
        if !self.init_std.is_finite() || self.init_std <= 0.0 {
            return Err(ModelError::InvalidInput {
                message: format!("init_std must be finite and positive, got {}", self.init_std),
            });
        }
        Ok(())
    }
}

/// Complete run configuration, as read from a JSON file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: ModelConfig,
    pub training: TrainingConfig,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        self.model.validate()?;
        self.training.validate()
    }

    /// Read and validate a JSON config; missing fields take their defaults
    pub fn from_json_file(path: &str) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(ModelError::from)?;
        let config: Config = serde_json::from_str(&raw).map_err(ModelError::serialization)?;
        config.validate()?;
        tracing::info!(path = path, "Loaded configuration");
        Ok(config)
    }

    pub fn to_json_file(&self, path: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(ModelError::serialization)?;
        fs::write(path, json).map_err(ModelError::from)?;
        Ok(())
    }
}
