use std::cmp::Ordering;
use std::fs;

use ndarray::{Array2, Array3, Axis};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::errors::{ModelError, Result};
use crate::forward::{Trace, forward};
use crate::model_config::{ModelConfig, TrainingConfig};
use crate::params::LstmParams;
use crate::train::{TrainingReport, sequence_windows, train};
use crate::vocab::Vocab;
use crate::MAX_SEQ_LEN;

/// Character-level language model: a vocabulary and the LSTM reading it.
///
/// Input and output dimensions both equal the vocabulary size.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Lstm {
    pub vocab: Vocab,
    pub params: LstmParams,
}

impl Lstm {
    pub fn new(vocab: Vocab, config: &ModelConfig) -> Result<Self> {
        config.validate()?;
        let vocab_size = vocab.size();
        let seed = config.seed.unwrap_or_else(rand::random);
        let params = LstmParams::seeded(
            vocab_size,
            config.hidden_dim,
            vocab_size,
            config.init_std,
            seed,
        )?;
        info!(
            vocab_size = vocab_size,
            hidden_dim = config.hidden_dim,
            parameters = params.parameters(),
            "Created LSTM model"
        );
        Ok(Self { vocab, params })
    }

    /// Model whose vocabulary is every distinct character of `text`
    pub fn from_text(text: &str, config: &ModelConfig) -> Result<Self> {
        Self::new(Vocab::try_from_text(text)?, config)
    }

    pub fn total_parameters(&self) -> usize {
        self.params.parameters()
    }

    pub fn forward(&self, batch: &Array2<usize>) -> Result<(Array3<f64>, Trace)> {
        forward(&self.params, batch)
    }

    /// Train on `text` split into `config.seq_length` windows, all in one batch
    #[instrument(skip(self, text, config), fields(chars = text.len()))]
    pub fn train_text(&mut self, text: &str, config: &TrainingConfig) -> Result<TrainingReport> {
        config.validate()?;
        let tokens = self.vocab.encode_text(text)?;
        let (inputs, targets) = sequence_windows(&tokens, config.seq_length)?;
        info!(
            windows = inputs.nrows(),
            seq_length = inputs.ncols(),
            "Prepared training batch"
        );
        train(&mut self.params, &inputs, &targets, config)
    }

    /// Most likely next character after `prompt`
    pub fn predict_next(&self, prompt: &str) -> Result<char> {
        let tokens = self.vocab.encode_text(prompt)?;
        let next = self.next_token(&tokens)?;
        self.vocab
            .decode(next)
            .ok_or(ModelError::IndexOutOfRange {
                index: next,
                position: 0,
                vocab_size: self.vocab.size(),
            })
    }

    /// Greedy continuation of `prompt` by `length` characters
    #[instrument(skip(self))]
    pub fn generate(&self, prompt: &str, length: usize) -> Result<String> {
        let mut tokens = self.vocab.encode_text(prompt)?;
        let mut generated = Vec::with_capacity(length);
        for _ in 0..length {
            let next = self.next_token(&tokens)?;
            tokens.push(next);
            generated.push(next);
        }
        self.vocab.decode_text(generated)
    }

    fn next_token(&self, tokens: &[usize]) -> Result<usize> {
        if tokens.is_empty() {
            return Err(ModelError::InvalidInput {
                message: "prompt must contain at least one character".to_string(),
            });
        }
        // Only the most recent MAX_SEQ_LEN tokens are unrolled
        let context = &tokens[tokens.len().saturating_sub(MAX_SEQ_LEN)..];
        let batch = Array2::from_shape_vec((1, context.len()), context.to_vec())?;
        let (outputs, _) = forward(&self.params, &batch)?;

        let last = outputs.index_axis(Axis(0), outputs.len_of(Axis(0)) - 1);
        Self::greedy_decode(last.column(0).iter().copied()).ok_or(ModelError::InvalidInput {
            message: "empty output distribution".to_string(),
        })
    }

    fn greedy_decode(probs: impl Iterator<Item = f64>) -> Option<usize> {
        probs
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(Ordering::Equal))
            .map(|(index, _)| index)
    }

    /// Save model to JSON format (human-readable, larger file size)
    pub fn save_json(&self, path: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(ModelError::serialization)?;
        fs::write(path, json).map_err(ModelError::from)?;
        Ok(())
    }

    /// Load model from JSON format
    pub fn load_json(path: &str) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(ModelError::from)?;
        let model: Lstm = serde_json::from_str(&data).map_err(ModelError::serialization)?;
        model.validate()?;
        Ok(model)
    }

    /// Save model to binary format (compact, faster, smaller file size)
    pub fn save_binary(&self, path: &str) -> Result<()> {
        let config = bincode::config::standard();
        let encoded =
            bincode::serde::encode_to_vec(self, config).map_err(ModelError::serialization)?;
        fs::write(path, encoded).map_err(ModelError::from)?;
        Ok(())
    }

    /// Load model from binary format
    pub fn load_binary(path: &str) -> Result<Self> {
        let data = fs::read(path).map_err(ModelError::from)?;
        let config = bincode::config::standard();
        let (model, _): (Lstm, usize) =
            bincode::serde::decode_from_slice(&data, config).map_err(ModelError::serialization)?;
        model.validate()?;
        Ok(model)
    }

    /// Save model (auto-detects format from extension: .json or .bin)
    pub fn save(&self, path: &str) -> Result<()> {
        if path.ends_with(".json") {
            self.save_json(path)
        } else {
            self.save_binary(path)
        }
    }

    /// Load model (auto-detects format from extension: .json or .bin)
    pub fn load(path: &str) -> Result<Self> {
        if path.ends_with(".json") {
            Self::load_json(path)
        } else {
            Self::load_binary(path)
        }
    }

    /// Parameter shapes must agree with each other and with the vocabulary
    pub fn validate(&self) -> Result<()> {
        self.vocab.validate()?;
        self.params.validate()?;
        let vocab_size = self.vocab.size();
        if self.params.input_dim() != vocab_size || self.params.output_dim() != vocab_size {
            return Err(ModelError::shape(
                "model input/output dims vs vocabulary",
                (vocab_size, vocab_size),
                (self.params.input_dim(), self.params.output_dim()),
            ));
        }
        Ok(())
    }
}
