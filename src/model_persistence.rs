use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::fs;

use crate::errors::{ModelError, Result};
use crate::lstm::Lstm;

/// Layout version of the [`VersionedModel`] envelope. Files with a higher
/// number are refused; lower numbers load with a warning.
const MODEL_VERSION: u32 = 1;

/// Encoding of the model payload inside a [`VersionedModel`]
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelFormat {
    Json,
    Binary,
}

impl ModelFormat {
    /// `.json` paths are stored as JSON, everything else as bincode
    pub fn from_path(path: &str) -> Self {
        if path.ends_with(".json") {
            ModelFormat::Json
        } else {
            ModelFormat::Binary
        }
    }
}

/// On-disk envelope around a serialized [`Lstm`].
///
/// The envelope itself is always JSON; `data` holds the model encoded as
/// `format` says, and `checksum` is the hex SHA-256 of exactly those bytes.
#[derive(Serialize, Deserialize, Clone)]
pub struct VersionedModel {
    pub version: u32,
    pub checksum: String,
    pub format: ModelFormat,
    pub data: Vec<u8>,
    pub metadata: ModelMetadata,
}

/// Summary of the stored network, readable without decoding `data`
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ModelMetadata {
    /// RFC 3339 UTC timestamp
    pub saved_at: String,
    pub architecture: String,
    pub num_parameters: usize,
    /// Vocabulary size on the input side
    pub input_dim: usize,
    pub hidden_dim: usize,
    /// Vocabulary size on the output side
    pub output_dim: usize,
    pub description: Option<String>,
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

fn invalid_data(message: String) -> ModelError {
    ModelError::serialization(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        message,
    ))
}

impl VersionedModel {
    /// Encode `model` as `format` and record its dimensions.
    pub fn from_model(
        model: &Lstm,
        format: ModelFormat,
        description: Option<String>,
    ) -> Result<Self> {
        let data = match format {
            ModelFormat::Json => {
                serde_json::to_vec_pretty(model).map_err(ModelError::serialization)?
            }
            ModelFormat::Binary => {
                bincode::serde::encode_to_vec(model, bincode::config::standard())
                    .map_err(ModelError::serialization)?
            }
        };

        let metadata = ModelMetadata {
            saved_at: chrono::Utc::now().to_rfc3339(),
            architecture: "LSTM".to_string(),
            num_parameters: model.total_parameters(),
            input_dim: model.params.input_dim(),
            hidden_dim: model.params.hidden_dim(),
            output_dim: model.params.output_dim(),
            description,
        };

        Ok(VersionedModel {
            version: MODEL_VERSION,
            checksum: sha256_hex(&data),
            format,
            data,
            metadata,
        })
    }

    /// The payload must hash to the recorded checksum
    pub fn validate_checksum(&self) -> Result<()> {
        let actual = sha256_hex(&self.data);
        if actual == self.checksum {
            Ok(())
        } else {
            Err(invalid_data(format!(
                "payload hash {actual} does not match recorded checksum {}",
                self.checksum
            )))
        }
    }

    pub fn validate_version(&self) -> Result<()> {
        match self.version.cmp(&MODEL_VERSION) {
            Ordering::Greater => Err(invalid_data(format!(
                "envelope version {} is not supported (this build reads up to {})",
                self.version, MODEL_VERSION
            ))),
            Ordering::Less => {
                tracing::warn!(
                    version = self.version,
                    current = MODEL_VERSION,
                    "Reading an older model envelope"
                );
                Ok(())
            }
            Ordering::Equal => Ok(()),
        }
    }

    /// Decode the payload after the version and checksum pass; the decoded
    /// parameters must also fit the stored vocabulary.
    pub fn to_model(&self) -> Result<Lstm> {
        self.validate_version()?;
        self.validate_checksum()?;

        let model: Lstm = match self.format {
            ModelFormat::Json => {
                serde_json::from_slice(&self.data).map_err(ModelError::serialization)?
            }
            ModelFormat::Binary => {
                bincode::serde::decode_from_slice::<Lstm, _>(&self.data, bincode::config::standard())
                    .map_err(ModelError::serialization)?
                    .0
            }
        };
        model.validate()?;
        Ok(model)
    }

    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(ModelError::serialization)?;
        fs::write(path, json).map_err(ModelError::from)?;
        Ok(())
    }

    pub fn load_from_file(path: &str) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(ModelError::from)?;
        let versioned_model: VersionedModel =
            serde_json::from_str(&data).map_err(ModelError::serialization)?;
        Ok(versioned_model)
    }
}

impl Lstm {
    /// Write `self` inside a [`VersionedModel`]; a `.json` path stores a
    /// JSON payload, any other path a bincode payload.
    pub fn save_versioned(&self, path: &str, description: Option<String>) -> Result<()> {
        let versioned = VersionedModel::from_model(self, ModelFormat::from_path(path), description)?;
        versioned.save_to_file(path)?;

        tracing::info!(
            path = path,
            format = ?versioned.format,
            checksum = &versioned.checksum[..16],
            parameters = versioned.metadata.num_parameters,
            "Saved versioned model"
        );
        Ok(())
    }

    pub fn load_versioned(path: &str) -> Result<Self> {
        let versioned = VersionedModel::load_from_file(path)?;

        tracing::info!(
            path = path,
            version = versioned.version,
            format = ?versioned.format,
            saved_at = %versioned.metadata.saved_at,
            "Loading versioned model"
        );

        versioned.to_model()
    }
}
