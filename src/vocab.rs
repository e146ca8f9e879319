use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::errors::{ModelError, Result};

/// Character vocabulary: the sorted set of symbols seen in a corpus.
///
/// Index `i` is the `i`-th symbol in sort order, so encoded tokens are
/// always `< size()` and can feed the one-hot input layer directly.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Vocab {
    symbols: Vec<char>,
}

impl Default for Vocab {
    fn default() -> Self {
        Self::new(Self::default_symbols())
    }
}

impl Vocab {
    /// Symbols past `MAX_VOCAB_SIZE` in sort order are dropped with a warning;
    /// use [`Vocab::try_new`] to reject them instead.
    pub fn new<I>(symbols: I) -> Self
    where
        I: IntoIterator<Item = char>,
    {
        let distinct = symbols.into_iter().collect::<BTreeSet<char>>();
        if distinct.len() > crate::MAX_VOCAB_SIZE {
            tracing::warn!(
                distinct = distinct.len(),
                kept = crate::MAX_VOCAB_SIZE,
                "Vocabulary truncated; dropped symbols will fail to encode"
            );
        }
        let symbols: Vec<char> = distinct.into_iter().take(crate::MAX_VOCAB_SIZE).collect();

        tracing::info!(vocab_size = symbols.len(), "Vocabulary initialized");
        Vocab { symbols }
    }

    pub fn try_new<I>(symbols: I) -> Result<Self>
    where
        I: IntoIterator<Item = char>,
    {
        let distinct = symbols.into_iter().collect::<BTreeSet<char>>();
        if distinct.len() > crate::MAX_VOCAB_SIZE {
            return Err(ModelError::InvalidInput {
                message: format!(
                    "{} distinct symbols exceed the vocabulary limit of {}",
                    distinct.len(),
                    crate::MAX_VOCAB_SIZE
                ),
            });
        }
        Ok(Self::new(distinct))
    }

    /// Build a vocabulary from every distinct character of `text`
    pub fn from_text(text: &str) -> Self {
        Self::new(text.chars())
    }

    /// Like [`Vocab::from_text`], but a text with too many distinct
    /// characters is an error
    pub fn try_from_text(text: &str) -> Result<Self> {
        Self::try_new(text.chars())
    }

    /// Symbols must be strictly increasing for `encode` to be correct.
    /// Only a deserialized vocabulary can break this.
    pub fn validate(&self) -> Result<()> {
        if !self.symbols.windows(2).all(|w| w[0] < w[1]) {
            return Err(ModelError::InvalidInput {
                message: "vocabulary symbols are not sorted and unique".to_string(),
            });
        }
        if self.symbols.len() > crate::MAX_VOCAB_SIZE {
            return Err(ModelError::InvalidInput {
                message: format!(
                    "vocabulary size {} exceeds limit {}",
                    self.symbols.len(),
                    crate::MAX_VOCAB_SIZE
                ),
            });
        }
        Ok(())
    }

    /// Convert a symbol to its token index
    #[inline]
    pub fn encode(&self, symbol: char) -> Option<usize> {
        self.symbols.binary_search(&symbol).ok()
    }

    /// Tokenize a whole string; any unknown character is an error
    pub fn encode_text(&self, text: &str) -> Result<Vec<usize>> {
        text.chars()
            .map(|c| {
                self.encode(c).ok_or_else(|| ModelError::Tokenization {
                    message: format!("character {c:?} is not in the vocabulary"),
                })
            })
            .collect()
    }

    /// Convert a token index back to its symbol
    #[inline]
    pub fn decode(&self, token_id: usize) -> Option<char> {
        self.symbols.get(token_id).copied()
    }

    pub fn decode_text<I>(&self, token_ids: I) -> Result<String>
    where
        I: IntoIterator<Item = usize>,
    {
        token_ids
            .into_iter()
            .map(|id| {
                self.decode(id).ok_or(ModelError::IndexOutOfRange {
                    index: id,
                    position: 0,
                    vocab_size: self.size(),
                })
            })
            .collect()
    }

    pub fn contains(&self, symbol: char) -> bool {
        self.encode(symbol).is_some()
    }

    pub fn size(&self) -> usize {
        self.symbols.len()
    }

    pub fn symbols(&self) -> &[char] {
        &self.symbols
    }

    pub fn default_symbols() -> Vec<char> {
        "abcdefghijklmnopqrstuvwxyz .,".chars().collect()
    }
}
