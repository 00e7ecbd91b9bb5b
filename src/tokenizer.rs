//! Tokenizer boundary.
//!
//! Thin wrapper over the external encode/decode collaborator. The
//! controller treats it as opaque: text in, token ids out, and back.

use std::path::Path;

use tokenizers::Tokenizer;

use crate::error::{Error, Result};

/// End-of-sequence token names tried in order when no override is set.
const EOS_CANDIDATES: &[&str] = &["<|endoftext|>", "</s>", "<|im_end|>"];

/// Text to token-id codec for one model family.
pub struct TextCodec {
    tokenizer: Tokenizer,
}

impl TextCodec {
    /// Wrap an already constructed tokenizer.
    pub fn new(tokenizer: Tokenizer) -> Self {
        Self { tokenizer }
    }

    /// Load a tokenizer from a `tokenizer.json` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let tokenizer = Tokenizer::from_file(path.as_ref())
            .map_err(|e| Error::ModelLoad(format!("failed to load tokenizer: {e}")))?;
        Ok(Self { tokenizer })
    }

    /// Encode text to token ids, without adding special tokens.
    pub fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| Error::Tokenization(e.to_string()))?;
        Ok(encoding.get_ids().to_vec())
    }

    /// Decode token ids back to text.
    pub fn decode(&self, ids: &[u32], skip_special_tokens: bool) -> Result<String> {
        self.tokenizer
            .decode(ids, skip_special_tokens)
            .map_err(|e| Error::Tokenization(e.to_string()))
    }

    /// Look up the end-of-sequence token id from the vocabulary.
    pub fn eos_token_id(&self) -> Option<u32> {
        EOS_CANDIDATES
            .iter()
            .find_map(|name| self.tokenizer.token_to_id(name))
    }

    /// Access the wrapped tokenizer.
    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }
}
