//! Configuration types for spec-ops.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Engine configuration.
///
/// Names the serialized model artifacts on disk and the generation
/// defaults. Architecture metadata (layer and head counts) is never
/// configured here: the scorer adapter reads it from each artifact at
/// load time, so the two cannot disagree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Path to the target model artifact (graph plus referenced weights).
    pub target_model: PathBuf,
    /// Path to the draft model artifact.
    pub draft_model: PathBuf,
    /// Path to the tokenizer file shared by both models.
    pub tokenizer: PathBuf,
    /// End-of-sequence token override. When absent the tokenizer's
    /// special-token table is consulted.
    #[serde(default)]
    pub eos_token_id: Option<u32>,
    /// Generation defaults and limits.
    #[serde(default)]
    pub generation: GenerationConfig,
}

impl EngineConfig {
    /// Load an engine configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }
}

/// Generation defaults and per-request limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Default new-token budget per request.
    pub max_new_tokens: usize,

    /// Number of tokens to draft per iteration (K).
    /// Higher values amortize the target pass over more tokens when the
    /// acceptance rate is high, but waste draft passes when it is low.
    pub num_draft_tokens: usize,

    /// Hard cap applied to the requested budget (None = uncapped).
    #[serde(default)]
    pub max_new_tokens_limit: Option<usize>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_new_tokens: 15,
            num_draft_tokens: 4,
            max_new_tokens_limit: None,
        }
    }
}
