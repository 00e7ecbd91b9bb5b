//! Load-time architecture introspection.
//!
//! A model's layer count, head count, and head dimension are read from the
//! inputs the graph declares rather than from a separate config file, so
//! the two can never disagree.

use serde::Serialize;

use crate::error::{Error, Result};

/// Declared graph input name prefix for per-layer cache tensors.
const CACHE_INPUT_PREFIX: &str = "past_key_values";

/// The key input of the first cache layer, used to read head geometry.
const FIRST_KEY_INPUT: &str = "past_key_values.0.key";

/// One declared graph input: a name plus a shape whose dynamic dimensions
/// (batch, sequence length) are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorDecl {
    /// Input name as declared by the graph.
    pub name: String,
    /// Declared shape; `None` marks a dynamic dimension.
    pub shape: Vec<Option<usize>>,
}

impl TensorDecl {
    /// Create a declaration.
    pub fn new(name: impl Into<String>, shape: Vec<Option<usize>>) -> Self {
        Self {
            name: name.into(),
            shape,
        }
    }
}

/// Per-model architecture metadata, detected once at load time.
///
/// Immutable after detection and shared read-only by every request that
/// scores against the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelSignature {
    /// Number of cache layers (each contributes a key and a value input).
    pub num_layers: usize,
    /// Attention head count, from dim 1 of the first key input.
    pub num_heads: usize,
    /// Per-head dimension, from dim 3 of the first key input.
    pub head_dim: usize,
    /// Whether the graph declares a `position_ids` input.
    pub has_position_ids: bool,
    /// Whether the graph declares a `use_cache_branch` input.
    pub has_cache_branch_flag: bool,
}

impl ModelSignature {
    /// Detect the signature from a graph's declared inputs.
    ///
    /// Deterministic, run once per model load.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelLoad`] when no cache-layer inputs are
    /// declared, when key/value inputs are unpaired, or when the first key
    /// input does not carry fixed head geometry.
    pub fn detect(inputs: &[TensorDecl]) -> Result<Self> {
        let cache_inputs = inputs
            .iter()
            .filter(|d| d.name.contains(CACHE_INPUT_PREFIX))
            .count();

        if cache_inputs == 0 {
            return Err(Error::ModelLoad(
                "no cache-layer inputs declared; cannot detect architecture".into(),
            ));
        }
        if cache_inputs % 2 != 0 {
            return Err(Error::ModelLoad(format!(
                "unpaired cache inputs: {cache_inputs} declared, expected key/value pairs"
            )));
        }

        let first_key = inputs
            .iter()
            .find(|d| d.name.contains(FIRST_KEY_INPUT))
            .ok_or_else(|| Error::ModelLoad(format!("missing {FIRST_KEY_INPUT} input")))?;

        if first_key.shape.len() != 4 {
            return Err(Error::ModelLoad(format!(
                "{FIRST_KEY_INPUT} is rank {}, expected rank 4",
                first_key.shape.len()
            )));
        }

        let num_heads = first_key.shape[1].ok_or_else(|| {
            Error::ModelLoad(format!("{FIRST_KEY_INPUT} has a dynamic head count"))
        })?;
        let head_dim = first_key.shape[3].ok_or_else(|| {
            Error::ModelLoad(format!("{FIRST_KEY_INPUT} has a dynamic head dimension"))
        })?;

        Ok(Self {
            num_layers: cache_inputs / 2,
            num_heads,
            head_dim,
            has_position_ids: inputs.iter().any(|d| d.name == "position_ids"),
            has_cache_branch_flag: inputs.iter().any(|d| d.name == "use_cache_branch"),
        })
    }
}
