//! Scorer adapter.
//!
//! Wraps one loaded session and builds the full input set its graph
//! requires on every call: token ids, an all-ones attention mask, optional
//! position ids and cache-branch flag, and an empty placeholder cache
//! tensor per declared cache layer. The empty caches signal "no prior
//! cache", so every call is a fresh full-sequence forward pass.

use candle_core::{DType, Device, Tensor};
use tracing::debug;

use crate::error::{Error, Result};
use crate::scorer::session::{InferenceSession, InputFeed};
use crate::scorer::signature::ModelSignature;

/// Adapter from token sequences to one model's input signature.
///
/// Architecture metadata is detected once at construction; `score` then
/// builds a conformant feed per call. Two adapters never share metadata:
/// the draft and target models differ in layer and head counts in general.
pub struct ScorerAdapter {
    session: Box<dyn InferenceSession>,
    signature: ModelSignature,
    device: Device,
}

impl std::fmt::Debug for ScorerAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScorerAdapter")
            .field("signature", &self.signature)
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

impl ScorerAdapter {
    /// Wrap a session, detecting its architecture from the declared inputs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelLoad`] when introspection fails.
    pub fn new(session: Box<dyn InferenceSession>) -> Result<Self> {
        let signature = ModelSignature::detect(session.input_decls())?;
        debug!(
            layers = signature.num_layers,
            heads = signature.num_heads,
            head_dim = signature.head_dim,
            "detected model architecture"
        );
        Ok(Self {
            session,
            signature,
            device: Device::Cpu,
        })
    }

    /// The detected architecture metadata.
    pub fn signature(&self) -> &ModelSignature {
        &self.signature
    }

    /// Whether the adapter holds a loaded session with a detected signature.
    pub fn is_ready(&self) -> bool {
        self.signature.num_layers > 0
    }

    /// Compute logits for every position of a non-empty token sequence.
    ///
    /// Returns logits of shape `[1, seq_len, vocab_size]`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidRequest`] for an empty sequence
    /// - [`Error::SignatureMismatch`] when the graph declares an input the
    ///   adapter cannot populate
    /// - [`Error::ScorerInvocation`] when the forward pass fails or returns
    ///   malformed logits
    pub fn score(&self, tokens: &[u32]) -> Result<Tensor> {
        if tokens.is_empty() {
            return Err(Error::InvalidRequest(
                "cannot score an empty sequence".into(),
            ));
        }

        let feed = self.build_feed(tokens)?;
        let logits = self
            .session
            .run(&feed)
            .map_err(|e| Error::ScorerInvocation(e.to_string()))?;

        let dims = logits.dims();
        if dims.len() != 3 || dims[1] != tokens.len() {
            return Err(Error::ScorerInvocation(format!(
                "expected logits of shape [1, {}, vocab], got {dims:?}",
                tokens.len()
            )));
        }

        Ok(logits)
    }

    /// Build the feed for one call, honoring declaration order.
    fn build_feed(&self, tokens: &[u32]) -> Result<InputFeed> {
        let len = tokens.len();
        let mut feed = InputFeed::new();

        for decl in self.session.input_decls() {
            let tensor = match decl.name.as_str() {
                "input_ids" => {
                    let ids: Vec<i64> = tokens.iter().map(|&t| i64::from(t)).collect();
                    Tensor::from_vec(ids, (1, len), &self.device)?
                }
                "attention_mask" => Tensor::ones((1, len), DType::I64, &self.device)?,
                "position_ids" => {
                    Tensor::arange(0i64, len as i64, &self.device)?.reshape((1, len))?
                }
                // Zero scalar: the cache branch stays disabled.
                "use_cache_branch" => Tensor::from_vec(vec![0u8], 1, &self.device)?,
                name if name.contains("past_key_values") => Tensor::zeros(
                    (1, self.signature.num_heads, 0, self.signature.head_dim),
                    DType::F32,
                    &self.device,
                )?,
                name => {
                    return Err(Error::SignatureMismatch(format!(
                        "cannot populate declared input {name:?}"
                    )));
                }
            };
            feed.insert(decl.name.clone(), tensor);
        }

        Ok(feed)
    }
}
