//! Speculative decoding engine.
//!
//! Orchestrates draft proposal, batched target verification, prefix-match
//! acceptance, and termination for one generation request at a time.
//!
//! ## Workflow
//!
//! 1. **Draft**: the small draft model proposes K tokens, one pass each
//! 2. **Verify**: the target model scores the whole extended sequence in a
//!    single pass
//! 3. **Accept**: the longest prefix of drafts agreeing with the target's
//!    own predictions is kept, plus one bonus token from the target
//!
//! ## Example
//!
//! ```text
//! Accepted: [The, apple, is]
//! Draft:    [red, ., The]          <- K=3 speculative tokens
//! Target:   verify all 6 positions <- 1 forward pass
//! Result:   [red, ., The, apple]   <- 3 matched + 1 bonus
//! ```
//!
//! Both models decode with greedy argmax, so a run is fully reproducible
//! given the same weights, prompt, K, and budget.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use candle_core::{IndexOp, Tensor, D};
use tracing::{debug, info};

use crate::config::{EngineConfig, GenerationConfig};
use crate::core::sequence::{FinishReason, SequenceBuffer};
use crate::engine::stats::{GenerationStats, StatsSummary};
use crate::error::{Error, Result};
use crate::scorer::{InferenceSession, ModelSignature, ScorerAdapter};
use crate::tokenizer::TextCodec;

/// Request for text generation.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Input prompt text.
    pub prompt: String,
    /// New-token budget (must be at least 1).
    pub max_new_tokens: usize,
    /// Tokens drafted per iteration, K (must be at least 1).
    pub num_draft_tokens: usize,
    /// Cooperative cancellation flag, checked between iterations only.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl GenerationRequest {
    /// Create a request with default generation parameters.
    pub fn new(prompt: impl Into<String>) -> Self {
        let defaults = GenerationConfig::default();
        Self {
            prompt: prompt.into(),
            max_new_tokens: defaults.max_new_tokens,
            num_draft_tokens: defaults.num_draft_tokens,
            cancel: None,
        }
    }

    /// Set the new-token budget.
    pub fn max_new_tokens(mut self, max_new_tokens: usize) -> Self {
        self.max_new_tokens = max_new_tokens;
        self
    }

    /// Set the number of tokens drafted per iteration.
    pub fn draft_tokens(mut self, num_draft_tokens: usize) -> Self {
        self.num_draft_tokens = num_draft_tokens;
        self
    }

    /// Attach a cancellation flag.
    pub fn cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Output from a generation request.
#[derive(Debug, Clone)]
pub struct GenerationOutput {
    /// Input prompt text.
    pub prompt: String,
    /// Decoded final sequence, prompt included, special tokens skipped.
    pub text: String,
    /// Token ids generated beyond the prompt.
    pub output_tokens: Vec<u32>,
    /// Reason generation terminated.
    pub finish_reason: FinishReason,
    /// Per-request performance summary.
    pub stats: StatsSummary,
}

/// Speculative decoding engine.
///
/// Holds one scorer adapter per model, loaded once and shared across
/// requests. Each scorer sits behind a mutex, and a request takes a scoped
/// lease for the duration of one phase (all K draft calls, or the single
/// verify call); the guard's drop releases the scorer on every exit path,
/// so concurrent callers serialize instead of deadlocking. `generate`
/// therefore takes `&self` and the engine can be shared behind an `Arc`.
pub struct SpeculativeEngine {
    /// Large target model (ground truth).
    target: Mutex<ScorerAdapter>,
    /// Small draft model (fast approximation).
    draft: Mutex<ScorerAdapter>,
    /// Text boundary shared by both models.
    codec: TextCodec,
    /// End-of-sequence token id.
    eos_token_id: u32,
    /// Generation defaults and limits.
    generation: GenerationConfig,
}

impl std::fmt::Debug for SpeculativeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeculativeEngine")
            .field("eos_token_id", &self.eos_token_id)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl SpeculativeEngine {
    /// Create an engine from two loaded sessions.
    ///
    /// Architecture metadata is detected for each session independently;
    /// the draft and target signatures are never conflated.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelLoad`] when introspection fails for either
    /// session or no end-of-sequence token id can be resolved.
    pub fn new(
        target: Box<dyn InferenceSession>,
        draft: Box<dyn InferenceSession>,
        codec: TextCodec,
        eos_token_id: Option<u32>,
        generation: GenerationConfig,
    ) -> Result<Self> {
        let target = ScorerAdapter::new(target)?;
        let draft = ScorerAdapter::new(draft)?;

        let eos_token_id = eos_token_id
            .or_else(|| codec.eos_token_id())
            .ok_or_else(|| {
                Error::ModelLoad("cannot determine end-of-sequence token id".into())
            })?;

        info!(
            target_layers = target.signature().num_layers,
            target_heads = target.signature().num_heads,
            draft_layers = draft.signature().num_layers,
            draft_heads = draft.signature().num_heads,
            "engine ready"
        );

        Ok(Self {
            target: Mutex::new(target),
            draft: Mutex::new(draft),
            codec,
            eos_token_id,
            generation,
        })
    }

    /// Load an engine from configured artifact paths.
    ///
    /// `open_session` opens the serialized graph at each path; the
    /// tokenizer is read from the configured tokenizer file.
    pub fn load<S, F>(config: &EngineConfig, mut open_session: F) -> Result<Self>
    where
        S: InferenceSession + 'static,
        F: FnMut(&Path) -> Result<S>,
    {
        let target = open_session(&config.target_model)?;
        let draft = open_session(&config.draft_model)?;
        let codec = TextCodec::from_file(&config.tokenizer)?;
        Self::new(
            Box::new(target),
            Box::new(draft),
            codec,
            config.eos_token_id,
            config.generation.clone(),
        )
    }

    /// Whether both scorers are loaded with detected signatures.
    pub fn is_ready(&self) -> bool {
        lease(&self.target).is_ready() && lease(&self.draft).is_ready()
    }

    /// Architecture metadata of the target model.
    pub fn target_signature(&self) -> ModelSignature {
        *lease(&self.target).signature()
    }

    /// Architecture metadata of the draft model.
    pub fn draft_signature(&self) -> ModelSignature {
        *lease(&self.draft).signature()
    }

    /// A request pre-filled with this engine's configured defaults.
    pub fn default_request(&self, prompt: impl Into<String>) -> GenerationRequest {
        GenerationRequest::new(prompt)
            .max_new_tokens(self.generation.max_new_tokens)
            .draft_tokens(self.generation.num_draft_tokens)
    }

    /// Generate text from a single prompt (convenience method).
    pub fn generate_text(
        &self,
        prompt: &str,
        max_new_tokens: usize,
        num_draft_tokens: usize,
    ) -> Result<GenerationOutput> {
        self.generate(
            GenerationRequest::new(prompt)
                .max_new_tokens(max_new_tokens)
                .draft_tokens(num_draft_tokens),
        )
    }

    /// Run one generation request to termination.
    ///
    /// Each iteration drafts up to K tokens, verifies them in one target
    /// pass, and appends the matched prefix plus one bonus token, so every
    /// iteration makes progress even when nothing matches. The loop exits
    /// on an accepted end-of-sequence token, on budget exhaustion, or on
    /// cancellation; the first two are normal outcomes, not errors.
    ///
    /// # Errors
    ///
    /// Fails atomically (no partial text) when parameters are invalid or
    /// either scorer invocation fails.
    pub fn generate(&self, request: GenerationRequest) -> Result<GenerationOutput> {
        if request.max_new_tokens == 0 {
            return Err(Error::InvalidRequest(
                "max_new_tokens must be at least 1".into(),
            ));
        }
        if request.num_draft_tokens == 0 {
            return Err(Error::InvalidRequest(
                "num_draft_tokens must be at least 1".into(),
            ));
        }

        let max_new_tokens = match self.generation.max_new_tokens_limit {
            Some(limit) => request.max_new_tokens.min(limit),
            None => request.max_new_tokens,
        };

        let prompt_tokens = self.codec.encode(&request.prompt)?;
        if prompt_tokens.is_empty() {
            return Err(Error::Tokenization("empty prompt".into()));
        }

        let mut seq = SequenceBuffer::new(prompt_tokens);
        let mut stats = GenerationStats::start();

        let finish_reason = loop {
            if request.is_cancelled() {
                break FinishReason::Cancelled;
            }

            // Never draft past the remaining budget.
            let remaining = max_new_tokens - seq.new_token_count();
            let k = request.num_draft_tokens.min(remaining);
            let prefix_len = seq.len();

            // DRAFTING: k sequential passes, each conditioned on the last
            // drafted token.
            let mut working = seq.tokens().to_vec();
            {
                let draft = lease(&self.draft);
                for _ in 0..k {
                    let logits = draft.score(&working)?;
                    working.push(last_position_argmax(&logits)?);
                }
            }

            // VERIFYING: one target pass over prefix + k drafted tokens.
            // Predictions cover the last k+1 positions, so the bonus token
            // is defined even when every draft matches.
            let predictions = {
                let target = lease(&self.target);
                let logits = target.score(&working)?;
                tail_argmax(&logits, k + 1)?
            };

            // ACCEPTING: longest agreeing prefix plus the bonus token,
            // clipped to the budget and to the first end-of-sequence token.
            let matched = count_matched(&working[prefix_len..], &predictions);
            let mut accepted = predictions[..=matched].to_vec();
            accepted.truncate(remaining);

            let mut eos_hit = false;
            if let Some(pos) = accepted.iter().position(|&t| t == self.eos_token_id) {
                accepted.truncate(pos + 1);
                eos_hit = true;
            }

            seq.extend(&accepted);
            stats.record_jump(accepted.len() - 1);
            debug!(
                matched,
                accepted = accepted.len(),
                seq_len = seq.len(),
                "speculative jump"
            );

            if eos_hit {
                break FinishReason::EndOfSequence;
            }
            if seq.new_token_count() >= max_new_tokens {
                break FinishReason::MaxTokens;
            }
        };

        let text = self.codec.decode(seq.tokens(), true)?;
        let stats = stats.finalize();
        debug!(
            finish_reason = ?finish_reason,
            tokens = stats.tokens_generated,
            avg_jump = stats.avg_tokens_per_jump,
            "generation finished"
        );

        Ok(GenerationOutput {
            prompt: request.prompt,
            text,
            output_tokens: seq.generated().to_vec(),
            finish_reason,
            stats,
        })
    }
}

/// Take a scoped lease on a shared scorer.
fn lease(slot: &Mutex<ScorerAdapter>) -> MutexGuard<'_, ScorerAdapter> {
    // score() keeps no cross-call state, so an adapter behind a poisoned
    // lock is still usable.
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Greedy prediction at the final position of `[1, seq, vocab]` logits.
fn last_position_argmax(logits: &Tensor) -> Result<u32> {
    let seq_len = logits.dim(1)?;
    let token = logits
        .i((0, seq_len - 1))?
        .argmax(D::Minus1)?
        .to_scalar::<u32>()?;
    Ok(token)
}

/// Greedy predictions for the last `count` positions of `[1, seq, vocab]`
/// logits.
fn tail_argmax(logits: &Tensor, count: usize) -> Result<Vec<u32>> {
    let seq_len = logits.dim(1)?;
    let predictions = logits
        .i(0)?
        .narrow(0, seq_len - count, count)?
        .argmax(D::Minus1)?
        .to_vec1::<u32>()?;
    Ok(predictions)
}

/// Length of the leading run where drafted tokens equal the target's
/// predictions, by exact token-id equality.
fn count_matched(drafted: &[u32], predictions: &[u32]) -> usize {
    drafted
        .iter()
        .zip(predictions.iter())
        .take_while(|(d, p)| d == p)
        .count()
}
