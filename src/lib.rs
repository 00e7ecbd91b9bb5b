//! spec-ops: a speculative decoding inference engine.
//!
//! Pairs a small draft model with a larger target model: the draft
//! proposes K tokens cheaply, the target verifies them in one batched
//! pass, and only the agreeing prefix plus one bonus token is kept. This
//! cuts the number of expensive target passes per generated token while
//! producing exactly the target model's greedy output.
//!
//! The neural network itself stays behind the [`InferenceSession`]
//! boundary; this crate owns signature introspection, input-set
//! construction, the draft/verify/accept loop, and performance accounting.

pub mod config;
pub mod error;

pub mod core;
pub mod engine;
pub mod scorer;
pub mod tokenizer;

pub use config::{EngineConfig, GenerationConfig};
pub use crate::core::sequence::{FinishReason, SequenceBuffer};
pub use engine::{GenerationOutput, GenerationRequest, SpeculativeEngine, StatsSummary};
pub use error::{Error, Result};
pub use scorer::{InferenceSession, InputFeed, ModelSignature, ScorerAdapter, TensorDecl};
pub use tokenizer::TextCodec;
