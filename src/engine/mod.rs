//! Inference engine.
//!
//! This module contains:
//! - SpeculativeEngine for orchestrating draft/verify/accept iterations
//! - GenerationStats for per-request performance accounting

pub mod speculative;
pub mod stats;

pub use speculative::{GenerationOutput, GenerationRequest, SpeculativeEngine};
pub use stats::{GenerationStats, StatsSummary};
