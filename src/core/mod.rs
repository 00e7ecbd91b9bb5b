//! Core infrastructure for spec-ops.
//!
//! This module contains the fundamental building blocks:
//! - SequenceBuffer, the token sequence under construction for one request
//! - FinishReason for terminal states

pub mod sequence;

pub use sequence::{FinishReason, SequenceBuffer};
