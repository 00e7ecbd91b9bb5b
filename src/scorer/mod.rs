//! Scorer boundary and adapter.
//!
//! This module contains:
//! - InferenceSession, the narrow contract to the external forward-pass
//!   collaborator
//! - ModelSignature for load-time architecture introspection
//! - ScorerAdapter for building conformant input sets per call

pub mod adapter;
pub mod session;
pub mod signature;

pub use adapter::ScorerAdapter;
pub use session::{InferenceSession, InputFeed};
pub use signature::{ModelSignature, TensorDecl};
