//! Error types for spec-ops.

use thiserror::Error;

/// Result type alias for spec-ops operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for spec-ops.
///
/// Load-time failures (`ModelLoad`) keep the engine from reporting ready;
/// everything else aborts a single generation request. No variant is
/// retried automatically.
#[derive(Error, Debug)]
pub enum Error {
    /// Model artifact missing or malformed, or architecture introspection failed.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// The adapter cannot populate an input the model declares.
    #[error("model signature mismatch: {0}")]
    SignatureMismatch(String),

    /// The underlying forward pass failed.
    #[error("scorer invocation failed: {0}")]
    ScorerInvocation(String),

    /// Tokenization error.
    #[error("tokenization error: {0}")]
    Tokenization(String),

    /// Request parameters rejected before any scorer call.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Tensor operation error.
    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
