//! The forward-pass collaborator contract.
//!
//! A session is one loaded model graph: it declares the inputs it expects
//! and runs a full forward pass over a feed of named tensors. How the graph
//! is executed (runtime binding, device, kernels) is entirely the session
//! implementation's business; the crate only builds feeds and reads logits.

use candle_core::Tensor;

use crate::error::Result;
use crate::scorer::signature::TensorDecl;

/// One loaded model graph.
///
/// Implementations load a serialized graph artifact plus its weights and
/// expose the graph's declared inputs for introspection. `run` performs a
/// single forward pass over the whole supplied sequence; no state is kept
/// between calls.
///
/// The trait requires `Send` but not `Sync`: exclusive access per
/// invocation is enforced by the engine (see [`crate::engine`]).
pub trait InferenceSession: Send {
    /// Declared graph inputs, in declaration order.
    fn input_decls(&self) -> &[TensorDecl];

    /// Run the forward pass over `feed`.
    ///
    /// Returns logits of shape `[1, seq_len, vocab_size]`, one row per
    /// position of the supplied sequence.
    fn run(&self, feed: &InputFeed) -> Result<Tensor>;
}

/// Named tensors handed to a session, in the order the graph declares them.
#[derive(Debug, Clone, Default)]
pub struct InputFeed {
    entries: Vec<(String, Tensor)>,
}

impl InputFeed {
    /// Create an empty feed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. Callers keep declaration order.
    pub fn insert(&mut self, name: impl Into<String>, tensor: Tensor) {
        self.entries.push((name.into(), tensor));
    }

    /// Look up an entry by name.
    pub fn get(&self, name: &str) -> Option<&Tensor> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tensor)> {
        self.entries.iter().map(|(n, t)| (n.as_str(), t))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the feed is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use candle_core::{DType, Device};

    use super::*;

    #[test]
    fn test_feed_insertion_order() {
        let device = Device::Cpu;
        let mut feed = InputFeed::new();
        feed.insert("input_ids", Tensor::zeros((1, 3), DType::I64, &device).unwrap());
        feed.insert("attention_mask", Tensor::ones((1, 3), DType::I64, &device).unwrap());

        let names: Vec<&str> = feed.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["input_ids", "attention_mask"]);
        assert_eq!(feed.len(), 2);
        assert!(feed.get("input_ids").is_some());
        assert!(feed.get("position_ids").is_none());
    }
}
