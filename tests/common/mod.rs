//! Shared fixtures for integration tests.
//!
//! Real model artifacts are too heavy for CI, so these tests drive the
//! engine with deterministic stub sessions: each position's logits spike
//! at a token chosen from the previous token by a small rule table. Two
//! stubs with the same rules emulate a draft model that always agrees
//! with its target; different rules emulate disagreement.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use candle_core::{Device, Tensor};
use spec_ops::{
    GenerationConfig, InferenceSession, InputFeed, Result, SpeculativeEngine, TensorDecl,
    TextCodec,
};
use tokenizers::Tokenizer;

/// Stub vocabulary size.
pub const VOCAB: usize = 16;

/// Token id of `</s>` in the test codec.
pub const EOS: u32 = 1;

/// Declared inputs of a typical decoder graph.
pub fn standard_decls(layers: usize, heads: usize, head_dim: usize) -> Vec<TensorDecl> {
    let mut decls = vec![
        TensorDecl::new("input_ids", vec![None, None]),
        TensorDecl::new("attention_mask", vec![None, None]),
        TensorDecl::new("position_ids", vec![None, None]),
    ];
    for i in 0..layers {
        decls.push(TensorDecl::new(
            format!("past_key_values.{i}.key"),
            vec![None, Some(heads), None, Some(head_dim)],
        ));
        decls.push(TensorDecl::new(
            format!("past_key_values.{i}.value"),
            vec![None, Some(heads), None, Some(head_dim)],
        ));
    }
    decls
}

/// Deterministic next-token stub.
///
/// Prediction for a position depends only on the token at that position:
/// the rule table wins, otherwise the fallback maps into `2..VOCAB` so
/// special tokens are never produced by accident.
pub struct MapSession {
    decls: Vec<TensorDecl>,
    offset: u32,
    rules: HashMap<u32, u32>,
    calls: Arc<AtomicUsize>,
}

impl MapSession {
    /// Stub with an explicit rule table and offset-1 fallback.
    pub fn new(rules: &[(u32, u32)]) -> Self {
        Self {
            decls: standard_decls(2, 4, 16),
            offset: 1,
            rules: rules.iter().copied().collect(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Stub with no rules and the given fallback offset.
    pub fn with_offset(offset: u32) -> Self {
        let mut session = Self::new(&[]);
        session.offset = offset;
        session
    }

    /// Replace the declared inputs.
    pub fn with_decls(mut self, layers: usize, heads: usize, head_dim: usize) -> Self {
        self.decls = standard_decls(layers, heads, head_dim);
        self
    }

    /// Handle on the forward-pass counter; clone before boxing.
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }

    fn predict(&self, last: u32) -> u32 {
        self.rules
            .get(&last)
            .copied()
            .unwrap_or(2 + (last + self.offset) % (VOCAB as u32 - 2))
    }
}

impl InferenceSession for MapSession {
    fn input_decls(&self) -> &[TensorDecl] {
        &self.decls
    }

    fn run(&self, feed: &InputFeed) -> Result<Tensor> {
        self.calls.fetch_add(1, Ordering::Relaxed);

        let ids = feed
            .get("input_ids")
            .expect("feed should carry input_ids")
            .to_vec2::<i64>()?;
        let row = &ids[0];

        let mut flat = vec![0.0f32; row.len() * VOCAB];
        for (pos, &token) in row.iter().enumerate() {
            let spike = self.predict(token as u32) as usize;
            flat[pos * VOCAB + spike] = 10.0;
        }

        Ok(Tensor::from_vec(flat, (1, row.len(), VOCAB), &Device::Cpu)?)
    }
}

/// Serialized word-level tokenizer over a tiny fixed vocabulary.
///
/// Ids: `<unk>` = 0, `</s>` = 1, then the listed words in order from 2.
/// The serialized form doubles as an on-disk `tokenizer.json` fixture.
pub fn tokenizer_json() -> String {
    let words = ["the", "apple", "is", "red", ".", "café"];

    let mut vocab = serde_json::Map::new();
    vocab.insert("<unk>".into(), 0u32.into());
    vocab.insert("</s>".into(), EOS.into());
    for (i, word) in words.iter().enumerate() {
        vocab.insert((*word).to_string(), (i as u32 + 2).into());
    }

    let special = |id: u32, content: &str| {
        serde_json::json!({
            "id": id,
            "content": content,
            "single_word": false,
            "lstrip": false,
            "rstrip": false,
            "normalized": false,
            "special": true,
        })
    };

    serde_json::json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [special(0, "<unk>"), special(EOS, "</s>")],
        "normalizer": null,
        "pre_tokenizer": { "type": "Whitespace" },
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": vocab,
            "unk_token": "<unk>",
        },
    })
    .to_string()
}

/// In-memory tokenizer over [`tokenizer_json`].
pub fn test_tokenizer() -> Tokenizer {
    Tokenizer::from_bytes(tokenizer_json().as_bytes()).expect("fixture tokenizer should parse")
}

/// Codec over [`test_tokenizer`].
pub fn test_codec() -> TextCodec {
    TextCodec::new(test_tokenizer())
}

/// Engine over two stub sessions with default generation settings.
pub fn engine_with(target: MapSession, draft: MapSession) -> SpeculativeEngine {
    SpeculativeEngine::new(
        Box::new(target),
        Box::new(draft),
        test_codec(),
        None,
        GenerationConfig::default(),
    )
    .expect("engine should load")
}

/// Rule table walking the test vocabulary in a cycle:
/// the -> apple -> is -> red -> . -> the.
pub fn cycle_rules() -> Vec<(u32, u32)> {
    vec![(2, 3), (3, 4), (4, 5), (5, 6), (6, 2)]
}
