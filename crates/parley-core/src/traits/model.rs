// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Model backend trait for LLM invocation.
//!
//! The engine does not speak any provider's wire protocol. It requires only
//! incremental delivery (a stream of [`ModelEvent`]s) and abandonability --
//! dropping the stream mid-turn aborts the request.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::content::ContentPart;
use crate::error::ParleyError;
use crate::history::ModelMessage;

/// A single model invocation: the prompt, prior history, and generation
/// parameters.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    /// Model identifier (e.g. "claude-sonnet-4-20250514").
    pub model: String,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// The user text to respond to.
    pub prompt: String,
    /// Prior conversation in model-invocation form.
    pub history: Vec<ModelMessage>,
}

/// Token accounting for one model turn, read once after the turn finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// One increment of a streaming model turn.
///
/// Delta events carry a part `index` because intermediate deltas may arrive
/// out of part order; the consumer reassembles text by tracked index. The
/// `Completed` event carries the authoritative full part sequence in true
/// order, plus usage.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelEvent {
    /// A new output part began, possibly with initial content.
    PartStart { index: usize, part: ContentPart },
    /// Incremental text for the part at `index`.
    TextDelta { index: usize, delta: String },
    /// The turn finished. `parts` is the full ordered output.
    Completed {
        parts: Vec<ContentPart>,
        usage: TokenUsage,
    },
}

/// A boxed stream of model events.
pub type ModelEventStream = Pin<Box<dyn Stream<Item = Result<ModelEvent, ParleyError>> + Send>>;

/// Backend capable of streaming a model turn.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Starts a model turn and returns its event stream.
    async fn stream(&self, request: ModelRequest) -> Result<ModelEventStream, ParleyError>;
}
