// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Parley chat completion engine.
//!
//! This crate provides the content model, persistent entity records, event
//! types, error type, and the trait seams (model backend, event sink,
//! cancellation flags, completion dispatcher) used across the Parley
//! workspace.

pub mod content;
pub mod error;
pub mod events;
pub mod history;
pub mod records;
pub mod time;
pub mod traits;

// Re-export key items at crate root for ergonomic imports.
pub use content::{extract_text_content, parse_parts, serialize_parts, ContentPart};
pub use error::{ModelErrorKind, ParleyError};
pub use events::{Event, EventEnvelope};
pub use history::{serialize_history, translate_message, ModelMessage, ModelPart};
pub use records::{
    CompletionErrorType, CompletionRecord, CompletionStatus, ExecutionErrorType,
    ExecutionRecord, ExecutionStatus, MessageRecord, MessageRole, ThreadRecord,
};
pub use traits::{
    CancelFlags, CompletionDispatcher, EventSink, ModelBackend, ModelEvent,
    ModelEventStream, ModelRequest, TokenUsage,
};
