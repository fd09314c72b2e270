// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Parley chat completion engine.

use strum::{Display, EnumString};
use thiserror::Error;

/// Classification of a model backend failure.
///
/// Maps onto the durable [`CompletionErrorType`](crate::records::CompletionErrorType)
/// recorded on a failed completion: `Timeout` -> timeout, `RateLimited` and
/// `ServerOverloaded` -> overloaded, `InvalidRequest` -> api, `Other` -> internal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ModelErrorKind {
    /// The request or stream timed out.
    Timeout,
    /// The provider rejected the request due to rate limiting.
    RateLimited,
    /// The provider reported an internal/overloaded condition.
    ServerOverloaded,
    /// The request was malformed or failed validation.
    InvalidRequest,
    /// Anything else.
    Other,
}

/// The primary error type used across all Parley crates.
#[derive(Debug, Error)]
pub enum ParleyError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Thread does not exist or is owned by a different user.
    #[error("thread not found: {thread_id}")]
    ThreadNotFound { thread_id: String },

    /// Completion does not exist.
    #[error("completion not found: {completion_id}")]
    CompletionNotFound { completion_id: String },

    /// Thread already has a pending or processing completion.
    #[error("thread {thread_id} has an active completion")]
    CompletionInProgress { thread_id: String },

    /// A thread was loaded for completion but its last message yields no prompt.
    #[error("no user message to process on thread {thread_id}")]
    EmptyPrompt { thread_id: String },

    /// Model backend errors (API failure, token limits, stream errors).
    #[error("model error ({kind}): {message}")]
    Model {
        kind: ModelErrorKind,
        message: String,
        /// Provider-assigned request id, when the backend surfaces one.
        request_id: Option<String>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ParleyError {
    /// Shorthand for a model error without a request id.
    pub fn model(kind: ModelErrorKind, message: impl Into<String>) -> Self {
        ParleyError::Model {
            kind,
            message: message.into(),
            request_id: None,
        }
    }
}
