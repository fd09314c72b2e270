// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistent entity records and their status lifecycles.
//!
//! Four entities form the durable record of every conversation: `Thread`,
//! `Message`, `Completion`, and `AsyncToolExecution`. Statuses and roles are
//! stored as enumerated strings to keep the schema self-describing.
//!
//! Message `parts` and completion `message_history`/`error_details` are kept
//! as raw JSON text here -- the engine validates and parses them. This keeps
//! the storage layer decoupled from content types.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Role of a message author.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

/// Completion lifecycle status.
///
/// `pending -> processing -> {completed | cancelled | failed}`; the three
/// terminal states are sinks.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    Pending,
    Processing,
    Completed,
    Cancelled,
    Failed,
}

impl CompletionStatus {
    /// True for pending or processing.
    pub fn is_active(self) -> bool {
        matches!(self, CompletionStatus::Pending | CompletionStatus::Processing)
    }
}

/// Classification recorded on a failed completion.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CompletionErrorType {
    /// Bad request build or validation error -- a bug on our side.
    Api,
    /// Provider overloaded or rate limited.
    Overloaded,
    /// Unexpected internal error.
    Internal,
    /// Request or completion timed out.
    Timeout,
}

/// Async tool execution lifecycle status. Transitions exactly once from
/// `pending` to a terminal state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Completed,
    Failed,
}

/// Classification recorded on a failed async tool execution.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ExecutionErrorType {
    Timeout,
    InternalError,
    ValidationError,
    NotFound,
}

/// A persistent, append-only conversation owned by one user.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadRecord {
    pub id: String,
    pub user_id: String,
    pub title: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A single immutable message in a thread.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageRecord {
    pub id: String,
    pub thread_id: String,
    /// Set only for assistant messages produced by that completion.
    pub completion_id: Option<String>,
    pub role: MessageRole,
    /// JSON array of content parts, validated by the engine.
    pub parts: String,
    pub created_at: String,
}

/// One attempt to produce an assistant reply; the full audit record of a
/// completion lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRecord {
    pub id: String,
    pub thread_id: String,
    /// Denormalized owner id for query efficiency.
    pub user_id: String,
    pub status: CompletionStatus,
    /// The user text that triggered this completion.
    pub prompt: String,
    /// Serialized prior conversation at dispatch time -- an audit copy.
    pub message_history: String,
    pub response: Option<String>,
    pub error_type: Option<CompletionErrorType>,
    pub error_message: Option<String>,
    /// Structured diagnostic blob (JSON), set only on failure.
    pub error_details: Option<String>,
    pub model: Option<String>,
    pub input_tokens: Option<i64>,
    pub output_tokens: Option<i64>,
    pub latency_ms: Option<i64>,
    pub created_at: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
}

/// Tracking record for tool-triggered work that outlives the completion
/// that started it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionRecord {
    pub id: String,
    pub thread_id: String,
    /// Which completion's tool call spawned this execution, if any.
    pub completion_id: Option<String>,
    /// Tool identifier (e.g. "process_data").
    pub name: String,
    /// Advisory timeout for the external recovery sweep.
    pub timeout_seconds: Option<i64>,
    /// When set with `ref_id`, points at the domain object the execution
    /// concerns; when unset the execution is self-contained.
    pub ref_type: Option<String>,
    pub ref_id: Option<String>,
    pub status: ExecutionStatus,
    /// Lightweight result blob (JSON), set on success.
    pub result: Option<String>,
    pub error_type: Option<ExecutionErrorType>,
    pub error_message: Option<String>,
    pub created_at: String,
    pub completed_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn completion_status_round_trips_as_snake_case() {
        for status in [
            CompletionStatus::Pending,
            CompletionStatus::Processing,
            CompletionStatus::Completed,
            CompletionStatus::Cancelled,
            CompletionStatus::Failed,
        ] {
            let s = status.to_string();
            assert_eq!(CompletionStatus::from_str(&s).unwrap(), status);
        }
        assert_eq!(CompletionStatus::Processing.to_string(), "processing");
    }

    #[test]
    fn active_statuses_are_pending_and_processing() {
        assert!(CompletionStatus::Pending.is_active());
        assert!(CompletionStatus::Processing.is_active());
        assert!(!CompletionStatus::Completed.is_active());
        assert!(!CompletionStatus::Cancelled.is_active());
        assert!(!CompletionStatus::Failed.is_active());
    }

    #[test]
    fn execution_error_type_strings() {
        assert_eq!(ExecutionErrorType::InternalError.to_string(), "internal_error");
        assert_eq!(
            ExecutionErrorType::from_str("validation_error").unwrap(),
            ExecutionErrorType::ValidationError
        );
    }

    #[test]
    fn message_role_parses() {
        assert_eq!(MessageRole::from_str("user").unwrap(), MessageRole::User);
        assert_eq!(
            MessageRole::from_str("assistant").unwrap(),
            MessageRole::Assistant
        );
        assert!(MessageRole::from_str("system").is_err());
    }
}
