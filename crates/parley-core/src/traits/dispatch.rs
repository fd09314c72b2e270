// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Completion dispatcher trait.
//!
//! Thread creation and message send hand execution off to wherever the
//! completion engine runs (typically a worker pool). Dispatch happens after
//! the completion row is committed, so the dispatched task can always find
//! its row.

use async_trait::async_trait;

use crate::error::ParleyError;

/// Hands a pending completion to the engine's host.
#[async_trait]
pub trait CompletionDispatcher: Send + Sync {
    /// Dispatches `completion_id` for execution on behalf of `user_id`.
    async fn dispatch(&self, user_id: &str, completion_id: &str) -> Result<(), ParleyError>;
}
