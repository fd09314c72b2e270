// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cancellation flag store trait.
//!
//! Cancellation is cooperative: a separate actor sets a time-bounded flag
//! keyed by completion id, and the running engine polls it at every
//! suspension point. The engine consumes the flag one-shot -- observing it
//! also deletes it.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ParleyError;

/// A store of time-bounded cancellation flags.
#[async_trait]
pub trait CancelFlags: Send + Sync {
    /// Sets the flag at `key`, expiring after `ttl`.
    async fn set(&self, key: &str, ttl: Duration) -> Result<(), ParleyError>;

    /// Returns whether a live flag exists at `key`.
    async fn exists(&self, key: &str) -> Result<bool, ParleyError>;

    /// Removes the flag at `key`, if any.
    async fn delete(&self, key: &str) -> Result<(), ParleyError>;
}
