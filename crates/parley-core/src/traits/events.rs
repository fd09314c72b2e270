// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event sink trait -- the engine's view of the event bus.

use async_trait::async_trait;

use crate::error::ParleyError;
use crate::events::Event;

/// Publishes lifecycle events to a channel scoped to the owning user.
///
/// Exactly-once delivery is neither guaranteed nor required.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Publishes `event` to `user_id`'s channel.
    async fn publish(&self, user_id: &str, event: Event) -> Result<(), ParleyError>;
}
