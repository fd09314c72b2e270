// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user broadcast event bus.

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::trace;

use parley_core::{Event, EventEnvelope, EventSink, ParleyError};

const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// In-process event bus: one broadcast channel per user id.
///
/// Publishing to a user with no subscribers drops the event. Slow
/// subscribers are lagged out by the broadcast channel rather than blocking
/// the publisher.
pub struct MemoryBus {
    channels: DashMap<String, broadcast::Sender<EventEnvelope>>,
    capacity: usize,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity,
        }
    }

    /// Subscribe to `user_id`'s channel, creating it if needed. Only events
    /// published after this call are delivered.
    pub fn subscribe(&self, user_id: &str) -> broadcast::Receiver<EventEnvelope> {
        self.channels
            .entry(user_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventSink for MemoryBus {
    async fn publish(&self, user_id: &str, event: Event) -> Result<(), ParleyError> {
        let envelope = EventEnvelope::wrap(&event)?;
        trace!(
            user_id = user_id,
            event_type = %envelope.event_type,
            "publishing event"
        );
        if let Some(sender) = self.channels.get(user_id) {
            // send only errors when there are no receivers; that is fine.
            let _ = sender.send(envelope);
        }
        Ok(())
    }
}
