// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed lifecycle events published to per-user channels.
//!
//! Delivery is best effort: consumers must tolerate duplicates and drops and
//! fall back to polling completion status. Each event carries a string
//! discriminator (`thread.stream`, `async_tool.completed`, ...) which is
//! lifted into the [`EventEnvelope`] wire form.

use serde::{Deserialize, Serialize};

use crate::time::utcnow_iso;

/// A lifecycle event scoped to the owning user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// One streaming chunk during completion. `done: true` marks the
    /// terminal stream event, published only after the data is committed.
    #[serde(rename = "thread.stream")]
    ThreadStream {
        completion_id: String,
        chunk: String,
        done: bool,
    },

    /// A completion finished successfully.
    #[serde(rename = "thread.completed")]
    ThreadCompleted {
        completion_id: String,
        thread_id: String,
    },

    /// A completion was cancelled by the user.
    #[serde(rename = "thread.cancelled")]
    ThreadCancelled { completion_id: String },

    /// A completion failed.
    #[serde(rename = "thread.failed")]
    ThreadFailed {
        completion_id: String,
        error_type: String,
        error: String,
    },

    /// An async tool execution was created.
    #[serde(rename = "async_tool.started")]
    AsyncToolStarted {
        execution_id: String,
        thread_id: String,
        tool_name: String,
    },

    /// An async tool execution completed.
    #[serde(rename = "async_tool.completed")]
    AsyncToolCompleted {
        execution_id: String,
        thread_id: String,
        tool_name: String,
    },

    /// An async tool execution failed.
    #[serde(rename = "async_tool.failed")]
    AsyncToolFailed {
        execution_id: String,
        thread_id: String,
        tool_name: String,
        error: String,
    },
}

impl Event {
    /// The wire discriminator for this event.
    pub fn discriminator(&self) -> &'static str {
        match self {
            Event::ThreadStream { .. } => "thread.stream",
            Event::ThreadCompleted { .. } => "thread.completed",
            Event::ThreadCancelled { .. } => "thread.cancelled",
            Event::ThreadFailed { .. } => "thread.failed",
            Event::AsyncToolStarted { .. } => "async_tool.started",
            Event::AsyncToolCompleted { .. } => "async_tool.completed",
            Event::AsyncToolFailed { .. } => "async_tool.failed",
        }
    }
}

/// Wire format sent over the event bus: discriminator, timestamp, and the
/// event fields (minus `type`) as the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(rename = "type")]
    pub event_type: String,
    /// ISO8601 publish timestamp.
    pub timestamp: String,
    pub payload: serde_json::Value,
}

impl EventEnvelope {
    /// Wraps an event, stamping the current time.
    pub fn wrap(event: &Event) -> Result<Self, crate::ParleyError> {
        let mut value = serde_json::to_value(event)
            .map_err(|e| crate::ParleyError::Internal(format!("failed to serialize event: {e}")))?;
        let event_type = match value.as_object_mut().and_then(|o| o.remove("type")) {
            Some(serde_json::Value::String(s)) => s,
            _ => event.discriminator().to_string(),
        };
        Ok(Self {
            event_type,
            timestamp: utcnow_iso(),
            payload: value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discriminators_match_serde_tags() {
        let event = Event::ThreadStream {
            completion_id: "c-1".into(),
            chunk: "hi".into(),
            done: false,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.discriminator());
    }

    #[test]
    fn envelope_lifts_type_out_of_payload() {
        let event = Event::AsyncToolFailed {
            execution_id: "e-1".into(),
            thread_id: "t-1".into(),
            tool_name: "search".into(),
            error: "boom".into(),
        };
        let envelope = EventEnvelope::wrap(&event).unwrap();
        assert_eq!(envelope.event_type, "async_tool.failed");
        assert!(envelope.payload.get("type").is_none());
        assert_eq!(envelope.payload["tool_name"], "search");
        assert!(!envelope.timestamp.is_empty());
    }

    #[test]
    fn event_round_trips_through_json() {
        let event = Event::ThreadFailed {
            completion_id: "c-2".into(),
            error_type: "overloaded".into(),
            error: "rate limited".into(),
        };
        let raw = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, event);
    }
}
