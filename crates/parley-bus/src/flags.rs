// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory cancellation flag store with TTL expiry.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use parley_core::{CancelFlags, ParleyError};

/// Cancellation flags held in a concurrent map, each with an expiry instant.
///
/// Expired entries are purged lazily on lookup; there is no background
/// sweeper, so an abandoned flag lives until the next `exists` call for its
/// key. The map stays small because flags are consumed one-shot by the
/// engine.
#[derive(Default)]
pub struct MemoryCancelFlags {
    flags: DashMap<String, Instant>,
}

impl MemoryCancelFlags {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CancelFlags for MemoryCancelFlags {
    async fn set(&self, key: &str, ttl: Duration) -> Result<(), ParleyError> {
        self.flags.insert(key.to_string(), Instant::now() + ttl);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, ParleyError> {
        // Drop the read guard before removing; dashmap deadlocks on
        // same-shard removal while a Ref is held.
        let live = match self.flags.get(key) {
            Some(expiry) => *expiry > Instant::now(),
            None => return Ok(false),
        };
        if !live {
            self.flags.remove(key);
        }
        Ok(live)
    }

    async fn delete(&self, key: &str) -> Result<(), ParleyError> {
        self.flags.remove(key);
        Ok(())
    }
}
