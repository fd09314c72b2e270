// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process implementations of the Parley coordination seams.
//!
//! [`MemoryBus`] fans lifecycle events out over per-user tokio broadcast
//! channels, and [`MemoryCancelFlags`] keeps time-bounded cancellation flags
//! in a concurrent map. Both are suitable for single-process deployments and
//! tests; a multi-process deployment swaps in implementations backed by a
//! shared broker.

pub mod bus;
pub mod flags;

pub use bus::MemoryBus;
pub use flags::MemoryCancelFlags;
