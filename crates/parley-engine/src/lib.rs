// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Thread management and the streaming completion engine.
//!
//! [`ThreadManager`] loads and mutates a single conversation thread.
//! [`CompletionEngine`] drives one pending completion through the model
//! backend: claim, stream, persist, publish. [`cancel`] and [`ops`] are the
//! thin entry points callers embed.

pub mod cancel;
pub mod engine;
pub mod ops;
pub mod thread_manager;

pub use cancel::{CancelOutcome, cancel_key, cancel_ttl, request_cancel};
pub use engine::{CompletionEngine, RunOutcome};
pub use ops::{SendReceipt, create_thread, get_thread, list_threads, send_message};
pub use thread_manager::ThreadManager;
