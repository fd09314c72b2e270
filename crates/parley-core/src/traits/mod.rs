// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams the engine depends on.
//!
//! All four collaborators -- model backend, event bus, cancellation store,
//! and task dispatcher -- are injected as trait objects so the engine stays
//! testable without any external service. `#[async_trait]` is used for
//! dynamic dispatch compatibility.

pub mod cancel;
pub mod dispatch;
pub mod events;
pub mod model;

pub use cancel::CancelFlags;
pub use dispatch::CompletionDispatcher;
pub use events::EventSink;
pub use model::{ModelBackend, ModelEvent, ModelEventStream, ModelRequest, TokenUsage};
