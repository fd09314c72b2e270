// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Async tool execution tracking.
//!
//! Tools that outlive their completion run out of band. This crate records
//! their lifecycle (pending, completed, failed), formats their results for
//! re-injection into the conversation, and wraps tool bodies so settlement
//! and event publication happen exactly once.

pub mod execution;
pub mod lifecycle;
pub mod payload;

pub use execution::{ExecutionParams, complete_execution, create_execution, fail_execution};
pub use lifecycle::{ExecutionCorrelation, run_with_lifecycle};
pub use payload::{AsyncToolPayload, completed_result};
