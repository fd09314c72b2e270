// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The lifecycle wrapper for async tool bodies.
//!
//! [`run_with_lifecycle`] runs a tool task and, when a correlation is
//! supplied, settles the matching execution record and publishes the
//! terminal event to the thread owner. Settlement happens before the event
//! so a consumer reacting to `async_tool.completed` always reads a terminal
//! record.
//!
//! The wrapper degrades rather than blocks: a missing execution or thread
//! is logged and the task still runs untracked, because losing tracking
//! must never lose the tool's work.

use std::future::Future;

use tracing::{error, info, warn};

use parley_core::{Event, EventSink, ExecutionErrorType, ExecutionRecord, ParleyError,
    ThreadRecord};
use parley_storage::Database;
use parley_storage::queries::{executions, threads};

use crate::execution;
use crate::payload::{AsyncToolPayload, completed_result};

/// Links a tool invocation back to its execution record.
#[derive(Debug, Clone)]
pub struct ExecutionCorrelation {
    pub execution_id: String,
}

/// Run a tool body with lifecycle tracking.
///
/// Without a correlation the task runs untracked and its result passes
/// through. With one, success settles the execution as completed and
/// publishes `async_tool.completed`; failure settles it as failed with
/// `internal_error`, publishes `async_tool.failed`, and re-raises.
pub async fn run_with_lifecycle<P, F, Fut>(
    db: &Database,
    events: &dyn EventSink,
    correlation: Option<ExecutionCorrelation>,
    task: F,
) -> Result<P, ParleyError>
where
    P: AsyncToolPayload,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<P, ParleyError>>,
{
    let Some(correlation) = correlation else {
        return task().await;
    };

    let Some((execution, thread)) = load_context(db, &correlation.execution_id).await? else {
        return task().await;
    };

    match task().await {
        Ok(payload) => {
            let blob = completed_result(&payload)?;
            execution::complete_execution(db, &execution.id, Some(&blob)).await?;
            publish(
                events,
                &thread.user_id,
                Event::AsyncToolCompleted {
                    execution_id: execution.id.clone(),
                    thread_id: execution.thread_id.clone(),
                    tool_name: execution.name.clone(),
                },
            )
            .await;
            info!(execution_id = %execution.id, tool = %execution.name, "execution completed");
            Ok(payload)
        }
        Err(e) => {
            execution::fail_execution(
                db,
                &execution.id,
                ExecutionErrorType::InternalError,
                &e.to_string(),
            )
            .await?;
            publish(
                events,
                &thread.user_id,
                Event::AsyncToolFailed {
                    execution_id: execution.id.clone(),
                    thread_id: execution.thread_id.clone(),
                    tool_name: execution.name.clone(),
                    error: e.to_string(),
                },
            )
            .await;
            warn!(execution_id = %execution.id, error = %e, "execution failed");
            Err(e)
        }
    }
}

/// The execution and its owning thread, or `None` (logged) when either is
/// gone. Storage failures propagate.
async fn load_context(
    db: &Database,
    execution_id: &str,
) -> Result<Option<(ExecutionRecord, ThreadRecord)>, ParleyError> {
    let Some(execution) = executions::get_execution(db, execution_id).await? else {
        error!(execution_id, "correlated execution not found, running untracked");
        return Ok(None);
    };
    let Some(thread) = threads::get_thread_by_id(db, &execution.thread_id).await? else {
        error!(
            execution_id,
            thread_id = %execution.thread_id,
            "execution thread not found, running untracked"
        );
        return Ok(None);
    };
    Ok(Some((execution, thread)))
}

async fn publish(events: &dyn EventSink, user_id: &str, event: Event) {
    if let Err(e) = events.publish(user_id, event).await {
        warn!(user_id, error = %e, "event publish failed");
    }
}
