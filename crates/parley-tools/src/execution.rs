// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Execution record operations.
//!
//! Settlement is idempotent: completing or failing an execution that is
//! already terminal is a logged no-op, never an error. Out-of-band workers
//! and timeout sweeps may race; the first settlement wins.

use tracing::{debug, warn};
use uuid::Uuid;

use parley_core::{Event, EventSink, ExecutionErrorType, ExecutionRecord, ExecutionStatus,
    ParleyError, time::utcnow_iso};
use parley_storage::Database;
use parley_storage::queries::{executions, threads};

/// Inputs for opening an execution record.
#[derive(Debug, Clone)]
pub struct ExecutionParams {
    pub thread_id: String,
    pub completion_id: Option<String>,
    pub name: String,
    pub timeout_seconds: Option<i64>,
    pub ref_type: Option<String>,
    pub ref_id: Option<String>,
}

/// Open a pending execution and announce it to the thread owner.
pub async fn create_execution(
    db: &Database,
    events: &dyn EventSink,
    params: ExecutionParams,
) -> Result<String, ParleyError> {
    let execution = ExecutionRecord {
        id: Uuid::new_v4().to_string(),
        thread_id: params.thread_id.clone(),
        completion_id: params.completion_id,
        name: params.name.clone(),
        timeout_seconds: params.timeout_seconds,
        ref_type: params.ref_type,
        ref_id: params.ref_id,
        status: ExecutionStatus::Pending,
        result: None,
        error_type: None,
        error_message: None,
        created_at: utcnow_iso(),
        completed_at: None,
    };
    executions::insert_execution(db, &execution).await?;
    debug!(execution_id = %execution.id, tool = %params.name, "execution opened");

    // The insert enforced the thread FK, so the owner lookup can only miss
    // on a concurrent delete.
    if let Some(thread) = threads::get_thread_by_id(db, &params.thread_id).await? {
        let publish = events
            .publish(
                &thread.user_id,
                Event::AsyncToolStarted {
                    execution_id: execution.id.clone(),
                    thread_id: params.thread_id,
                    tool_name: params.name,
                },
            )
            .await;
        if let Err(e) = publish {
            warn!(execution_id = %execution.id, error = %e, "started event publish failed");
        }
    }
    Ok(execution.id)
}

/// Settle an execution as completed. Returns whether this call settled it.
pub async fn complete_execution(
    db: &Database,
    execution_id: &str,
    result: Option<&str>,
) -> Result<bool, ParleyError> {
    let settled =
        executions::complete_execution(db, execution_id, result, &utcnow_iso()).await?;
    if !settled {
        warn!(execution_id, "execution already terminal, complete ignored");
    }
    Ok(settled)
}

/// Settle an execution as failed. Returns whether this call settled it.
pub async fn fail_execution(
    db: &Database,
    execution_id: &str,
    error_type: ExecutionErrorType,
    error_message: &str,
) -> Result<bool, ParleyError> {
    let settled =
        executions::fail_execution(db, execution_id, error_type, error_message, &utcnow_iso())
            .await?;
    if !settled {
        warn!(execution_id, "execution already terminal, fail ignored");
    }
    Ok(settled)
}
