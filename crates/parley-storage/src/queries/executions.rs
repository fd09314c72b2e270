// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Async tool execution queries.
//!
//! The terminal transitions return whether a row was actually updated; a
//! false return means another worker already settled the execution, and the
//! caller must treat its own transition as a no-op.

use parley_core::ParleyError;

use crate::database::{Database, map_tr_err};
use crate::models::{ExecutionErrorType, ExecutionRecord, ExecutionStatus};
use crate::queries::parse_enum;

const EXECUTION_COLUMNS: &str = "id, thread_id, completion_id, name, timeout_seconds, ref_type, \
     ref_id, status, result, error_type, error_message, created_at, completed_at";

fn map_execution_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ExecutionRecord> {
    let status_str: String = row.get(7)?;
    let error_type_str: Option<String> = row.get(9)?;
    Ok(ExecutionRecord {
        id: row.get(0)?,
        thread_id: row.get(1)?,
        completion_id: row.get(2)?,
        name: row.get(3)?,
        timeout_seconds: row.get(4)?,
        ref_type: row.get(5)?,
        ref_id: row.get(6)?,
        status: parse_enum::<ExecutionStatus>(7, &status_str)?,
        result: row.get(8)?,
        error_type: error_type_str
            .map(|s| parse_enum::<ExecutionErrorType>(9, &s))
            .transpose()?,
        error_message: row.get(10)?,
        created_at: row.get(11)?,
        completed_at: row.get(12)?,
    })
}

pub async fn insert_execution(
    db: &Database,
    execution: &ExecutionRecord,
) -> Result<(), ParleyError> {
    let e = execution.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO async_tool_executions (id, thread_id, completion_id, name, \
                 timeout_seconds, ref_type, ref_id, status, result, error_type, error_message, \
                 created_at, completed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                rusqlite::params![
                    e.id,
                    e.thread_id,
                    e.completion_id,
                    e.name,
                    e.timeout_seconds,
                    e.ref_type,
                    e.ref_id,
                    e.status.to_string(),
                    e.result,
                    e.error_type.map(|t| t.to_string()),
                    e.error_message,
                    e.created_at,
                    e.completed_at
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_execution(
    db: &Database,
    execution_id: &str,
) -> Result<Option<ExecutionRecord>, ParleyError> {
    let id = execution_id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {EXECUTION_COLUMNS} FROM async_tool_executions WHERE id = ?1"),
                rusqlite::params![id],
                map_execution_row,
            );
            match result {
                Ok(execution) => Ok(Some(execution)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Finished executions for a thread, oldest settled first. Feeds the context
/// block prepended to the next model request.
pub async fn list_terminal_for_thread(
    db: &Database,
    thread_id: &str,
) -> Result<Vec<ExecutionRecord>, ParleyError> {
    let id = thread_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {EXECUTION_COLUMNS} FROM async_tool_executions
                 WHERE thread_id = ?1 AND status IN ('completed', 'failed')
                 ORDER BY completed_at ASC, rowid ASC"
            ))?;
            let rows = stmt.query_map(rusqlite::params![id], map_execution_row)?;
            let mut executions = Vec::new();
            for row in rows {
                executions.push(row?);
            }
            Ok(executions)
        })
        .await
        .map_err(map_tr_err)
}

/// Settle a pending execution as completed. Returns false if it was already
/// terminal.
pub async fn complete_execution(
    db: &Database,
    execution_id: &str,
    result: Option<&str>,
    completed_at: &str,
) -> Result<bool, ParleyError> {
    let id = execution_id.to_string();
    let result = result.map(str::to_string);
    let ts = completed_at.to_string();
    db.connection()
        .call(move |conn| {
            let rows = conn.execute(
                "UPDATE async_tool_executions SET status = 'completed', result = ?2, \
                 completed_at = ?3
                 WHERE id = ?1 AND status = 'pending'",
                rusqlite::params![id, result, ts],
            )?;
            Ok(rows > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Settle a pending execution as failed. Returns false if it was already
/// terminal.
pub async fn fail_execution(
    db: &Database,
    execution_id: &str,
    error_type: ExecutionErrorType,
    error_message: &str,
    completed_at: &str,
) -> Result<bool, ParleyError> {
    let id = execution_id.to_string();
    let error_message = error_message.to_string();
    let ts = completed_at.to_string();
    db.connection()
        .call(move |conn| {
            let rows = conn.execute(
                "UPDATE async_tool_executions SET status = 'failed', error_type = ?2, \
                 error_message = ?3, completed_at = ?4
                 WHERE id = ?1 AND status = 'pending'",
                rusqlite::params![id, error_type.to_string(), error_message, ts],
            )?;
            Ok(rows > 0)
        })
        .await
        .map_err(map_tr_err)
}
