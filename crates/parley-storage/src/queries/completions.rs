// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Completion lifecycle queries.
//!
//! Status transitions are guarded in SQL: `mark_processing` only claims a
//! pending row, and [`record_outcome`] writes the terminal update together
//! with the assistant message in one transaction so a crash can never leave
//! a terminal completion without its message (or vice versa).

use parley_core::ParleyError;

use crate::database::{Database, map_tr_err};
use crate::models::{
    CompletionErrorType, CompletionRecord, CompletionStatus, MessageRecord,
};
use crate::queries::parse_enum;

const COMPLETION_COLUMNS: &str = "id, thread_id, user_id, status, prompt, message_history, \
     response, error_type, error_message, error_details, model, input_tokens, output_tokens, \
     latency_ms, created_at, started_at, completed_at";

fn map_completion_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CompletionRecord> {
    let status_str: String = row.get(3)?;
    let error_type_str: Option<String> = row.get(7)?;
    Ok(CompletionRecord {
        id: row.get(0)?,
        thread_id: row.get(1)?,
        user_id: row.get(2)?,
        status: parse_enum::<CompletionStatus>(3, &status_str)?,
        prompt: row.get(4)?,
        message_history: row.get(5)?,
        response: row.get(6)?,
        error_type: error_type_str
            .map(|s| parse_enum::<CompletionErrorType>(7, &s))
            .transpose()?,
        error_message: row.get(8)?,
        error_details: row.get(9)?,
        model: row.get(10)?,
        input_tokens: row.get(11)?,
        output_tokens: row.get(12)?,
        latency_ms: row.get(13)?,
        created_at: row.get(14)?,
        started_at: row.get(15)?,
        completed_at: row.get(16)?,
    })
}

/// Terminal state of a finished completion, applied by [`record_outcome`].
#[derive(Debug, Clone)]
pub struct CompletionOutcome {
    pub completion_id: String,
    pub status: CompletionStatus,
    pub response: Option<String>,
    pub error_type: Option<CompletionErrorType>,
    pub error_message: Option<String>,
    pub error_details: Option<String>,
    pub input_tokens: Option<i64>,
    pub output_tokens: Option<i64>,
    pub latency_ms: Option<i64>,
    pub completed_at: String,
}

pub async fn insert_completion(
    db: &Database,
    completion: &CompletionRecord,
) -> Result<(), ParleyError> {
    let c = completion.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO completions (id, thread_id, user_id, status, prompt, \
                 message_history, response, error_type, error_message, error_details, model, \
                 input_tokens, output_tokens, latency_ms, created_at, started_at, completed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, \
                 ?16, ?17)",
                rusqlite::params![
                    c.id,
                    c.thread_id,
                    c.user_id,
                    c.status.to_string(),
                    c.prompt,
                    c.message_history,
                    c.response,
                    c.error_type.map(|e| e.to_string()),
                    c.error_message,
                    c.error_details,
                    c.model,
                    c.input_tokens,
                    c.output_tokens,
                    c.latency_ms,
                    c.created_at,
                    c.started_at,
                    c.completed_at
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_completion(
    db: &Database,
    completion_id: &str,
) -> Result<Option<CompletionRecord>, ParleyError> {
    let id = completion_id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {COMPLETION_COLUMNS} FROM completions WHERE id = ?1"),
                rusqlite::params![id],
                map_completion_row,
            );
            match result {
                Ok(completion) => Ok(Some(completion)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// The pending or processing completion on a thread, if one exists. At most
/// one completion per thread may be active at a time; the newest is returned
/// if that invariant was ever violated by outside writes.
pub async fn find_active_for_thread(
    db: &Database,
    thread_id: &str,
) -> Result<Option<CompletionRecord>, ParleyError> {
    let id = thread_id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!(
                    "SELECT {COMPLETION_COLUMNS} FROM completions
                     WHERE thread_id = ?1 AND status IN ('pending', 'processing')
                     ORDER BY created_at DESC LIMIT 1"
                ),
                rusqlite::params![id],
                map_completion_row,
            );
            match result {
                Ok(completion) => Ok(Some(completion)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Claim a pending completion for streaming. Returns false when the row was
/// not pending (already claimed, or already terminal), making the claim safe
/// to race.
pub async fn mark_processing(
    db: &Database,
    completion_id: &str,
    started_at: &str,
    model: &str,
) -> Result<bool, ParleyError> {
    let id = completion_id.to_string();
    let ts = started_at.to_string();
    let model = model.to_string();
    db.connection()
        .call(move |conn| {
            let rows = conn.execute(
                "UPDATE completions SET status = 'processing', started_at = ?2, model = ?3
                 WHERE id = ?1 AND status = 'pending'",
                rusqlite::params![id, ts, model],
            )?;
            Ok(rows > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Apply a terminal outcome. When `message` is given (completed and cancelled
/// outcomes that salvaged content), the assistant message insert, the
/// completion update, and the thread recency bump commit together.
pub async fn record_outcome(
    db: &Database,
    outcome: &CompletionOutcome,
    message: Option<&MessageRecord>,
) -> Result<(), ParleyError> {
    let o = outcome.clone();
    let m = message.cloned();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "UPDATE completions SET status = ?2, response = ?3, error_type = ?4, \
                 error_message = ?5, error_details = ?6, input_tokens = ?7, output_tokens = ?8, \
                 latency_ms = ?9, completed_at = ?10
                 WHERE id = ?1",
                rusqlite::params![
                    o.completion_id,
                    o.status.to_string(),
                    o.response,
                    o.error_type.map(|e| e.to_string()),
                    o.error_message,
                    o.error_details,
                    o.input_tokens,
                    o.output_tokens,
                    o.latency_ms,
                    o.completed_at
                ],
            )?;
            if let Some(m) = m {
                tx.execute(
                    "INSERT INTO messages (id, thread_id, completion_id, role, parts, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    rusqlite::params![
                        m.id,
                        m.thread_id,
                        m.completion_id,
                        m.role.to_string(),
                        m.parts,
                        m.created_at
                    ],
                )?;
                tx.execute(
                    "UPDATE threads SET updated_at = ?2 WHERE id = ?1",
                    rusqlite::params![m.thread_id, o.completed_at],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
