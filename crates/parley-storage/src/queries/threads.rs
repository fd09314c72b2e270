// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Thread queries.
//!
//! Reads are scoped by owner (`user_id`) except where the caller is a
//! trusted internal path that only holds a thread id.

use parley_core::ParleyError;

use crate::database::{Database, map_tr_err};
use crate::models::ThreadRecord;

const THREAD_COLUMNS: &str = "id, user_id, title, created_at, updated_at";

fn map_thread_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ThreadRecord> {
    Ok(ThreadRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

pub async fn insert_thread(db: &Database, thread: &ThreadRecord) -> Result<(), ParleyError> {
    let t = thread.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO threads (id, user_id, title, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![t.id, t.user_id, t.title, t.created_at, t.updated_at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a thread only if it belongs to `user_id`.
pub async fn get_thread(
    db: &Database,
    thread_id: &str,
    user_id: &str,
) -> Result<Option<ThreadRecord>, ParleyError> {
    let id = thread_id.to_string();
    let uid = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {THREAD_COLUMNS} FROM threads WHERE id = ?1 AND user_id = ?2"),
                rusqlite::params![id, uid],
                map_thread_row,
            );
            match result {
                Ok(thread) => Ok(Some(thread)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a thread by id alone. Used by the async tool lifecycle, which holds
/// an execution record but not the owning user.
pub async fn get_thread_by_id(
    db: &Database,
    thread_id: &str,
) -> Result<Option<ThreadRecord>, ParleyError> {
    let id = thread_id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {THREAD_COLUMNS} FROM threads WHERE id = ?1"),
                rusqlite::params![id],
                map_thread_row,
            );
            match result {
                Ok(thread) => Ok(Some(thread)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// All threads owned by `user_id`, newest first.
pub async fn list_threads(db: &Database, user_id: &str) -> Result<Vec<ThreadRecord>, ParleyError> {
    let uid = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {THREAD_COLUMNS} FROM threads WHERE user_id = ?1
                 ORDER BY updated_at DESC, rowid DESC"
            ))?;
            let rows = stmt.query_map(rusqlite::params![uid], map_thread_row)?;
            let mut threads = Vec::new();
            for row in rows {
                threads.push(row?);
            }
            Ok(threads)
        })
        .await
        .map_err(map_tr_err)
}

/// Bump `updated_at` after new activity on the thread.
pub async fn touch_thread(
    db: &Database,
    thread_id: &str,
    updated_at: &str,
) -> Result<(), ParleyError> {
    let id = thread_id.to_string();
    let ts = updated_at.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE threads SET updated_at = ?2 WHERE id = ?1",
                rusqlite::params![id, ts],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
