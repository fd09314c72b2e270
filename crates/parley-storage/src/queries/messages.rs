// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message queries. Messages are append-only; there is no update path.

use parley_core::ParleyError;

use crate::database::{Database, map_tr_err};
use crate::models::{MessageRecord, MessageRole};
use crate::queries::parse_enum;

const MESSAGE_COLUMNS: &str = "id, thread_id, completion_id, role, parts, created_at";

fn map_message_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRecord> {
    let role_str: String = row.get(3)?;
    Ok(MessageRecord {
        id: row.get(0)?,
        thread_id: row.get(1)?,
        completion_id: row.get(2)?,
        role: parse_enum::<MessageRole>(3, &role_str)?,
        parts: row.get(4)?,
        created_at: row.get(5)?,
    })
}

pub async fn insert_message(db: &Database, message: &MessageRecord) -> Result<(), ParleyError> {
    let m = message.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
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
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Full transcript of a thread in chronological order. `created_at` has
/// millisecond precision, so ties break by rowid, which is insertion order.
pub async fn list_messages(
    db: &Database,
    thread_id: &str,
) -> Result<Vec<MessageRecord>, ParleyError> {
    let id = thread_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages WHERE thread_id = ?1
                 ORDER BY created_at ASC, rowid ASC"
            ))?;
            let rows = stmt.query_map(rusqlite::params![id], map_message_row)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ThreadRecord;
    use crate::queries::threads::insert_thread;
    use parley_core::time::utcnow_iso;
    use tempfile::tempdir;

    async fn test_db(dir: &tempfile::TempDir) -> Database {
        let path = dir.path().join("messages_test.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        let now = utcnow_iso();
        insert_thread(
            &db,
            &ThreadRecord {
                id: "th-1".to_string(),
                user_id: "user-a".to_string(),
                title: None,
                created_at: now.clone(),
                updated_at: now,
            },
        )
        .await
        .unwrap();
        db
    }

    fn sample_message(id: &str, role: MessageRole, created_at: &str) -> MessageRecord {
        MessageRecord {
            id: id.to_string(),
            thread_id: "th-1".to_string(),
            completion_id: None,
            role,
            parts: r#"[{"kind":"text","content":"hello"}]"#.to_string(),
            created_at: created_at.to_string(),
        }
    }

    #[tokio::test]
    async fn insert_and_list_roundtrip() {
        let dir = tempdir().unwrap();
        let db = test_db(&dir).await;

        let message = sample_message("msg-1", MessageRole::User, &utcnow_iso());
        insert_message(&db, &message).await.unwrap();

        let messages = list_messages(&db, "th-1").await.unwrap();
        assert_eq!(messages, vec![message]);
    }

    #[tokio::test]
    async fn list_is_chronological_with_insertion_order_ties() {
        let dir = tempdir().unwrap();
        let db = test_db(&dir).await;

        // Same-millisecond inserts with ids that sort against insertion
        // order; insertion order must win.
        let ts = "2026-01-01T00:00:00.000Z";
        insert_message(&db, &sample_message("msg-z", MessageRole::User, ts))
            .await
            .unwrap();
        insert_message(&db, &sample_message("msg-a", MessageRole::Assistant, ts))
            .await
            .unwrap();
        insert_message(
            &db,
            &sample_message("msg-c", MessageRole::User, "2026-01-02T00:00:00.000Z"),
        )
        .await
        .unwrap();

        let ids: Vec<_> = list_messages(&db, "th-1")
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec!["msg-z", "msg-a", "msg-c"]);
    }

    #[tokio::test]
    async fn insert_rejects_unknown_thread() {
        let dir = tempdir().unwrap();
        let db = test_db(&dir).await;

        let mut message = sample_message("msg-1", MessageRole::User, &utcnow_iso());
        message.thread_id = "th-missing".to_string();
        assert!(insert_message(&db, &message).await.is_err());
    }
}
