// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Thin entry points for embedding callers.
//!
//! The write operations commit their rows before invoking the dispatcher,
//! so a dispatched completion run can always find its pending row.

use tracing::debug;

use parley_core::{
    CompletionDispatcher, ContentPart, MessageRecord, ParleyError, ThreadRecord,
};
use parley_storage::Database;
use parley_storage::queries::{messages, threads};

use crate::thread_manager::ThreadManager;

/// Identifiers returned from a write operation, for the caller to track.
#[derive(Debug, Clone, PartialEq)]
pub struct SendReceipt {
    pub thread_id: String,
    pub completion_id: String,
}

/// Create a thread from the user's first message and dispatch its completion.
pub async fn create_thread(
    db: &Database,
    dispatcher: &dyn CompletionDispatcher,
    user_id: &str,
    parts: &[ContentPart],
) -> Result<SendReceipt, ParleyError> {
    let (manager, completion) = ThreadManager::create(db, user_id, parts).await?;
    dispatcher.dispatch(user_id, &completion.id).await?;
    debug!(thread_id = %manager.thread.id, completion_id = %completion.id, "thread dispatched");
    Ok(SendReceipt {
        thread_id: manager.thread.id,
        completion_id: completion.id,
    })
}

/// Append a user message to an existing thread and dispatch its completion.
pub async fn send_message(
    db: &Database,
    dispatcher: &dyn CompletionDispatcher,
    thread_id: &str,
    user_id: &str,
    parts: &[ContentPart],
) -> Result<SendReceipt, ParleyError> {
    let mut manager = ThreadManager::load_for_send(db, thread_id, user_id).await?;
    let completion = manager.add_message_and_complete(db, parts).await?;
    dispatcher.dispatch(user_id, &completion.id).await?;
    debug!(thread_id, completion_id = %completion.id, "message dispatched");
    Ok(SendReceipt {
        thread_id: thread_id.to_string(),
        completion_id: completion.id,
    })
}

/// A thread and its full transcript, owner-scoped.
pub async fn get_thread(
    db: &Database,
    thread_id: &str,
    user_id: &str,
) -> Result<(ThreadRecord, Vec<MessageRecord>), ParleyError> {
    let thread = threads::get_thread(db, thread_id, user_id)
        .await?
        .ok_or_else(|| ParleyError::ThreadNotFound {
            thread_id: thread_id.to_string(),
        })?;
    let messages = messages::list_messages(db, thread_id).await?;
    Ok((thread, messages))
}

/// All of a user's threads, most recently active first.
pub async fn list_threads(db: &Database, user_id: &str) -> Result<Vec<ThreadRecord>, ParleyError> {
    threads::list_threads(db, user_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::tempdir;

    use parley_core::CompletionStatus;
    use parley_storage::queries::completions;

    /// Records dispatches instead of running them.
    #[derive(Default)]
    struct RecordingDispatcher {
        dispatched: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl CompletionDispatcher for RecordingDispatcher {
        async fn dispatch(&self, user_id: &str, completion_id: &str) -> Result<(), ParleyError> {
            self.dispatched
                .lock()
                .unwrap()
                .push((user_id.to_string(), completion_id.to_string()));
            Ok(())
        }
    }

    async fn test_db(dir: &tempfile::TempDir) -> Database {
        let path = dir.path().join("ops_test.db");
        Database::open(path.to_str().unwrap()).await.unwrap()
    }

    #[tokio::test]
    async fn create_thread_commits_before_dispatch() {
        let dir = tempdir().unwrap();
        let db = test_db(&dir).await;
        let dispatcher = RecordingDispatcher::default();

        let receipt = create_thread(&db, &dispatcher, "user-a", &[ContentPart::text("hello")])
            .await
            .unwrap();

        // The dispatched completion is already durable and pending.
        let completion = completions::get_completion(&db, &receipt.completion_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(completion.status, CompletionStatus::Pending);
        assert_eq!(
            *dispatcher.dispatched.lock().unwrap(),
            vec![("user-a".to_string(), receipt.completion_id.clone())]
        );
    }

    #[tokio::test]
    async fn send_message_rejects_busy_thread_without_dispatching() {
        let dir = tempdir().unwrap();
        let db = test_db(&dir).await;
        let dispatcher = RecordingDispatcher::default();

        let receipt = create_thread(&db, &dispatcher, "user-a", &[ContentPart::text("hello")])
            .await
            .unwrap();

        // The first completion is still pending.
        let result = send_message(
            &db,
            &dispatcher,
            &receipt.thread_id,
            "user-a",
            &[ContentPart::text("again")],
        )
        .await;
        assert!(matches!(
            result,
            Err(ParleyError::CompletionInProgress { .. })
        ));
        assert_eq!(dispatcher.dispatched.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn get_thread_returns_transcript() {
        let dir = tempdir().unwrap();
        let db = test_db(&dir).await;
        let dispatcher = RecordingDispatcher::default();

        let receipt = create_thread(&db, &dispatcher, "user-a", &[ContentPart::text("hello")])
            .await
            .unwrap();

        let (thread, messages) = get_thread(&db, &receipt.thread_id, "user-a").await.unwrap();
        assert_eq!(thread.id, receipt.thread_id);
        assert_eq!(messages.len(), 1);

        let result = get_thread(&db, &receipt.thread_id, "user-b").await;
        assert!(matches!(result, Err(ParleyError::ThreadNotFound { .. })));
    }

    #[tokio::test]
    async fn list_threads_is_per_user() {
        let dir = tempdir().unwrap();
        let db = test_db(&dir).await;
        let dispatcher = RecordingDispatcher::default();

        create_thread(&db, &dispatcher, "user-a", &[ContentPart::text("one")])
            .await
            .unwrap();
        create_thread(&db, &dispatcher, "user-b", &[ContentPart::text("two")])
            .await
            .unwrap();

        assert_eq!(list_threads(&db, "user-a").await.unwrap().len(), 1);
        assert_eq!(list_threads(&db, "user-b").await.unwrap().len(), 1);
        assert!(list_threads(&db, "user-c").await.unwrap().is_empty());
    }
}
