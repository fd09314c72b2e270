// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Thread loading and mutation.
//!
//! A [`ThreadManager`] holds one thread's state in memory: the thread row,
//! its messages, finished async tool executions, and the derived prompt and
//! model-invocation history for the next completion. Construction variants
//! load exactly what their call site needs; `load_for_send` skips the
//! execution scan because message send does not build a model prompt.

use parley_core::{
    CompletionRecord, CompletionStatus, ContentPart, ExecutionRecord, ExecutionStatus,
    MessageRecord, MessageRole, ModelMessage, ParleyError, ThreadRecord, extract_text_content,
    serialize_history, serialize_parts, time::utcnow_iso, translate_message,
};
use parley_storage::Database;
use parley_storage::queries::{completions, executions, messages, threads};
use tracing::debug;
use uuid::Uuid;

const TITLE_MAX_CHARS: usize = 80;

/// One thread's loaded state plus the derived inputs for its next completion.
pub struct ThreadManager {
    pub thread: ThreadRecord,
    pub messages: Vec<MessageRecord>,
    /// Finished async tool executions, oldest settled first.
    pub executions: Vec<ExecutionRecord>,
    /// Prior conversation in model-invocation form.
    pub message_history: Vec<ModelMessage>,
    /// The user text the next completion responds to, with any execution
    /// context prepended.
    pub prompt: String,
}

impl ThreadManager {
    /// Create a new thread from the user's first message and open its
    /// pending completion.
    pub async fn create(
        db: &Database,
        user_id: &str,
        parts: &[ContentPart],
    ) -> Result<(Self, CompletionRecord), ParleyError> {
        let thread_id = Uuid::new_v4().to_string();
        if parts.is_empty() {
            return Err(ParleyError::EmptyPrompt { thread_id });
        }

        let prompt = extract_text_content(parts);
        let now = utcnow_iso();
        let thread = ThreadRecord {
            id: thread_id,
            user_id: user_id.to_string(),
            title: derive_title(&prompt),
            created_at: now.clone(),
            updated_at: now.clone(),
        };
        threads::insert_thread(db, &thread).await?;

        let message = MessageRecord {
            id: Uuid::new_v4().to_string(),
            thread_id: thread.id.clone(),
            completion_id: None,
            role: MessageRole::User,
            parts: serialize_parts(parts)?,
            created_at: now.clone(),
        };
        messages::insert_message(db, &message).await?;

        let completion = pending_completion(&thread, &prompt, "[]".to_string(), &now);
        completions::insert_completion(db, &completion).await?;

        debug!(thread_id = %thread.id, completion_id = %completion.id, "thread created");
        let manager = Self {
            thread,
            messages: vec![message],
            executions: Vec::new(),
            message_history: Vec::new(),
            prompt,
        };
        Ok((manager, completion))
    }

    /// Load a thread for running its completion: messages, finished
    /// executions, and the derived prompt and text history.
    pub async fn load(db: &Database, thread_id: &str, user_id: &str) -> Result<Self, ParleyError> {
        let thread = threads::get_thread(db, thread_id, user_id)
            .await?
            .ok_or_else(|| ParleyError::ThreadNotFound {
                thread_id: thread_id.to_string(),
            })?;
        let messages = messages::list_messages(db, thread_id).await?;
        let executions = executions::list_terminal_for_thread(db, thread_id).await?;

        // Text-only history from every message but the last; the last user
        // message is the prompt, not history.
        let mut message_history = Vec::new();
        if messages.len() > 1 {
            for message in &messages[..messages.len() - 1] {
                let parts = parley_core::parse_parts(&message.parts)?;
                let text_parts: Vec<ContentPart> = parts
                    .into_iter()
                    .filter(|p| matches!(p, ContentPart::Text { .. }))
                    .collect();
                if let Some(translated) = translate_message(message.role, &text_parts) {
                    message_history.push(translated);
                }
            }
        }

        let last_text = match messages.last() {
            Some(last) if last.role == MessageRole::User => {
                extract_text_content(&parley_core::parse_parts(&last.parts)?)
            }
            _ => String::new(),
        };
        let prompt = build_prompt(&executions, &last_text);

        Ok(Self {
            thread,
            messages,
            executions,
            message_history,
            prompt,
        })
    }

    /// Load a thread for appending a message. No prompt or history is built.
    pub async fn load_for_send(
        db: &Database,
        thread_id: &str,
        user_id: &str,
    ) -> Result<Self, ParleyError> {
        let thread = threads::get_thread(db, thread_id, user_id)
            .await?
            .ok_or_else(|| ParleyError::ThreadNotFound {
                thread_id: thread_id.to_string(),
            })?;
        let messages = messages::list_messages(db, thread_id).await?;
        Ok(Self {
            thread,
            messages,
            executions: Vec::new(),
            message_history: Vec::new(),
            prompt: String::new(),
        })
    }

    /// Append a user message and open a pending completion for it.
    ///
    /// Fails with `CompletionInProgress` when the thread already has an
    /// active completion; a thread runs at most one at a time.
    pub async fn add_message_and_complete(
        &mut self,
        db: &Database,
        parts: &[ContentPart],
    ) -> Result<CompletionRecord, ParleyError> {
        if completions::find_active_for_thread(db, &self.thread.id)
            .await?
            .is_some()
        {
            return Err(ParleyError::CompletionInProgress {
                thread_id: self.thread.id.clone(),
            });
        }

        // Structured history snapshot from everything before this message.
        let mut history = Vec::new();
        for message in &self.messages {
            let prior_parts = parley_core::parse_parts(&message.parts)?;
            if let Some(translated) = translate_message(message.role, &prior_parts) {
                history.push(translated);
            }
        }

        let message = self
            .append_message_with_parts(db, MessageRole::User, parts, None)
            .await?;
        let prompt = extract_text_content(&parley_core::parse_parts(&message.parts)?);

        let completion = pending_completion(
            &self.thread,
            &prompt,
            serialize_history(&history)?,
            &message.created_at,
        );
        completions::insert_completion(db, &completion).await?;
        debug!(thread_id = %self.thread.id, completion_id = %completion.id, "completion opened");
        Ok(completion)
    }

    /// Append a message with structured parts and bump thread recency.
    pub async fn append_message_with_parts(
        &mut self,
        db: &Database,
        role: MessageRole,
        parts: &[ContentPart],
        completion_id: Option<&str>,
    ) -> Result<MessageRecord, ParleyError> {
        let now = utcnow_iso();
        let message = MessageRecord {
            id: Uuid::new_v4().to_string(),
            thread_id: self.thread.id.clone(),
            completion_id: completion_id.map(str::to_string),
            role,
            parts: serialize_parts(parts)?,
            created_at: now.clone(),
        };
        messages::insert_message(db, &message).await?;
        threads::touch_thread(db, &self.thread.id, &now).await?;
        self.thread.updated_at = now;
        self.messages.push(message.clone());
        Ok(message)
    }

    /// Append a plain text message, optionally with a marker suffix.
    pub async fn append_message(
        &mut self,
        db: &Database,
        role: MessageRole,
        content: &str,
        completion_id: Option<&str>,
        suffix: Option<&str>,
    ) -> Result<MessageRecord, ParleyError> {
        let text = match suffix {
            Some(suffix) => format!("{content}{suffix}"),
            None => content.to_string(),
        };
        self.append_message_with_parts(db, role, &[ContentPart::text(text)], completion_id)
            .await
    }
}

fn pending_completion(
    thread: &ThreadRecord,
    prompt: &str,
    message_history: String,
    created_at: &str,
) -> CompletionRecord {
    CompletionRecord {
        id: Uuid::new_v4().to_string(),
        thread_id: thread.id.clone(),
        user_id: thread.user_id.clone(),
        status: CompletionStatus::Pending,
        prompt: prompt.to_string(),
        message_history,
        response: None,
        error_type: None,
        error_message: None,
        error_details: None,
        model: None,
        input_tokens: None,
        output_tokens: None,
        latency_ms: None,
        created_at: created_at.to_string(),
        started_at: None,
        completed_at: None,
    }
}

fn derive_title(prompt: &str) -> Option<String> {
    let trimmed = prompt.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(TITLE_MAX_CHARS).collect())
}

/// Prepend finished tool execution context to the user's text. With no
/// finished executions the text passes through untouched.
fn build_prompt(executions: &[ExecutionRecord], user_text: &str) -> String {
    if executions.is_empty() {
        return user_text.to_string();
    }
    let blocks: Vec<String> = executions.iter().map(execution_context_block).collect();
    format!(
        "{}\n\n---\n\nUser message: {}",
        blocks.join("\n\n"),
        user_text
    )
}

fn execution_context_block(execution: &ExecutionRecord) -> String {
    let mut block = match &execution.ref_id {
        Some(ref_id) => format!("## {} (id: {})", execution.name, ref_id),
        None => format!("## {}", execution.name),
    };
    match execution.status {
        ExecutionStatus::Completed => {
            // The stored result blob goes in verbatim; the model sees the
            // payload exactly as the tool recorded it.
            if let Some(result) = execution.result.as_deref() {
                block.push('\n');
                block.push_str(result);
            }
        }
        ExecutionStatus::Failed => {
            block.push_str("\n**Status:** FAILED");
            if let Some(error) = &execution.error_message {
                block.push_str("\n**Error:** ");
                block.push_str(error);
            }
        }
        ExecutionStatus::Pending => {}
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn test_db(dir: &tempfile::TempDir) -> Database {
        let path = dir.path().join("manager_test.db");
        Database::open(path.to_str().unwrap()).await.unwrap()
    }

    #[tokio::test]
    async fn create_inserts_thread_message_and_pending_completion() {
        let dir = tempdir().unwrap();
        let db = test_db(&dir).await;

        let (manager, completion) =
            ThreadManager::create(&db, "user-a", &[ContentPart::text("Plan a trip to Kyoto")])
                .await
                .unwrap();

        assert_eq!(manager.thread.user_id, "user-a");
        assert_eq!(manager.thread.title.as_deref(), Some("Plan a trip to Kyoto"));
        assert_eq!(manager.messages.len(), 1);
        assert_eq!(completion.status, CompletionStatus::Pending);
        assert_eq!(completion.prompt, "Plan a trip to Kyoto");
        assert_eq!(completion.message_history, "[]");

        let stored = completions::get_completion(&db, &completion.id)
            .await
            .unwrap();
        assert!(stored.is_some());
    }

    #[tokio::test]
    async fn create_rejects_empty_parts() {
        let dir = tempdir().unwrap();
        let db = test_db(&dir).await;

        let result = ThreadManager::create(&db, "user-a", &[]).await;
        assert!(matches!(result, Err(ParleyError::EmptyPrompt { .. })));
        assert!(threads::list_threads(&db, "user-a").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn load_scopes_to_owner() {
        let dir = tempdir().unwrap();
        let db = test_db(&dir).await;

        let (manager, _) = ThreadManager::create(&db, "user-a", &[ContentPart::text("hi")])
            .await
            .unwrap();

        let result = ThreadManager::load(&db, &manager.thread.id, "user-b").await;
        assert!(matches!(result, Err(ParleyError::ThreadNotFound { .. })));
    }

    #[tokio::test]
    async fn load_derives_prompt_from_last_user_message() {
        let dir = tempdir().unwrap();
        let db = test_db(&dir).await;

        let (mut manager, completion) =
            ThreadManager::create(&db, "user-a", &[ContentPart::text("first question")])
                .await
                .unwrap();
        manager
            .append_message(
                &db,
                MessageRole::Assistant,
                "first answer",
                Some(&completion.id),
                None,
            )
            .await
            .unwrap();
        manager
            .append_message_with_parts(
                &db,
                MessageRole::User,
                &[ContentPart::text("second question")],
                None,
            )
            .await
            .unwrap();

        let loaded = ThreadManager::load(&db, &manager.thread.id, "user-a")
            .await
            .unwrap();
        assert_eq!(loaded.prompt, "second question");
        // History covers the first exchange but not the prompt message.
        assert_eq!(loaded.message_history.len(), 2);
    }

    #[tokio::test]
    async fn load_prompt_is_empty_when_last_message_is_assistant() {
        let dir = tempdir().unwrap();
        let db = test_db(&dir).await;

        let (mut manager, completion) =
            ThreadManager::create(&db, "user-a", &[ContentPart::text("question")])
                .await
                .unwrap();
        manager
            .append_message(
                &db,
                MessageRole::Assistant,
                "answer",
                Some(&completion.id),
                None,
            )
            .await
            .unwrap();

        let loaded = ThreadManager::load(&db, &manager.thread.id, "user-a")
            .await
            .unwrap();
        assert_eq!(loaded.prompt, "");
    }

    #[tokio::test]
    async fn load_prepends_execution_context() {
        let dir = tempdir().unwrap();
        let db = test_db(&dir).await;

        let (manager, _) = ThreadManager::create(&db, "user-a", &[ContentPart::text("status?")])
            .await
            .unwrap();

        let now = utcnow_iso();
        executions::insert_execution(
            &db,
            &ExecutionRecord {
                id: "exe-ok".to_string(),
                thread_id: manager.thread.id.clone(),
                completion_id: None,
                name: "generate_report".to_string(),
                timeout_seconds: None,
                ref_type: Some("report".to_string()),
                ref_id: Some("rpt-1".to_string()),
                status: ExecutionStatus::Pending,
                result: None,
                error_type: None,
                error_message: None,
                created_at: now.clone(),
                completed_at: None,
            },
        )
        .await
        .unwrap();
        executions::complete_execution(
            &db,
            "exe-ok",
            Some(r#"{"status":"completed","message":"Report ready"}"#),
            &now,
        )
        .await
        .unwrap();

        let loaded = ThreadManager::load(&db, &manager.thread.id, "user-a")
            .await
            .unwrap();
        assert!(loaded.prompt.starts_with("## generate_report (id: rpt-1)"));
        assert!(loaded.prompt.contains("Report ready"));
        assert!(loaded.prompt.ends_with("---\n\nUser message: status?"));
    }

    #[tokio::test]
    async fn execution_blocks_appear_in_settlement_order_before_divider() {
        let dir = tempdir().unwrap();
        let db = test_db(&dir).await;

        let (manager, _) = ThreadManager::create(&db, "user-a", &[ContentPart::text("and now?")])
            .await
            .unwrap();

        let now = utcnow_iso();
        for id in ["exe-1", "exe-2"] {
            executions::insert_execution(
                &db,
                &ExecutionRecord {
                    id: id.to_string(),
                    thread_id: manager.thread.id.clone(),
                    completion_id: None,
                    name: format!("tool_{id}"),
                    timeout_seconds: None,
                    ref_type: None,
                    ref_id: None,
                    status: ExecutionStatus::Pending,
                    result: None,
                    error_type: None,
                    error_message: None,
                    created_at: now.clone(),
                    completed_at: None,
                },
            )
            .await
            .unwrap();
        }
        executions::complete_execution(
            &db,
            "exe-2",
            Some(r#"{"status":"completed","message":"first done"}"#),
            "2026-01-01T00:00:00.000Z",
        )
        .await
        .unwrap();
        executions::fail_execution(
            &db,
            "exe-1",
            parley_core::ExecutionErrorType::InternalError,
            "broke later",
            "2026-01-02T00:00:00.000Z",
        )
        .await
        .unwrap();

        let loaded = ThreadManager::load(&db, &manager.thread.id, "user-a")
            .await
            .unwrap();
        let completed_pos = loaded.prompt.find("tool_exe-2").unwrap();
        let failed_pos = loaded.prompt.find("tool_exe-1").unwrap();
        let divider_pos = loaded.prompt.find("---").unwrap();
        assert!(completed_pos < failed_pos);
        assert!(failed_pos < divider_pos);
        assert!(loaded.prompt.contains("first done"));
        assert!(loaded.prompt.contains("**Status:** FAILED\n**Error:** broke later"));
        assert!(loaded.prompt.ends_with("User message: and now?"));
    }

    #[tokio::test]
    async fn completed_execution_block_shows_raw_result() {
        let execution = ExecutionRecord {
            id: "exe-ok".to_string(),
            thread_id: "th-1".to_string(),
            completion_id: None,
            name: "generate_report".to_string(),
            timeout_seconds: None,
            ref_type: Some("report".to_string()),
            ref_id: Some("rpt-1".to_string()),
            status: ExecutionStatus::Completed,
            result: Some(r#"{"status":"completed","message":"Report ready","data":{"rows":10}}"#.to_string()),
            error_type: None,
            error_message: None,
            created_at: utcnow_iso(),
            completed_at: Some(utcnow_iso()),
        };
        let block = execution_context_block(&execution);
        assert_eq!(
            block,
            "## generate_report (id: rpt-1)\n{\"status\":\"completed\",\"message\":\"Report ready\",\"data\":{\"rows\":10}}"
        );
    }

    #[tokio::test]
    async fn failed_execution_block_carries_status_and_error() {
        let execution = ExecutionRecord {
            id: "exe-bad".to_string(),
            thread_id: "th-1".to_string(),
            completion_id: None,
            name: "sync_inventory".to_string(),
            timeout_seconds: None,
            ref_type: None,
            ref_id: None,
            status: ExecutionStatus::Failed,
            result: None,
            error_type: None,
            error_message: Some("upstream unavailable".to_string()),
            created_at: utcnow_iso(),
            completed_at: Some(utcnow_iso()),
        };
        let block = execution_context_block(&execution);
        assert_eq!(
            block,
            "## sync_inventory\n**Status:** FAILED\n**Error:** upstream unavailable"
        );
    }

    #[tokio::test]
    async fn add_message_and_complete_rejects_active_completion() {
        let dir = tempdir().unwrap();
        let db = test_db(&dir).await;

        // The completion opened by create is still pending.
        let (thread_id, _) = {
            let (manager, completion) =
                ThreadManager::create(&db, "user-a", &[ContentPart::text("hi")])
                    .await
                    .unwrap();
            (manager.thread.id.clone(), completion)
        };

        let mut manager = ThreadManager::load_for_send(&db, &thread_id, "user-a")
            .await
            .unwrap();
        let result = manager
            .add_message_and_complete(&db, &[ContentPart::text("again")])
            .await;
        assert!(matches!(
            result,
            Err(ParleyError::CompletionInProgress { .. })
        ));
        // Nothing was appended.
        assert_eq!(manager.messages.len(), 1);
    }

    #[tokio::test]
    async fn add_message_and_complete_snapshots_structured_history() {
        let dir = tempdir().unwrap();
        let db = test_db(&dir).await;

        let (mut manager, first) =
            ThreadManager::create(&db, "user-a", &[ContentPart::text("question")])
                .await
                .unwrap();
        // Settle the first completion so the thread is idle.
        completions::record_outcome(
            &db,
            &completions::CompletionOutcome {
                completion_id: first.id.clone(),
                status: CompletionStatus::Completed,
                response: Some("answer".to_string()),
                error_type: None,
                error_message: None,
                error_details: None,
                input_tokens: None,
                output_tokens: None,
                latency_ms: None,
                completed_at: utcnow_iso(),
            },
            None,
        )
        .await
        .unwrap();
        manager
            .append_message(&db, MessageRole::Assistant, "answer", Some(&first.id), None)
            .await
            .unwrap();

        let completion = manager
            .add_message_and_complete(&db, &[ContentPart::text("follow-up")])
            .await
            .unwrap();

        assert_eq!(completion.prompt, "follow-up");
        let history: Vec<ModelMessage> =
            serde_json::from_str(&completion.message_history).unwrap();
        assert_eq!(history.len(), 2);
        assert!(matches!(history[0], ModelMessage::Request { .. }));
        assert!(matches!(history[1], ModelMessage::Response { .. }));
    }

    #[tokio::test]
    async fn append_message_applies_suffix() {
        let dir = tempdir().unwrap();
        let db = test_db(&dir).await;

        let (mut manager, completion) =
            ThreadManager::create(&db, "user-a", &[ContentPart::text("hi")])
                .await
                .unwrap();
        let message = manager
            .append_message(
                &db,
                MessageRole::Assistant,
                "partial answer",
                Some(&completion.id),
                Some(" [stopped]"),
            )
            .await
            .unwrap();

        let parts = parley_core::parse_parts(&message.parts).unwrap();
        assert_eq!(parts, vec![ContentPart::text("partial answer [stopped]")]);
    }
}
