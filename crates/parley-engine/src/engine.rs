// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The streaming completion engine.
//!
//! [`CompletionEngine::run`] drives one pending completion end to end:
//! load the thread's current state, claim the row, stream the model turn
//! while watching the cancellation
//! flag, commit the terminal state atomically, then publish. The commit
//! always precedes the event so a consumer reacting to the event can read
//! consistent state.
//!
//! Cancellation is cooperative and observed between stream events only; a
//! flag set after the final event has no effect on the outcome.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use parley_core::{
    CancelFlags, CompletionErrorType, CompletionRecord, CompletionStatus, ContentPart, Event,
    EventSink, MessageRecord, MessageRole, ModelBackend, ModelErrorKind, ModelEvent, ModelMessage,
    ModelRequest, ParleyError, TokenUsage, extract_text_content, serialize_parts,
    time::utcnow_iso,
};
use parley_storage::Database;
use parley_storage::queries::completions::{self, CompletionOutcome};

use crate::cancel::cancel_key;
use crate::thread_manager::ThreadManager;

/// Marker appended to salvaged output when a turn is cancelled mid-stream.
const STOPPED_MARKER: &str = " [stopped]";

/// How a finished run left its completion.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed {
        thread_id: String,
        completion_id: String,
        message_id: String,
        response: String,
    },
    Cancelled {
        thread_id: String,
        completion_id: String,
    },
}

/// How the model stream itself ended. Failures propagate as errors instead.
enum StreamOutcome {
    Completed {
        parts: Vec<ContentPart>,
        usage: TokenUsage,
    },
    Cancelled {
        parts: Vec<ContentPart>,
    },
}

/// Drives pending completions through a model backend.
pub struct CompletionEngine {
    db: Database,
    backend: Arc<dyn ModelBackend>,
    events: Arc<dyn EventSink>,
    flags: Arc<dyn CancelFlags>,
    model: String,
    max_tokens: u32,
}

impl CompletionEngine {
    pub fn new(
        db: Database,
        backend: Arc<dyn ModelBackend>,
        events: Arc<dyn EventSink>,
        flags: Arc<dyn CancelFlags>,
        model: impl Into<String>,
        max_tokens: u32,
    ) -> Self {
        Self {
            db,
            backend,
            events,
            flags,
            model: model.into(),
            max_tokens,
        }
    }

    /// Construct with the configured model settings.
    pub fn from_config(
        db: Database,
        backend: Arc<dyn ModelBackend>,
        events: Arc<dyn EventSink>,
        flags: Arc<dyn CancelFlags>,
        config: &parley_config::ModelConfig,
    ) -> Self {
        Self::new(
            db,
            backend,
            events,
            flags,
            config.default_model.clone(),
            config.max_tokens,
        )
    }

    /// Run one pending completion to a terminal state on behalf of its
    /// owner.
    ///
    /// The model request is built from the thread's live state via
    /// [`ThreadManager::load`], so finished tool executions settled after
    /// the completion was enqueued still reach the model. An empty prompt
    /// fails fast before the completion is claimed.
    ///
    /// Model failures are recorded on the completion and then re-raised, so
    /// an `Err` return still leaves a durable `failed` row behind.
    pub async fn run(
        &self,
        user_id: &str,
        completion_id: &str,
    ) -> Result<RunOutcome, ParleyError> {
        let completion = completions::get_completion(&self.db, completion_id)
            .await?
            // A wrong owner reads the same as a missing row.
            .filter(|c| c.user_id == user_id)
            .ok_or_else(|| ParleyError::CompletionNotFound {
                completion_id: completion_id.to_string(),
            })?;
        if completion.status != CompletionStatus::Pending {
            return Err(ParleyError::Internal(format!(
                "completion {completion_id} is {}, expected pending",
                completion.status
            )));
        }

        // The completion row's prompt and history are an audit copy; the
        // live thread state drives the request.
        let manager =
            ThreadManager::load(&self.db, &completion.thread_id, &completion.user_id).await?;
        if manager.prompt.is_empty() {
            return Err(ParleyError::EmptyPrompt {
                thread_id: completion.thread_id.clone(),
            });
        }

        let started = Instant::now();
        let claimed =
            completions::mark_processing(&self.db, completion_id, &utcnow_iso(), &self.model)
                .await?;
        if !claimed {
            return Err(ParleyError::Internal(format!(
                "completion {completion_id} was claimed concurrently"
            )));
        }
        debug!(completion_id, model = %self.model, "completion claimed");

        match self
            .stream_turn(&completion, &manager.prompt, manager.message_history)
            .await
        {
            Ok(StreamOutcome::Completed { parts, usage }) => {
                self.finalize_completed(&completion, parts, usage, started)
                    .await
            }
            Ok(StreamOutcome::Cancelled { parts }) => {
                self.finalize_cancelled(&completion, parts, started).await
            }
            Err(e) => {
                self.finalize_failed(&completion, &e, started).await;
                Err(e)
            }
        }
    }

    /// Stream the model turn, reassembling text by part index and checking
    /// the cancellation flag before consuming each event.
    async fn stream_turn(
        &self,
        completion: &CompletionRecord,
        prompt: &str,
        history: Vec<ModelMessage>,
    ) -> Result<StreamOutcome, ParleyError> {
        let request = ModelRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            prompt: prompt.to_string(),
            history,
        };
        let mut stream = self.backend.stream(request).await?;

        let key = cancel_key(&completion.id);
        let mut text_by_index: BTreeMap<usize, String> = BTreeMap::new();

        loop {
            if self.consume_cancel_flag(&key).await? {
                info!(completion_id = %completion.id, "cancellation flag observed");
                return Ok(StreamOutcome::Cancelled {
                    parts: salvage_parts(text_by_index),
                });
            }

            let Some(event) = stream.next().await else {
                return Err(ParleyError::Internal(format!(
                    "model stream for completion {} ended without a completed event",
                    completion.id
                )));
            };
            match event? {
                ModelEvent::PartStart { index, part } => {
                    if let ContentPart::Text { content } = &part {
                        text_by_index.insert(index, content.clone());
                        if !content.is_empty() {
                            self.publish_chunk(&completion.user_id, &completion.id, content)
                                .await;
                        }
                    }
                }
                ModelEvent::TextDelta { index, delta } => {
                    text_by_index.entry(index).or_default().push_str(&delta);
                    self.publish_chunk(&completion.user_id, &completion.id, &delta)
                        .await;
                }
                ModelEvent::Completed { parts, usage } => {
                    return Ok(StreamOutcome::Completed { parts, usage });
                }
            }
        }
    }

    /// One-shot flag consumption: observing the flag also deletes it, so a
    /// single cancel request stops exactly one run.
    async fn consume_cancel_flag(&self, key: &str) -> Result<bool, ParleyError> {
        if self.flags.exists(key).await? {
            self.flags.delete(key).await?;
            return Ok(true);
        }
        Ok(false)
    }

    async fn finalize_completed(
        &self,
        completion: &CompletionRecord,
        parts: Vec<ContentPart>,
        usage: TokenUsage,
        started: Instant,
    ) -> Result<RunOutcome, ParleyError> {
        let response = extract_text_content(&parts);
        let completed_at = utcnow_iso();
        let message = MessageRecord {
            id: Uuid::new_v4().to_string(),
            thread_id: completion.thread_id.clone(),
            completion_id: Some(completion.id.clone()),
            role: MessageRole::Assistant,
            parts: serialize_parts(&parts)?,
            created_at: completed_at.clone(),
        };
        completions::record_outcome(
            &self.db,
            &CompletionOutcome {
                completion_id: completion.id.clone(),
                status: CompletionStatus::Completed,
                response: Some(response.clone()),
                error_type: None,
                error_message: None,
                error_details: None,
                input_tokens: Some(i64::from(usage.input_tokens)),
                output_tokens: Some(i64::from(usage.output_tokens)),
                latency_ms: Some(elapsed_ms(started)),
                completed_at,
            },
            Some(&message),
        )
        .await?;

        self.publish(
            &completion.user_id,
            Event::ThreadStream {
                completion_id: completion.id.clone(),
                chunk: String::new(),
                done: true,
            },
        )
        .await;
        self.publish(
            &completion.user_id,
            Event::ThreadCompleted {
                completion_id: completion.id.clone(),
                thread_id: completion.thread_id.clone(),
            },
        )
        .await;

        info!(completion_id = %completion.id, output_tokens = usage.output_tokens, "completion finished");
        Ok(RunOutcome::Completed {
            thread_id: completion.thread_id.clone(),
            completion_id: completion.id.clone(),
            message_id: message.id,
            response,
        })
    }

    async fn finalize_cancelled(
        &self,
        completion: &CompletionRecord,
        parts: Vec<ContentPart>,
        started: Instant,
    ) -> Result<RunOutcome, ParleyError> {
        let parts = append_stopped_marker(parts);
        let response = extract_text_content(&parts);
        let completed_at = utcnow_iso();
        let message = MessageRecord {
            id: Uuid::new_v4().to_string(),
            thread_id: completion.thread_id.clone(),
            completion_id: Some(completion.id.clone()),
            role: MessageRole::Assistant,
            parts: serialize_parts(&parts)?,
            created_at: completed_at.clone(),
        };
        completions::record_outcome(
            &self.db,
            &CompletionOutcome {
                completion_id: completion.id.clone(),
                status: CompletionStatus::Cancelled,
                response: Some(response),
                error_type: None,
                error_message: None,
                error_details: None,
                input_tokens: None,
                output_tokens: None,
                latency_ms: Some(elapsed_ms(started)),
                completed_at,
            },
            Some(&message),
        )
        .await?;

        self.publish(
            &completion.user_id,
            Event::ThreadCancelled {
                completion_id: completion.id.clone(),
            },
        )
        .await;

        info!(completion_id = %completion.id, "completion cancelled");
        Ok(RunOutcome::Cancelled {
            thread_id: completion.thread_id.clone(),
            completion_id: completion.id.clone(),
        })
    }

    /// Record a failure and publish it. The original error is re-raised by
    /// the caller; a storage failure during recording is logged, not allowed
    /// to mask the model error.
    async fn finalize_failed(
        &self,
        completion: &CompletionRecord,
        error: &ParleyError,
        started: Instant,
    ) {
        let error_type = classify_error(error);
        let recorded = completions::record_outcome(
            &self.db,
            &CompletionOutcome {
                completion_id: completion.id.clone(),
                status: CompletionStatus::Failed,
                response: None,
                error_type: Some(error_type),
                error_message: Some(error.to_string()),
                error_details: error_details(error),
                input_tokens: None,
                output_tokens: None,
                latency_ms: Some(elapsed_ms(started)),
                completed_at: utcnow_iso(),
            },
            None,
        )
        .await;
        if let Err(e) = recorded {
            error!(completion_id = %completion.id, error = %e, "failed to record completion failure");
            return;
        }

        self.publish(
            &completion.user_id,
            Event::ThreadFailed {
                completion_id: completion.id.clone(),
                error_type: error_type.to_string(),
                error: error.to_string(),
            },
        )
        .await;
        warn!(completion_id = %completion.id, error_type = %error_type, "completion failed");
    }

    async fn publish_chunk(&self, user_id: &str, completion_id: &str, chunk: &str) {
        self.publish(
            user_id,
            Event::ThreadStream {
                completion_id: completion_id.to_string(),
                chunk: chunk.to_string(),
                done: false,
            },
        )
        .await;
    }

    /// Event delivery is best effort; a publish failure never aborts a run.
    async fn publish(&self, user_id: &str, event: Event) {
        if let Err(e) = self.events.publish(user_id, event).await {
            warn!(user_id, error = %e, "event publish failed");
        }
    }
}

fn elapsed_ms(started: Instant) -> i64 {
    i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX)
}

/// Partial output salvaged from an interrupted stream: the text accumulated
/// per part index, in index order. Tool parts are not salvaged; a cancelled
/// turn never commits half a tool exchange.
fn salvage_parts(text_by_index: BTreeMap<usize, String>) -> Vec<ContentPart> {
    text_by_index
        .into_values()
        .filter(|text| !text.is_empty())
        .map(ContentPart::text)
        .collect()
}

/// Append the stopped marker to the last text part, or add a standalone
/// marker part when nothing was salvaged.
fn append_stopped_marker(mut parts: Vec<ContentPart>) -> Vec<ContentPart> {
    match parts.last_mut() {
        Some(ContentPart::Text { content }) => content.push_str(STOPPED_MARKER),
        _ => parts.push(ContentPart::text(STOPPED_MARKER.trim_start())),
    }
    parts
}

/// Map an engine error onto the durable failure classification.
fn classify_error(error: &ParleyError) -> CompletionErrorType {
    match error {
        ParleyError::Model { kind, .. } => match kind {
            ModelErrorKind::Timeout => CompletionErrorType::Timeout,
            ModelErrorKind::RateLimited | ModelErrorKind::ServerOverloaded => {
                CompletionErrorType::Overloaded
            }
            ModelErrorKind::InvalidRequest => CompletionErrorType::Api,
            ModelErrorKind::Other => CompletionErrorType::Internal,
        },
        _ => CompletionErrorType::Internal,
    }
}

/// Structured diagnostic blob for a failed completion.
fn error_details(error: &ParleyError) -> Option<String> {
    let details = match error {
        ParleyError::Model {
            kind,
            message,
            request_id,
        } => serde_json::json!({
            "error": error.to_string(),
            "kind": kind.to_string(),
            "message": message,
            "request_id": request_id,
        }),
        _ => serde_json::json!({
            "error": error.to_string(),
            "kind": "internal",
        }),
    };
    Some(details.to_string())
}
