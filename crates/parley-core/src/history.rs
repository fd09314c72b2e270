// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Model-invocation message format.
//!
//! Stored messages are translated into this format before being handed to a
//! model backend, and the same form is serialized into the completion's
//! `message_history` audit snapshot. User-role text becomes a user prompt
//! entry, assistant text becomes model text, and tool calls/returns carry
//! their call ids so multi-turn tool exchanges replay faithfully.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::content::ContentPart;
use crate::records::MessageRole;

/// One entry within a model request or response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelPart {
    /// Literal user input.
    UserPrompt { content: String },
    /// Text produced by the model.
    Text { content: String },
    /// The model invoking a tool.
    ToolCall {
        call_id: String,
        tool_name: String,
        arguments: Map<String, Value>,
    },
    /// A tool's return value fed back to the model.
    ToolReturn {
        call_id: String,
        tool_name: String,
        content: String,
    },
}

/// One turn of the conversation in model-invocation form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelMessage {
    /// A turn sent to the model (user prompts, tool returns).
    Request { parts: Vec<ModelPart> },
    /// A turn produced by the model (text, tool calls).
    Response { parts: Vec<ModelPart> },
}

/// Translates one stored message's parts into model-invocation form.
///
/// Returns `None` when the message has zero translatable parts -- such a
/// message contributes nothing to history and is skipped entirely.
pub fn translate_message(role: MessageRole, parts: &[ContentPart]) -> Option<ModelMessage> {
    let translated: Vec<ModelPart> = parts
        .iter()
        .map(|part| match part {
            ContentPart::Text { content } => match role {
                MessageRole::User => ModelPart::UserPrompt {
                    content: content.clone(),
                },
                MessageRole::Assistant => ModelPart::Text {
                    content: content.clone(),
                },
            },
            ContentPart::ToolCall {
                call_id,
                tool_name,
                arguments,
            } => ModelPart::ToolCall {
                call_id: call_id.clone(),
                tool_name: tool_name.clone(),
                arguments: arguments.clone(),
            },
            ContentPart::ToolResult {
                call_id,
                tool_name,
                result,
            } => ModelPart::ToolReturn {
                call_id: call_id.clone(),
                tool_name: tool_name.clone(),
                content: result.clone(),
            },
        })
        .collect();

    if translated.is_empty() {
        return None;
    }
    Some(match role {
        MessageRole::User => ModelMessage::Request { parts: translated },
        MessageRole::Assistant => ModelMessage::Response { parts: translated },
    })
}

/// Serializes a history snapshot for the completion audit record.
pub fn serialize_history(history: &[ModelMessage]) -> Result<String, crate::ParleyError> {
    serde_json::to_string(history)
        .map_err(|e| crate::ParleyError::Internal(format!("failed to serialize history: {e}")))
}
