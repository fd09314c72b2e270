// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed message content fragments.
//!
//! A message body is an ordered sequence of [`ContentPart`] values: plain
//! text, tool invocations, and tool results. The sequence is stored as a
//! JSON array (TEXT column) and must round-trip losslessly -- the `kind`
//! tag discriminates the variants on the wire.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ParleyError;

/// One typed fragment of message content.
///
/// Ordering within a sequence is significant and reproduces the
/// conversational/tool-call order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentPart {
    /// Plain text produced by a user or the model.
    Text { content: String },
    /// The model invoking a tool. `call_id` pairs the call with its result.
    ToolCall {
        call_id: String,
        tool_name: String,
        arguments: Map<String, Value>,
    },
    /// A tool's returned result, linked to the originating call via `call_id`.
    ToolResult {
        call_id: String,
        tool_name: String,
        result: String,
    },
}

impl ContentPart {
    /// Convenience constructor for a text part.
    pub fn text(content: impl Into<String>) -> Self {
        ContentPart::Text {
            content: content.into(),
        }
    }
}

/// Concatenates the content of all `Text` parts with a single space,
/// ignoring tool calls and results. Returns an empty string for an empty
/// or all-non-text sequence.
pub fn extract_text_content(parts: &[ContentPart]) -> String {
    parts
        .iter()
        .filter_map(|p| match p {
            ContentPart::Text { content } => Some(content.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Serializes a part sequence to its stored JSON array form.
pub fn serialize_parts(parts: &[ContentPart]) -> Result<String, ParleyError> {
    serde_json::to_string(parts)
        .map_err(|e| ParleyError::Internal(format!("failed to serialize content parts: {e}")))
}

/// Parses the stored JSON array form back into a part sequence.
pub fn parse_parts(raw: &str) -> Result<Vec<ContentPart>, ParleyError> {
    serde_json::from_str(raw)
        .map_err(|e| ParleyError::Internal(format!("invalid content parts JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_parts() -> Vec<ContentPart> {
        let mut args = Map::new();
        args.insert("query".to_string(), json!("sales report"));
        args.insert("limit".to_string(), json!(5));
        vec![
            ContentPart::text("Let me look that up."),
            ContentPart::ToolCall {
                call_id: "call-1".into(),
                tool_name: "search".into(),
                arguments: args,
            },
            ContentPart::ToolResult {
                call_id: "call-1".into(),
                tool_name: "search".into(),
                result: r#"{"hits": 3}"#.into(),
            },
            ContentPart::text("Found 3 results."),
        ]
    }

    #[test]
    fn round_trip_preserves_kinds_fields_and_order() {
        let parts = sample_parts();
        let raw = serialize_parts(&parts).unwrap();
        let back = parse_parts(&raw).unwrap();
        assert_eq!(back, parts);
    }

    #[test]
    fn kind_tags_appear_on_the_wire() {
        let raw = serialize_parts(&sample_parts()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let kinds: Vec<&str> = value
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["kind"].as_str().unwrap())
            .collect();
        assert_eq!(kinds, ["text", "tool_call", "tool_result", "text"]);
    }

    #[test]
    fn extract_text_joins_with_single_space_in_order() {
        let text = extract_text_content(&sample_parts());
        assert_eq!(text, "Let me look that up. Found 3 results.");
    }

    #[test]
    fn extract_text_ignores_non_text_parts() {
        let parts = vec![ContentPart::ToolResult {
            call_id: "c".into(),
            tool_name: "t".into(),
            result: "r".into(),
        }];
        assert_eq!(extract_text_content(&parts), "");
        assert_eq!(extract_text_content(&[]), "");
    }

    #[test]
    fn parse_rejects_unknown_kind() {
        let raw = r#"[{"kind":"image","content":"x"}]"#;
        assert!(parse_parts(raw).is_err());
    }
}
