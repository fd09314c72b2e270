// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool payload formatting.
//!
//! A tool's typed output implements [`AsyncToolPayload`] so the lifecycle
//! wrapper can turn it into a human-readable summary, content parts for the
//! conversation, and the result blob stored on the execution record.

use serde::Serialize;

use parley_core::{ContentPart, ParleyError};

/// A typed tool result that knows how to present itself.
pub trait AsyncToolPayload: Serialize + Send + Sync {
    /// One-line summary shown to the user and stored in the result blob.
    fn format_message(&self) -> String;

    /// Content parts injected into the conversation. Defaults to a single
    /// text part holding the summary.
    fn format_content_parts(&self) -> Vec<ContentPart> {
        vec![ContentPart::text(self.format_message())]
    }
}

/// The result blob stored on a completed execution: status, summary,
/// content parts, and the full payload data.
pub fn completed_result<P: AsyncToolPayload>(payload: &P) -> Result<String, ParleyError> {
    let blob = serde_json::json!({
        "status": "completed",
        "message": payload.format_message(),
        "content_parts": serde_json::to_value(payload.format_content_parts())
            .map_err(|e| ParleyError::Internal(format!("failed to serialize content parts: {e}")))?,
        "data": serde_json::to_value(payload)
            .map_err(|e| ParleyError::Internal(format!("failed to serialize payload: {e}")))?,
    });
    Ok(blob.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct ReportPayload {
        report_id: String,
        rows: u32,
    }

    impl AsyncToolPayload for ReportPayload {
        fn format_message(&self) -> String {
            format!("Report {} ready with {} rows", self.report_id, self.rows)
        }
    }

    #[test]
    fn result_blob_carries_status_message_parts_and_data() {
        let payload = ReportPayload {
            report_id: "rpt-1".to_string(),
            rows: 42,
        };
        let raw = completed_result(&payload).unwrap();
        let blob: serde_json::Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(blob["status"], "completed");
        assert_eq!(blob["message"], "Report rpt-1 ready with 42 rows");
        assert_eq!(blob["content_parts"][0]["kind"], "text");
        assert_eq!(blob["data"]["rows"], 42);
    }
}
