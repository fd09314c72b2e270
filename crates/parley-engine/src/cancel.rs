// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cancellation requests.
//!
//! A cancel request never fails: it reports whether a flag was set. The
//! running engine consumes the flag cooperatively; a request racing the
//! natural end of the stream may set a flag that expires unobserved, which
//! is why flags carry a TTL.

use std::time::Duration;

use tracing::info;

use parley_core::{CancelFlags, ParleyError};
use parley_storage::Database;
use parley_storage::queries::{completions, threads};

/// The flag key for a completion, shared between the cancel path and the
/// engine's consume check.
pub fn cancel_key(completion_id: &str) -> String {
    format!("completion:cancel:{completion_id}")
}

/// The configured flag lifetime.
pub fn cancel_ttl(config: &parley_config::ChatConfig) -> Duration {
    Duration::from_secs(config.cancel_ttl_seconds)
}

/// What a cancel request did.
#[derive(Debug, Clone, PartialEq)]
pub struct CancelOutcome {
    pub thread_id: String,
    pub cancelled: bool,
    pub message: String,
}

/// Request cancellation of the active completion on a thread.
///
/// Returns `cancelled: false` with an explanatory message when the thread
/// does not exist for this user or has no active completion. Only storage
/// and flag-store failures error.
pub async fn request_cancel(
    db: &Database,
    flags: &dyn CancelFlags,
    thread_id: &str,
    user_id: &str,
    ttl: Duration,
) -> Result<CancelOutcome, ParleyError> {
    if threads::get_thread(db, thread_id, user_id).await?.is_none() {
        return Ok(CancelOutcome {
            thread_id: thread_id.to_string(),
            cancelled: false,
            message: "thread not found".to_string(),
        });
    }

    let Some(completion) = completions::find_active_for_thread(db, thread_id).await? else {
        return Ok(CancelOutcome {
            thread_id: thread_id.to_string(),
            cancelled: false,
            message: "thread is not currently processing".to_string(),
        });
    };

    flags.set(&cancel_key(&completion.id), ttl).await?;
    info!(thread_id, completion_id = %completion.id, "cancellation requested");
    Ok(CancelOutcome {
        thread_id: thread_id.to_string(),
        cancelled: true,
        message: "cancellation requested".to_string(),
    })
}
