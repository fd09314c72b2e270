// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Timestamp helpers.
//!
//! All persisted timestamps use the same millisecond-precision UTC form
//! (`2026-01-01T00:00:00.000Z`) so lexicographic ordering on the TEXT
//! columns matches chronological ordering.

use chrono::Utc;

/// Current UTC time in the canonical stored form.
pub fn utcnow_iso() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
