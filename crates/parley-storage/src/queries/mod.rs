// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query functions over the Parley schema.
//!
//! Every function takes a [`Database`](crate::Database) handle and routes
//! through the single background writer thread. Enum-typed columns are stored
//! as their snake_case string form and parsed back on read.

pub mod completions;
pub mod executions;
pub mod messages;
pub mod threads;

/// Parse a stored enum string back into its typed form, reporting a
/// conversion failure against the given column index on mismatch.
pub(crate) fn parse_enum<T: std::str::FromStr>(idx: usize, value: &str) -> rusqlite::Result<T> {
    value.parse::<T>().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unrecognized enum value: {value}").into(),
        )
    })
}
