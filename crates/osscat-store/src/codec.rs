//! ---
//! osscat_section: "03-persistence-logging"
//! osscat_subsection: "module"
//! osscat_type: "source"
//! osscat_scope: "code"
//! osscat_description: "Relational persistence for the OSS catalog."
//! osscat_version: "v0.0.0-prealpha"
//! osscat_owner: "tbd"
//! ---
//! Column decoding shared by the repositories.

use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use osscat_common::time;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use crate::StoreError;

fn decode_err(col: &str, err: impl Display) -> StoreError {
    StoreError::Decode(format!("{col}: {err}"))
}

pub(crate) fn uuid(row: &SqliteRow, col: &str) -> Result<Uuid, StoreError> {
    let raw: String = row.try_get(col)?;
    Uuid::parse_str(&raw).map_err(|err| decode_err(col, err))
}

pub(crate) fn timestamp(row: &SqliteRow, col: &str) -> Result<DateTime<Utc>, StoreError> {
    let raw: String = row.try_get(col)?;
    time::from_db(&raw).map_err(|err| decode_err(col, err))
}

pub(crate) fn opt_timestamp(
    row: &SqliteRow,
    col: &str,
) -> Result<Option<DateTime<Utc>>, StoreError> {
    let raw: Option<String> = row.try_get(col)?;
    raw.map(|raw| time::from_db(&raw).map_err(|err| decode_err(col, err)))
        .transpose()
}

/// Text column holding an enumerated wire name.
pub(crate) fn parsed<T>(row: &SqliteRow, col: &str) -> Result<T, StoreError>
where
    T: FromStr,
    T::Err: Display,
{
    let raw: String = row.try_get(col)?;
    raw.parse().map_err(|err| decode_err(col, err))
}
