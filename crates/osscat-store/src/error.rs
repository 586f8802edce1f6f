//! ---
//! osscat_section: "03-persistence-logging"
//! osscat_subsection: "module"
//! osscat_type: "source"
//! osscat_scope: "code"
//! osscat_description: "Relational persistence for the OSS catalog."
//! osscat_version: "v0.0.0-prealpha"
//! osscat_owner: "tbd"
//! ---
use thiserror::Error;

/// Store-level failures. Callers roll back any open transaction on error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("conflicting record: {0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
    #[error("stored value could not be decoded: {0}")]
    Decode(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let conflict = err
            .as_database_error()
            .filter(|db| db.is_unique_violation())
            .map(|db| db.message().to_owned());
        match conflict {
            Some(message) => StoreError::Conflict(message),
            None => StoreError::Database(err),
        }
    }
}
