//! ---
//! osscat_section: "01-core-functionality"
//! osscat_subsection: "module"
//! osscat_type: "source"
//! osscat_scope: "code"
//! osscat_description: "Governance services over the catalog store."
//! osscat_version: "v0.0.0-prealpha"
//! osscat_owner: "tbd"
//! ---
use osscat_governance::DomainError;
use osscat_security::{AccessError, CredentialError, TokenError};
use osscat_store::StoreError;
use thiserror::Error;

/// Service failure, mapped one-to-one onto an HTTP status and error code.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Missing, malformed, expired, or badly signed token.
    #[error("authentication required: {0}")]
    Unauthenticated(String),
    /// Unknown username or wrong password. Which one is not disclosed.
    #[error("invalid username or password")]
    InvalidCredential,
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("user is disabled")]
    UserDisabled,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// A token could not be produced for an authenticated user.
    #[error("token issue failed: {0}")]
    TokenIssue(String),
    /// The initial admin password could not be handed over; nothing was stored.
    #[error("bootstrap failed: {0}")]
    Bootstrap(String),
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    Store(StoreError),
}

impl ServiceError {
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::Unauthenticated(_) | ServiceError::InvalidCredential => 401,
            ServiceError::Forbidden(_) | ServiceError::UserDisabled => 403,
            ServiceError::NotFound(_) => 404,
            ServiceError::InvalidInput(_) => 400,
            ServiceError::TokenIssue(_)
            | ServiceError::Bootstrap(_)
            | ServiceError::Credential(_)
            | ServiceError::Store(_) => 500,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Unauthenticated(_) => "UNAUTHENTICATED",
            ServiceError::InvalidCredential => "INVALID_CREDENTIAL",
            ServiceError::Forbidden(_) => "FORBIDDEN",
            ServiceError::UserDisabled => "USER_DISABLED",
            ServiceError::NotFound(_) => "NOT_FOUND",
            ServiceError::InvalidInput(_) => "INVALID_INPUT",
            ServiceError::TokenIssue(_) => "TOKEN_ISSUE_FAILED",
            ServiceError::Bootstrap(_) => "BOOTSTRAP_FAILED",
            ServiceError::Credential(_) => "CREDENTIAL_ERROR",
            ServiceError::Store(_) => "STORE_ERROR",
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => ServiceError::NotFound(what),
            StoreError::Conflict(message) => {
                ServiceError::InvalidInput(format!("conflicting record: {message}"))
            }
            other => ServiceError::Store(other),
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        ServiceError::InvalidInput(err.to_string())
    }
}

/// Verification failures are the caller's problem; a signing failure is ours.
impl From<TokenError> for ServiceError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Signing(reason) => ServiceError::TokenIssue(reason),
            other => ServiceError::Unauthenticated(other.to_string()),
        }
    }
}

impl From<AccessError> for ServiceError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Unauthenticated(reason) => ServiceError::Unauthenticated(reason),
            AccessError::Forbidden { .. } => ServiceError::Forbidden(err.to_string()),
        }
    }
}
