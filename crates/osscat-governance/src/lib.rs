//! ---
//! osscat_section: "02-governance-domain"
//! osscat_subsection: "module"
//! osscat_type: "source"
//! osscat_scope: "code"
//! osscat_description: "License-compliance domain: scope classification, catalog entries, audit trail."
//! osscat_version: "v0.0.0-prealpha"
//! osscat_owner: "tbd"
//! ---
#![warn(missing_docs)]

pub mod audit;
pub mod catalog;
pub mod scope;
pub mod usage;

use thiserror::Error;

pub use audit::{AuditAction, AuditEntity, AuditFilter, AuditLog, NewAuditEntry};
pub use catalog::{
    normalize_name, NewOssComponent, NewOssVersion, NewProject, OssComponent, OssVersion, Project,
    ReviewStatus,
};
pub use scope::{initial_scope_status, PolicyPatch, ScopePolicy, ScopeStatus, UsageRole};
pub use usage::{NewUsage, ProjectUsage, ScopeOverride, UsageFilter};

/// Errors raised when parsing or validating domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    /// Text is not one of the usage role wire names.
    #[error("unknown usage role: {0}")]
    UnknownUsageRole(String),
    /// Text is not one of the scope status wire names.
    #[error("unknown scope status: {0}")]
    UnknownScopeStatus(String),
    /// Text is not one of the review status wire names.
    #[error("unknown review status: {0}")]
    UnknownReviewStatus(String),
    /// A required text field is empty or whitespace.
    #[error("{field} must not be empty")]
    Blank {
        /// Wire name of the offending field.
        field: &'static str,
    },
}

/// Reject empty or whitespace-only required text.
pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::Blank { field });
    }
    Ok(())
}
