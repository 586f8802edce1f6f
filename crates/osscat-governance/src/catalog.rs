//! ---
//! osscat_section: "02-governance-domain"
//! osscat_subsection: "module"
//! osscat_type: "source"
//! osscat_scope: "code"
//! osscat_description: "License-compliance domain: scope classification, catalog entries, audit trail."
//! osscat_version: "v0.0.0-prealpha"
//! osscat_owner: "tbd"
//! ---
//! Catalog entries consulted when usages are recorded.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{require_text, DomainError};

/// Delivery project that consumes OSS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Assigned on insert.
    pub id: Uuid,
    /// Unique business key.
    pub project_code: String,
    /// Display name.
    pub name: String,
    /// Owning department.
    pub department: Option<String>,
    /// Responsible manager.
    pub manager: Option<String>,
    /// Free text.
    pub description: Option<String>,
    /// Insert time.
    pub created_at: DateTime<Utc>,
    /// Last change.
    pub updated_at: DateTime<Utc>,
}

/// Request to register a project. See [`Project`] for the fields.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct NewProject {
    pub project_code: String,
    pub name: String,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub manager: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewProject {
    /// Code and name are required.
    pub fn validate(&self) -> Result<(), DomainError> {
        require_text("projectCode", &self.project_code)?;
        require_text("name", &self.name)
    }
}

/// An OSS component, independent of any particular release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OssComponent {
    /// Assigned on insert.
    pub id: Uuid,
    /// Name as registered.
    pub name: String,
    /// [`normalize_name`] of `name`; unique.
    pub normalized_name: String,
    /// Project website.
    pub homepage_url: Option<String>,
    /// Source repository.
    pub repository_url: Option<String>,
    /// Free text.
    pub description: Option<String>,
    /// No longer recommended for new usages.
    pub deprecated: bool,
    /// Insert time.
    pub created_at: DateTime<Utc>,
    /// Last change.
    pub updated_at: DateTime<Utc>,
}

/// Request to register a component. See [`OssComponent`] for the fields.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct NewOssComponent {
    pub name: String,
    #[serde(default)]
    pub homepage_url: Option<String>,
    #[serde(default)]
    pub repository_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewOssComponent {
    /// The name is required.
    pub fn validate(&self) -> Result<(), DomainError> {
        require_text("name", &self.name)
    }
}

/// Lowercase the name and collapse runs of separators into a single `-`.
///
/// `Foo_Bar.js` and `foo bar js` both normalize to `foo-bar-js`.
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_sep = false;
    for ch in name.trim().chars() {
        if ch.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('-');
            }
            pending_sep = false;
            out.extend(ch.to_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out
}

/// Review state of a catalogued OSS version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    /// Registered, not yet looked at.
    Draft,
    /// Under license review.
    InReview,
    /// License and provenance confirmed.
    Verified,
    /// Withdrawn from use.
    Deprecated,
}

impl ReviewStatus {
    /// Wire name, e.g. `IN_REVIEW`.
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewStatus::Draft => "DRAFT",
            ReviewStatus::InReview => "IN_REVIEW",
            ReviewStatus::Verified => "VERIFIED",
            ReviewStatus::Deprecated => "DEPRECATED",
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(ReviewStatus::Draft),
            "IN_REVIEW" => Ok(ReviewStatus::InReview),
            "VERIFIED" => Ok(ReviewStatus::Verified),
            "DEPRECATED" => Ok(ReviewStatus::Deprecated),
            other => Err(DomainError::UnknownReviewStatus(other.to_owned())),
        }
    }
}

/// A concrete release of an OSS component with license and provenance metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OssVersion {
    /// Assigned on insert.
    pub id: Uuid,
    /// Owning component.
    pub oss_id: Uuid,
    /// Version string, unique per component.
    pub version: String,
    /// License expression as declared upstream.
    pub license_expression_raw: Option<String>,
    /// License expression after review.
    pub license_concluded: Option<String>,
    /// Package URL.
    pub purl: Option<String>,
    /// Locally patched.
    pub modified: bool,
    /// What the local patches change.
    pub modification_description: Option<String>,
    /// Upstream of a fork.
    pub fork_origin_url: Option<String>,
    /// Starts as [`ReviewStatus::Draft`].
    pub review_status: ReviewStatus,
    /// Time of the last review status change.
    pub last_reviewed_at: Option<DateTime<Utc>>,
    /// Insert time.
    pub created_at: DateTime<Utc>,
    /// Last change.
    pub updated_at: DateTime<Utc>,
}

/// Request to register a version. See [`OssVersion`] for the fields.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct NewOssVersion {
    pub version: String,
    #[serde(default)]
    pub license_expression_raw: Option<String>,
    #[serde(default)]
    pub license_concluded: Option<String>,
    #[serde(default)]
    pub purl: Option<String>,
    #[serde(default)]
    pub modified: bool,
    #[serde(default)]
    pub modification_description: Option<String>,
    #[serde(default)]
    pub fork_origin_url: Option<String>,
}

impl NewOssVersion {
    /// The version string is required.
    pub fn validate(&self) -> Result<(), DomainError> {
        require_text("version", &self.version)
    }
}
