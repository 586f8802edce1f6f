//! ---
//! osscat_section: "02-governance-domain"
//! osscat_subsection: "module"
//! osscat_type: "source"
//! osscat_scope: "code"
//! osscat_description: "License-compliance domain: scope classification, catalog entries, audit trail."
//! osscat_version: "v0.0.0-prealpha"
//! osscat_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scope::{ScopeStatus, UsageRole};

/// Relationship between a project and the OSS version it consumes.
///
/// `evaluated_at` and `evaluated_by` are either both unset (never reviewed) or
/// both set by the latest override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectUsage {
    /// Assigned on insert.
    pub id: Uuid,
    /// Consuming project.
    pub project_id: Uuid,
    /// Component of `oss_version_id`, copied at record time.
    pub oss_id: Uuid,
    /// Consumed release.
    pub oss_version_id: Uuid,
    /// How the project consumes the release.
    pub usage_role: UsageRole,
    /// Computed at record time, then replaced only by overrides.
    pub scope_status: ScopeStatus,
    /// Free text; an override's reason note replaces it.
    pub inclusion_note: Option<String>,
    /// Direct rather than transitive dependency.
    pub direct_dependency: bool,
    /// Record time.
    pub added_at: DateTime<Utc>,
    /// Time of the latest override.
    pub evaluated_at: Option<DateTime<Utc>>,
    /// Username behind the latest override.
    pub evaluated_by: Option<String>,
}

fn default_direct() -> bool {
    true
}

/// Request to record a usage. The scope status is computed, never supplied.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUsage {
    /// Release being consumed; must exist.
    pub oss_version_id: Uuid,
    /// Drives the initial classification.
    pub usage_role: UsageRole,
    /// Defaults to `true`.
    #[serde(default = "default_direct")]
    pub direct_dependency: bool,
    /// Why the project includes it.
    #[serde(default)]
    pub inclusion_note: Option<String>,
}

/// Reviewer decision replacing the computed scope status.
///
/// The reason note replaces the usage's inclusion note, also when absent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeOverride {
    /// Status to store.
    pub scope_status: ScopeStatus,
    /// Why; also appended to the audit summary.
    #[serde(default)]
    pub reason_note: Option<String>,
}

/// Optional listing filters, ANDed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageFilter {
    /// Match the current status.
    #[serde(default)]
    pub scope_status: Option<ScopeStatus>,
    /// Match the role.
    #[serde(default)]
    pub usage_role: Option<UsageRole>,
    /// Match `direct_dependency`.
    #[serde(default)]
    pub direct: Option<bool>,
}
