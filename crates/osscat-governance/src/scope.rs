//! ---
//! osscat_section: "02-governance-domain"
//! osscat_subsection: "module"
//! osscat_type: "source"
//! osscat_scope: "code"
//! osscat_description: "License-compliance domain: scope classification, catalog entries, audit trail."
//! osscat_version: "v0.0.0-prealpha"
//! osscat_owner: "tbd"
//! ---
//! Scope classification of project usages.
//!
//! A usage is classified once, when it is recorded. Policy changes made later
//! do not reclassify existing usages; only a reviewer override does.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::DomainError;

/// How a project consumes an OSS version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UsageRole {
    /// Linked or loaded by the shipped product at run time.
    RuntimeRequired,
    /// Part of the server environment the product runs on.
    ServerEnv,
    /// Source copied into the product's own tree.
    BundledSource,
    /// Needed only to build.
    BuildOnly,
    /// Developer tooling.
    DevOnly,
    /// Test harnesses and fixtures.
    TestOnly,
}

impl UsageRole {
    /// Every role, in wire order.
    pub const ALL: [UsageRole; 6] = [
        UsageRole::RuntimeRequired,
        UsageRole::ServerEnv,
        UsageRole::BundledSource,
        UsageRole::BuildOnly,
        UsageRole::DevOnly,
        UsageRole::TestOnly,
    ];

    /// Wire name, e.g. `RUNTIME_REQUIRED`.
    pub fn as_str(self) -> &'static str {
        match self {
            UsageRole::RuntimeRequired => "RUNTIME_REQUIRED",
            UsageRole::ServerEnv => "SERVER_ENV",
            UsageRole::BundledSource => "BUNDLED_SOURCE",
            UsageRole::BuildOnly => "BUILD_ONLY",
            UsageRole::DevOnly => "DEV_ONLY",
            UsageRole::TestOnly => "TEST_ONLY",
        }
    }

    /// Tooling that never ships with the delivered product.
    pub fn is_tooling(self) -> bool {
        matches!(
            self,
            UsageRole::BuildOnly | UsageRole::DevOnly | UsageRole::TestOnly
        )
    }
}

impl fmt::Display for UsageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UsageRole {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UsageRole::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| DomainError::UnknownUsageRole(s.to_owned()))
    }
}

/// Whether a usage falls inside the compliance review boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScopeStatus {
    /// Subject to license obligations review.
    InScope,
    /// Outside the review boundary.
    OutScope,
    /// Awaiting a reviewer decision.
    ReviewNeeded,
}

impl ScopeStatus {
    /// Wire name, e.g. `IN_SCOPE`.
    pub fn as_str(self) -> &'static str {
        match self {
            ScopeStatus::InScope => "IN_SCOPE",
            ScopeStatus::OutScope => "OUT_SCOPE",
            ScopeStatus::ReviewNeeded => "REVIEW_NEEDED",
        }
    }
}

impl fmt::Display for ScopeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScopeStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN_SCOPE" => Ok(ScopeStatus::InScope),
            "OUT_SCOPE" => Ok(ScopeStatus::OutScope),
            "REVIEW_NEEDED" => Ok(ScopeStatus::ReviewNeeded),
            other => Err(DomainError::UnknownScopeStatus(other.to_owned())),
        }
    }
}

/// The singleton scope policy record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopePolicy {
    /// Stable across updates.
    pub id: Uuid,
    /// Classify new `RUNTIME_REQUIRED` usages as in scope instead of review needed.
    pub runtime_required_default_in_scope: bool,
    /// Classify new `SERVER_ENV` usages as in scope instead of out of scope.
    pub server_env_included: bool,
    /// Stored and returned; classification does not consult it.
    pub auto_mark_forks_in_scope: bool,
    /// Time of the last upsert.
    pub updated_at: DateTime<Utc>,
    /// Username of the last upsert.
    pub updated_by: String,
}

/// Partial policy update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyPatch {
    /// New [`ScopePolicy::runtime_required_default_in_scope`].
    #[serde(default)]
    pub runtime_required_default_in_scope: Option<bool>,
    /// New [`ScopePolicy::server_env_included`].
    #[serde(default)]
    pub server_env_included: Option<bool>,
    /// New [`ScopePolicy::auto_mark_forks_in_scope`].
    #[serde(default)]
    pub auto_mark_forks_in_scope: Option<bool>,
}

impl PolicyPatch {
    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        self.runtime_required_default_in_scope.is_none()
            && self.server_env_included.is_none()
            && self.auto_mark_forks_in_scope.is_none()
    }
}

/// Scope status assigned to a usage when it is recorded.
///
/// A missing policy behaves like one with every flag off.
pub fn initial_scope_status(policy: Option<&ScopePolicy>, role: UsageRole) -> ScopeStatus {
    match role {
        UsageRole::BuildOnly | UsageRole::DevOnly | UsageRole::TestOnly => ScopeStatus::OutScope,
        UsageRole::ServerEnv => {
            if policy.is_some_and(|p| p.server_env_included) {
                ScopeStatus::InScope
            } else {
                ScopeStatus::OutScope
            }
        }
        UsageRole::RuntimeRequired => {
            if policy.is_some_and(|p| p.runtime_required_default_in_scope) {
                ScopeStatus::InScope
            } else {
                ScopeStatus::ReviewNeeded
            }
        }
        UsageRole::BundledSource => ScopeStatus::InScope,
    }
}
