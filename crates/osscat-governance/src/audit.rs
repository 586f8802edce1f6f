//! ---
//! osscat_section: "02-governance-domain"
//! osscat_subsection: "module"
//! osscat_type: "source"
//! osscat_scope: "code"
//! osscat_description: "License-compliance domain: scope classification, catalog entries, audit trail."
//! osscat_version: "v0.0.0-prealpha"
//! osscat_owner: "tbd"
//! ---
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of record an audit entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditEntity {
    /// `PROJECT_USAGE`
    ProjectUsage,
    /// `SCOPE_POLICY`
    ScopePolicy,
    /// `USER`
    User,
    /// `PROJECT`
    Project,
    /// `OSS_VERSION`
    OssVersion,
}

impl AuditEntity {
    /// Name stored in `entity_type`.
    pub fn as_str(self) -> &'static str {
        match self {
            AuditEntity::ProjectUsage => "PROJECT_USAGE",
            AuditEntity::ScopePolicy => "SCOPE_POLICY",
            AuditEntity::User => "USER",
            AuditEntity::Project => "PROJECT",
            AuditEntity::OssVersion => "OSS_VERSION",
        }
    }
}

impl fmt::Display for AuditEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compliance-relevant mutation recorded in the trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditAction {
    /// A reviewer replaced a usage's scope status.
    ScopeOverride,
    /// The scope policy was created or changed.
    PolicyUpdate,
    /// A user account was created.
    UserCreate,
    /// A user account was changed.
    UserUpdate,
    /// A user account was deleted.
    UserDelete,
    /// A user ended a session.
    Logout,
    /// An OSS version's review status changed.
    VersionReview,
    /// A project was deleted.
    ProjectDelete,
}

impl AuditAction {
    /// Name stored in `action`.
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::ScopeOverride => "SCOPE_OVERRIDE",
            AuditAction::PolicyUpdate => "POLICY_UPDATE",
            AuditAction::UserCreate => "USER_CREATE",
            AuditAction::UserUpdate => "USER_UPDATE",
            AuditAction::UserDelete => "USER_DELETE",
            AuditAction::Logout => "LOGOUT",
            AuditAction::VersionReview => "VERSION_REVIEW",
            AuditAction::ProjectDelete => "PROJECT_DELETE",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable audit trail entry as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    /// Assigned on insert.
    pub id: Uuid,
    /// An [`AuditEntity`] name.
    pub entity_type: String,
    /// Id of the affected record, as text.
    pub entity_id: String,
    /// An [`AuditAction`] name.
    pub action: String,
    /// Actor username.
    pub user_name: String,
    /// Human-readable change description. Never holds secrets.
    pub summary: Option<String>,
    /// Microsecond precision.
    pub created_at: DateTime<Utc>,
}

/// Entry to append. Id and timestamp are assigned on insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuditEntry {
    /// Kind of the affected record.
    pub entity_type: AuditEntity,
    /// Id of the affected record.
    pub entity_id: String,
    /// What happened.
    pub action: AuditAction,
    /// Actor username.
    pub user_name: String,
    /// Optional description of the change.
    pub summary: Option<String>,
}

impl NewAuditEntry {
    /// Entry without a summary.
    pub fn new(
        entity_type: AuditEntity,
        entity_id: impl ToString,
        action: AuditAction,
        user_name: impl Into<String>,
    ) -> Self {
        Self {
            entity_type,
            entity_id: entity_id.to_string(),
            action,
            user_name: user_name.into(),
            summary: None,
        }
    }

    /// Attach a summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }
}

/// Conjunctive search filter. Unset fields impose no constraint; bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditFilter {
    /// Exact entity type name.
    #[serde(default)]
    pub entity_type: Option<String>,
    /// Exact entity id.
    #[serde(default)]
    pub entity_id: Option<String>,
    /// Earliest `created_at`. A bound finer than a microsecond is rounded up.
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    /// Latest `created_at`. A bound finer than a microsecond is rounded down.
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

impl AuditFilter {
    /// Every entry about one record.
    pub fn entity(entity_type: AuditEntity, entity_id: impl ToString) -> Self {
        Self {
            entity_type: Some(entity_type.as_str().to_owned()),
            entity_id: Some(entity_id.to_string()),
            ..Self::default()
        }
    }

    /// Whether `entry` satisfies every set filter.
    pub fn matches(&self, entry: &AuditLog) -> bool {
        self.entity_type
            .as_deref()
            .map_or(true, |t| t == entry.entity_type)
            && self
                .entity_id
                .as_deref()
                .map_or(true, |id| id == entry.entity_id)
            && self.from.map_or(true, |from| entry.created_at >= from)
            && self.to.map_or(true, |to| entry.created_at <= to)
    }
}
