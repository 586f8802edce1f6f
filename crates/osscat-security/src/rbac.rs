//! ---
//! osscat_section: "06-security-access-control"
//! osscat_subsection: "module"
//! osscat_type: "source"
//! osscat_scope: "code"
//! osscat_description: "Credentials, bearer tokens, and role-based access control."
//! osscat_version: "v0.0.0-prealpha"
//! osscat_owner: "tbd"
//! ---
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::metrics::SecurityMetrics;
use crate::token::TokenClaims;

/// Permission tier held by a user. Ordered from least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Read-only access to the catalog.
    Viewer,
    /// Catalog editing and scope review.
    Editor,
    /// Full access including users and scope policy.
    Admin,
}

impl Role {
    /// All roles, lowest tier first.
    pub const ALL: [Role; 3] = [Role::Viewer, Role::Editor, Role::Admin];

    /// Wire name of the role.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Viewer => "VIEWER",
            Role::Editor => "EDITOR",
            Role::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = RbacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "VIEWER" => Ok(Role::Viewer),
            "EDITOR" => Ok(Role::Editor),
            "ADMIN" => Ok(Role::Admin),
            other => Err(RbacError::UnknownRole(other.to_owned())),
        }
    }
}

/// Errors occurring while building role data.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RbacError {
    /// Role name not part of the enumeration.
    #[error("role not found: {0}")]
    UnknownRole(String),
    /// A user must hold at least one role.
    #[error("role set must not be empty")]
    EmptyRoleSet,
}

/// Non-empty set of roles held by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Role>", into = "Vec<Role>")]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    /// Build a role set, rejecting an empty input.
    pub fn new(roles: impl IntoIterator<Item = Role>) -> Result<Self, RbacError> {
        let set: BTreeSet<Role> = roles.into_iter().collect();
        if set.is_empty() {
            return Err(RbacError::EmptyRoleSet);
        }
        Ok(Self(set))
    }

    /// Single-role convenience constructor.
    pub fn single(role: Role) -> Self {
        Self(BTreeSet::from([role]))
    }

    /// Parse role names, failing on unknown names or an empty list.
    pub fn parse<S: AsRef<str>>(names: &[S]) -> Result<Self, RbacError> {
        let roles = names
            .iter()
            .map(|name| name.as_ref().parse())
            .collect::<Result<Vec<Role>, _>>()?;
        Self::new(roles)
    }

    /// Iterate roles in tier order.
    pub fn iter(&self) -> impl Iterator<Item = &Role> {
        self.0.iter()
    }

    /// Whether the set holds `role`.
    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    /// Roles as an ordered vector.
    pub fn to_vec(&self) -> Vec<Role> {
        self.0.iter().copied().collect()
    }
}

impl TryFrom<Vec<Role>> for RoleSet {
    type Error = RbacError;

    fn try_from(value: Vec<Role>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RoleSet> for Vec<Role> {
    fn from(value: RoleSet) -> Self {
        value.to_vec()
    }
}

/// Protected operations consulted against the policy table once per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Read the caller's own profile, log out.
    ReadSelf,
    /// Read projects, usages, versions, and the scope policy.
    ReadCatalog,
    /// Create catalog entries and project usages.
    EditCatalog,
    /// Remove a project with its usages.
    DeleteProject,
    /// Replace a computed scope status with a reviewer decision.
    OverrideScope,
    /// Change the review status of an OSS version.
    ReviewVersion,
    /// Change the scope policy.
    ManageScopePolicy,
    /// Search the audit trail.
    ReadAudit,
    /// Create, update, and delete users.
    ManageUsers,
}

impl Action {
    /// Every protected action.
    pub const ALL: [Action; 9] = [
        Action::ReadSelf,
        Action::ReadCatalog,
        Action::EditCatalog,
        Action::DeleteProject,
        Action::OverrideScope,
        Action::ReviewVersion,
        Action::ManageScopePolicy,
        Action::ReadAudit,
        Action::ManageUsers,
    ];

    /// Roles allowed to perform the action.
    pub fn allowed_roles(self) -> &'static [Role] {
        const EVERYONE: &[Role] = &[Role::Viewer, Role::Editor, Role::Admin];
        const EDITORS: &[Role] = &[Role::Editor, Role::Admin];
        const ADMINS: &[Role] = &[Role::Admin];
        match self {
            Action::ReadSelf | Action::ReadCatalog => EVERYONE,
            Action::EditCatalog
            | Action::OverrideScope
            | Action::ReviewVersion
            | Action::ReadAudit => EDITORS,
            Action::DeleteProject | Action::ManageScopePolicy | Action::ManageUsers => ADMINS,
        }
    }
}

/// True iff the caller holds at least one of the allowed roles.
pub fn authorize<'a>(caller: impl IntoIterator<Item = &'a Role>, allowed: &[Role]) -> bool {
    caller.into_iter().any(|role| allowed.contains(role))
}

/// Access failure, kept distinct so clients can tell "log in again" from "not permitted".
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccessError {
    /// No verified claims (missing, malformed, expired, or badly signed token).
    #[error("authentication required: {0}")]
    Unauthenticated(String),
    /// Claims verified but no role grants the action.
    #[error("role not allowed for {action:?}")]
    Forbidden {
        /// Action that was denied.
        action: Action,
    },
}

/// Request-time gate applying the action table to verified claims.
#[derive(Clone, Default)]
pub struct RbacGate {
    metrics: Option<SecurityMetrics>,
}

impl RbacGate {
    /// Gate that counts denials in the supplied metrics.
    pub fn new(metrics: Option<SecurityMetrics>) -> Self {
        Self { metrics }
    }

    /// Fail closed without claims; otherwise allow iff a role intersects the table entry.
    pub fn check<'c>(
        &self,
        claims: Option<&'c TokenClaims>,
        action: Action,
    ) -> Result<&'c TokenClaims, AccessError> {
        let Some(claims) = claims else {
            return Err(AccessError::Unauthenticated("missing claims".into()));
        };
        if authorize(&claims.roles, action.allowed_roles()) {
            return Ok(claims);
        }
        warn!(subject = %claims.sub, username = %claims.username, ?action, "rbac denial");
        if let Some(metrics) = &self.metrics {
            metrics.inc_rbac_denial();
        }
        Err(AccessError::Forbidden { action })
    }
}

impl fmt::Debug for RbacGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RbacGate")
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}
