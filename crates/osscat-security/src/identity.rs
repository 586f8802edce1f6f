//! ---
//! osscat_section: "06-security-access-control"
//! osscat_subsection: "module"
//! osscat_type: "source"
//! osscat_scope: "code"
//! osscat_description: "Credentials, bearer tokens, and role-based access control."
//! osscat_version: "v0.0.0-prealpha"
//! osscat_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::credential::PasswordDigest;
use crate::rbac::{Role, RoleSet};

/// Representation of a user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Stable identifier.
    pub id: Uuid,
    /// Unique login name.
    pub username: String,
    /// Display name for UI rendering.
    pub display_name: Option<String>,
    /// Contact address.
    pub email: Option<String>,
    /// Assigned roles, never empty.
    pub roles: RoleSet,
    /// Whether the user can authenticate.
    pub active: bool,
    /// Stored credential digest. Never serialized.
    #[serde(skip_serializing)]
    pub credential: PasswordDigest,
    /// Timestamp of creation.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last change.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether the user holds `role`.
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(role)
    }
}
