//! ---
//! osscat_section: "06-security-access-control"
//! osscat_subsection: "module"
//! osscat_type: "source"
//! osscat_scope: "code"
//! osscat_description: "Credentials, bearer tokens, and role-based access control."
//! osscat_version: "v0.0.0-prealpha"
//! osscat_owner: "tbd"
//! ---
#![warn(missing_docs)]

pub mod credential;
pub mod identity;
pub mod metrics;
pub mod rbac;
pub mod token;

pub use credential::{CredentialError, CredentialHasher, PasswordDigest};
pub use identity::User;
pub use metrics::SecurityMetrics;
pub use rbac::{authorize, AccessError, Action, RbacError, RbacGate, Role, RoleSet};
pub use token::{IssuedToken, TokenClaims, TokenError, TokenService};
