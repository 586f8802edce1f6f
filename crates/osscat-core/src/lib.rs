//! ---
//! osscat_section: "01-core-functionality"
//! osscat_subsection: "module"
//! osscat_type: "source"
//! osscat_scope: "code"
//! osscat_description: "Governance services over the catalog store."
//! osscat_version: "v0.0.0-prealpha"
//! osscat_owner: "tbd"
//! ---
//! Services behind the HTTP surface.
//!
//! Every compliance-relevant mutation and its audit entry are written in one
//! store transaction. If either write fails the transaction is dropped and
//! nothing lands; a cancelled request drops it the same way.

pub mod audit;
pub mod auth;
pub mod catalog;
mod error;
pub mod policy;
pub mod scope;
pub mod users;

use osscat_security::{CredentialHasher, SecurityMetrics, TokenService};
use osscat_store::Store;

pub use audit::AuditTrail;
pub use auth::AuthService;
pub use catalog::{CatalogService, VersionReview};
pub use error::ServiceError;
pub use policy::PolicyService;
pub use scope::ScopeReviewService;
pub use users::{NewUserRequest, UserAdmin, UserPatch};

/// All services sharing one store handle.
#[derive(Clone)]
pub struct Services {
    pub auth: AuthService,
    pub users: UserAdmin,
    pub policy: PolicyService,
    pub scope: ScopeReviewService,
    pub catalog: CatalogService,
    pub audit: AuditTrail,
}

impl Services {
    pub fn new(
        store: Store,
        hasher: CredentialHasher,
        tokens: TokenService,
        metrics: Option<SecurityMetrics>,
    ) -> Self {
        Self {
            auth: AuthService::new(store.clone(), hasher.clone(), tokens, metrics),
            users: UserAdmin::new(store.clone(), hasher),
            policy: PolicyService::new(store.clone()),
            scope: ScopeReviewService::new(store.clone()),
            catalog: CatalogService::new(store.clone()),
            audit: AuditTrail::new(store),
        }
    }
}
