//! ---
//! osscat_section: "01-core-functionality"
//! osscat_subsection: "module"
//! osscat_type: "source"
//! osscat_scope: "code"
//! osscat_description: "Governance services over the catalog store."
//! osscat_version: "v0.0.0-prealpha"
//! osscat_owner: "tbd"
//! ---
use osscat_common::time;
use osscat_governance::{AuditAction, AuditEntity, NewAuditEntry, PolicyPatch, ScopePolicy};
use osscat_store::{audit_logs, scope_policy, Store, StoreError};
use tracing::info;

use crate::ServiceError;

/// Reads and changes the singleton scope policy.
#[derive(Clone)]
pub struct PolicyService {
    store: Store,
}

fn summary(policy: &ScopePolicy) -> String {
    format!(
        "runtimeRequiredDefaultInScope={} serverEnvIncluded={} autoMarkForksInScope={}",
        policy.runtime_required_default_in_scope,
        policy.server_env_included,
        policy.auto_mark_forks_in_scope
    )
}

impl PolicyService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn get(&self) -> Result<ScopePolicy, ServiceError> {
        scope_policy::get(self.store.pool())
            .await?
            .ok_or(ServiceError::NotFound("scope policy"))
    }

    /// Merge the set fields into the policy (creating it if absent) and
    /// record a `POLICY_UPDATE` entry in the same transaction.
    pub async fn upsert(&self, patch: &PolicyPatch, actor: &str) -> Result<ScopePolicy, ServiceError> {
        let mut tx = self.store.begin().await?;
        let now = time::now();
        let policy = scope_policy::upsert(&mut *tx, patch, actor, now).await?;
        let entry = NewAuditEntry::new(
            AuditEntity::ScopePolicy,
            policy.id,
            AuditAction::PolicyUpdate,
            actor,
        )
        .with_summary(summary(&policy));
        audit_logs::record(&mut *tx, &entry, now).await?;
        tx.commit().await.map_err(StoreError::from)?;
        info!(
            policy_id = %policy.id,
            actor,
            runtime_required_default_in_scope = policy.runtime_required_default_in_scope,
            server_env_included = policy.server_env_included,
            "scope policy updated"
        );
        Ok(policy)
    }
}
