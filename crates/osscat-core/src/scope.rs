//! ---
//! osscat_section: "01-core-functionality"
//! osscat_subsection: "module"
//! osscat_type: "source"
//! osscat_scope: "code"
//! osscat_description: "Governance services over the catalog store."
//! osscat_version: "v0.0.0-prealpha"
//! osscat_owner: "tbd"
//! ---
//! Recording project usages and reviewing their scope.

use osscat_common::time;
use osscat_governance::{
    initial_scope_status, AuditAction, AuditEntity, NewAuditEntry, NewUsage, ProjectUsage,
    ScopeOverride, UsageFilter,
};
use osscat_store::{audit_logs, oss, projects, scope_policy, usages, Store, StoreError};
use tracing::info;
use uuid::Uuid;

use crate::ServiceError;

#[derive(Clone)]
pub struct ScopeReviewService {
    store: Store,
}

impl ScopeReviewService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Record a usage, classifying it against the policy in force right now.
    ///
    /// The evaluation stamp stays unset until a reviewer overrides the status.
    pub async fn create_usage(
        &self,
        project_id: Uuid,
        request: &NewUsage,
    ) -> Result<ProjectUsage, ServiceError> {
        let mut tx = self.store.begin().await?;
        if projects::get(&mut *tx, project_id).await?.is_none() {
            return Err(ServiceError::NotFound("project"));
        }
        let version = oss::get_version(&mut *tx, request.oss_version_id)
            .await?
            .ok_or(ServiceError::NotFound("oss version"))?;
        let policy = scope_policy::get(&mut *tx).await?;
        let usage = ProjectUsage {
            id: Uuid::new_v4(),
            project_id,
            oss_id: version.oss_id,
            oss_version_id: version.id,
            usage_role: request.usage_role,
            scope_status: initial_scope_status(policy.as_ref(), request.usage_role),
            inclusion_note: request.inclusion_note.clone(),
            direct_dependency: request.direct_dependency,
            added_at: time::now(),
            evaluated_at: None,
            evaluated_by: None,
        };
        usages::insert(&mut *tx, &usage).await?;
        tx.commit().await.map_err(StoreError::from)?;
        info!(
            usage_id = %usage.id,
            %project_id,
            usage_role = %usage.usage_role,
            scope_status = %usage.scope_status,
            "project usage recorded"
        );
        Ok(usage)
    }

    /// Usages of an existing project, newest first.
    pub async fn list_usages(
        &self,
        project_id: Uuid,
        filter: &UsageFilter,
    ) -> Result<Vec<ProjectUsage>, ServiceError> {
        if projects::get(self.store.pool(), project_id).await?.is_none() {
            return Err(ServiceError::NotFound("project"));
        }
        Ok(usages::list(self.store.pool(), project_id, filter).await?)
    }

    /// Replace the usage's scope status with a reviewer decision.
    ///
    /// Always stamps `evaluated_at`/`evaluated_by` and appends a
    /// `SCOPE_OVERRIDE` entry, also when the status does not change.
    pub async fn override_scope(
        &self,
        project_id: Uuid,
        usage_id: Uuid,
        decision: &ScopeOverride,
        actor: &str,
    ) -> Result<ProjectUsage, ServiceError> {
        let mut tx = self.store.begin().await?;
        // Stamped under the write lock so stamps follow commit order.
        let now = time::now();
        let previous = usages::get(&mut *tx, usage_id)
            .await?
            .filter(|usage| usage.project_id == project_id)
            .ok_or(ServiceError::NotFound("project usage"))?;
        let updated = usages::update_scope(
            &mut *tx,
            usage_id,
            decision.scope_status,
            decision.reason_note.as_deref(),
            now,
            actor,
        )
        .await?
        .ok_or(ServiceError::NotFound("project usage"))?;

        let mut summary = format!(
            "project={} scopeStatus={} previous={}",
            project_id, updated.scope_status, previous.scope_status
        );
        if let Some(reason) = &decision.reason_note {
            summary.push_str(" reason=");
            summary.push_str(reason);
        }
        let entry = NewAuditEntry::new(
            AuditEntity::ProjectUsage,
            usage_id,
            AuditAction::ScopeOverride,
            actor,
        )
        .with_summary(summary);
        audit_logs::record(&mut *tx, &entry, now).await?;
        tx.commit().await.map_err(StoreError::from)?;

        info!(
            %usage_id,
            %project_id,
            actor,
            from = %previous.scope_status,
            to = %updated.scope_status,
            "scope overridden"
        );
        Ok(updated)
    }
}
