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
use osscat_governance::{AuditFilter, AuditLog, NewAuditEntry};
use osscat_store::{audit_logs, Store};

use crate::ServiceError;

/// Read access to the audit trail, plus standalone appends.
#[derive(Clone)]
pub struct AuditTrail {
    store: Store,
}

impl AuditTrail {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Append an entry outside any other mutation.
    pub async fn record(&self, entry: &NewAuditEntry) -> Result<AuditLog, ServiceError> {
        Ok(audit_logs::record(self.store.pool(), entry, time::now()).await?)
    }

    /// Newest first; unset filters impose no constraint.
    pub async fn search(&self, filter: &AuditFilter) -> Result<Vec<AuditLog>, ServiceError> {
        Ok(audit_logs::search(self.store.pool(), filter).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::store;
    use osscat_governance::{AuditAction, AuditEntity};

    #[tokio::test]
    async fn recorded_entries_are_searchable() {
        let trail = AuditTrail::new(store().await);
        let entry = NewAuditEntry::new(AuditEntity::Project, "p-1", AuditAction::ProjectDelete, "admin")
            .with_summary("projectCode=P-1");
        let recorded = trail.record(&entry).await.unwrap();
        let found = trail.search(&AuditFilter::default()).await.unwrap();
        assert_eq!(found, vec![recorded]);
    }

    #[tokio::test]
    async fn inverted_window_matches_nothing() {
        let trail = AuditTrail::new(store().await);
        let entry = NewAuditEntry::new(AuditEntity::User, "u-1", AuditAction::Logout, "alice");
        let recorded = trail.record(&entry).await.unwrap();
        let filter = AuditFilter {
            from: Some(recorded.created_at),
            to: Some(recorded.created_at - chrono::Duration::seconds(1)),
            ..AuditFilter::default()
        };
        assert!(trail.search(&filter).await.unwrap().is_empty());
    }
}
