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
use osscat_governance::{
    normalize_name, AuditAction, AuditEntity, NewAuditEntry, NewOssComponent, NewOssVersion,
    NewProject, OssComponent, OssVersion, Project, ReviewStatus,
};
use osscat_store::{audit_logs, oss, projects, Store, StoreError};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::ServiceError;

/// Review decision on an OSS version.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionReview {
    pub review_status: ReviewStatus,
    #[serde(default)]
    pub note: Option<String>,
}

/// Projects, components, and versions.
#[derive(Clone)]
pub struct CatalogService {
    store: Store,
}

impl CatalogService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn create_project(&self, request: &NewProject) -> Result<Project, ServiceError> {
        request.validate()?;
        let now = time::now();
        let project = Project {
            id: Uuid::new_v4(),
            project_code: request.project_code.trim().to_owned(),
            name: request.name.trim().to_owned(),
            department: request.department.clone(),
            manager: request.manager.clone(),
            description: request.description.clone(),
            created_at: now,
            updated_at: now,
        };
        projects::insert(self.store.pool(), &project).await?;
        info!(project_id = %project.id, project_code = %project.project_code, "project created");
        Ok(project)
    }

    pub async fn get_project(&self, id: Uuid) -> Result<Project, ServiceError> {
        projects::get(self.store.pool(), id)
            .await?
            .ok_or(ServiceError::NotFound("project"))
    }

    pub async fn list_projects(&self) -> Result<Vec<Project>, ServiceError> {
        Ok(projects::list(self.store.pool()).await?)
    }

    /// Delete a project and its usages, recording `PROJECT_DELETE`.
    pub async fn delete_project(&self, id: Uuid, actor: &str) -> Result<(), ServiceError> {
        let now = time::now();
        let mut tx = self.store.begin().await?;
        let project = projects::get(&mut *tx, id)
            .await?
            .ok_or(ServiceError::NotFound("project"))?;
        projects::delete(&mut *tx, id).await?;
        let entry = NewAuditEntry::new(AuditEntity::Project, id, AuditAction::ProjectDelete, actor)
            .with_summary(format!("projectCode={}", project.project_code));
        audit_logs::record(&mut *tx, &entry, now).await?;
        tx.commit().await.map_err(StoreError::from)?;
        info!(project_id = %id, actor, "project deleted");
        Ok(())
    }

    pub async fn create_component(
        &self,
        request: &NewOssComponent,
    ) -> Result<OssComponent, ServiceError> {
        request.validate()?;
        let now = time::now();
        let component = OssComponent {
            id: Uuid::new_v4(),
            name: request.name.trim().to_owned(),
            normalized_name: normalize_name(&request.name),
            homepage_url: request.homepage_url.clone(),
            repository_url: request.repository_url.clone(),
            description: request.description.clone(),
            deprecated: false,
            created_at: now,
            updated_at: now,
        };
        oss::insert_component(self.store.pool(), &component).await?;
        info!(oss_id = %component.id, name = %component.name, "oss component created");
        Ok(component)
    }

    /// Add a version in `DRAFT` review status.
    pub async fn create_version(
        &self,
        oss_id: Uuid,
        request: &NewOssVersion,
    ) -> Result<OssVersion, ServiceError> {
        request.validate()?;
        if oss::get_component(self.store.pool(), oss_id).await?.is_none() {
            return Err(ServiceError::NotFound("oss component"));
        }
        let now = time::now();
        let version = OssVersion {
            id: Uuid::new_v4(),
            oss_id,
            version: request.version.trim().to_owned(),
            license_expression_raw: request.license_expression_raw.clone(),
            license_concluded: request.license_concluded.clone(),
            purl: request.purl.clone(),
            modified: request.modified,
            modification_description: request.modification_description.clone(),
            fork_origin_url: request.fork_origin_url.clone(),
            review_status: ReviewStatus::Draft,
            last_reviewed_at: None,
            created_at: now,
            updated_at: now,
        };
        oss::insert_version(self.store.pool(), &version).await?;
        info!(%oss_id, version_id = %version.id, version = %version.version, "oss version created");
        Ok(version)
    }

    pub async fn get_version(&self, oss_id: Uuid, version_id: Uuid) -> Result<OssVersion, ServiceError> {
        oss::get_version(self.store.pool(), version_id)
            .await?
            .filter(|version| version.oss_id == oss_id)
            .ok_or(ServiceError::NotFound("oss version"))
    }

    /// Change the review status and stamp `last_reviewed_at`, recording
    /// `VERSION_REVIEW` in the same transaction.
    pub async fn review_version(
        &self,
        oss_id: Uuid,
        version_id: Uuid,
        review: &VersionReview,
        actor: &str,
    ) -> Result<OssVersion, ServiceError> {
        let now = time::now();
        let mut tx = self.store.begin().await?;
        let previous = oss::get_version(&mut *tx, version_id)
            .await?
            .filter(|version| version.oss_id == oss_id)
            .ok_or(ServiceError::NotFound("oss version"))?;
        let reviewed = oss::update_review(&mut *tx, version_id, review.review_status, now)
            .await?
            .ok_or(ServiceError::NotFound("oss version"))?;
        let mut summary = format!(
            "reviewStatus={} previous={}",
            reviewed.review_status, previous.review_status
        );
        if let Some(note) = &review.note {
            summary.push_str(" note=");
            summary.push_str(note);
        }
        let entry = NewAuditEntry::new(
            AuditEntity::OssVersion,
            version_id,
            AuditAction::VersionReview,
            actor,
        )
        .with_summary(summary);
        audit_logs::record(&mut *tx, &entry, now).await?;
        tx.commit().await.map_err(StoreError::from)?;
        info!(%version_id, actor, review_status = %reviewed.review_status, "oss version reviewed");
        Ok(reviewed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::store;
    use osscat_governance::AuditFilter;

    fn new_project(code: &str) -> NewProject {
        NewProject {
            project_code: code.into(),
            name: "Telemetry".into(),
            department: None,
            manager: Some("carol".into()),
            description: None,
        }
    }

    fn new_version(label: &str) -> NewOssVersion {
        serde_json::from_value(serde_json::json!({ "version": label })).unwrap()
    }

    #[tokio::test]
    async fn duplicate_project_code_is_invalid_input() {
        let catalog = CatalogService::new(store().await);
        catalog.create_project(&new_project("TL-1")).await.unwrap();
        let err = catalog.create_project(&new_project("TL-1")).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
        assert!(matches!(
            catalog.create_project(&new_project("")).await,
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn delete_project_is_audited() {
        let catalog = CatalogService::new(store().await);
        let project = catalog.create_project(&new_project("TL-2")).await.unwrap();
        catalog.delete_project(project.id, "admin").await.unwrap();
        assert!(matches!(
            catalog.get_project(project.id).await,
            Err(ServiceError::NotFound("project"))
        ));
        let logs = audit_logs::search(
            catalog.store.pool(),
            &AuditFilter::entity(AuditEntity::Project, project.id),
        )
        .await
        .unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].action, "PROJECT_DELETE");
        assert!(matches!(
            catalog.delete_project(project.id, "admin").await,
            Err(ServiceError::NotFound("project"))
        ));
    }

    #[tokio::test]
    async fn version_review_stamps_and_audits() {
        let catalog = CatalogService::new(store().await);
        let component = catalog
            .create_component(&NewOssComponent {
                name: "Left Pad".into(),
                homepage_url: None,
                repository_url: None,
                description: None,
            })
            .await
            .unwrap();
        assert_eq!(component.normalized_name, "left-pad");
        let version = catalog
            .create_version(component.id, &new_version("1.3.0"))
            .await
            .unwrap();
        assert_eq!(version.review_status, ReviewStatus::Draft);

        let review = VersionReview {
            review_status: ReviewStatus::Verified,
            note: Some("license text checked".into()),
        };
        let reviewed = catalog
            .review_version(component.id, version.id, &review, "alice")
            .await
            .unwrap();
        assert_eq!(reviewed.review_status, ReviewStatus::Verified);
        assert!(reviewed.last_reviewed_at.is_some());
        assert_eq!(
            catalog.get_version(component.id, version.id).await.unwrap(),
            reviewed
        );

        let logs = audit_logs::search(
            catalog.store.pool(),
            &AuditFilter::entity(AuditEntity::OssVersion, version.id),
        )
        .await
        .unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].action, "VERSION_REVIEW");
        assert!(logs[0].summary.as_deref().unwrap().contains("reviewStatus=VERIFIED"));
    }

    #[tokio::test]
    async fn version_must_belong_to_component() {
        let catalog = CatalogService::new(store().await);
        assert!(matches!(
            catalog.create_version(Uuid::new_v4(), &new_version("1.0.0")).await,
            Err(ServiceError::NotFound("oss component"))
        ));
        let component = catalog
            .create_component(&NewOssComponent {
                name: "zstd".into(),
                homepage_url: None,
                repository_url: None,
                description: None,
            })
            .await
            .unwrap();
        let version = catalog
            .create_version(component.id, &new_version("1.5.6"))
            .await
            .unwrap();
        assert!(matches!(
            catalog.get_version(Uuid::new_v4(), version.id).await,
            Err(ServiceError::NotFound("oss version"))
        ));
    }
}
