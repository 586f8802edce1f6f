//! ---
//! osscat_section: "03-persistence-logging"
//! osscat_subsection: "module"
//! osscat_type: "source"
//! osscat_scope: "code"
//! osscat_description: "Relational persistence for the OSS catalog."
//! osscat_version: "v0.0.0-prealpha"
//! osscat_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use osscat_common::time;
use osscat_governance::{OssComponent, OssVersion, ReviewStatus};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteExecutor};
use uuid::Uuid;

use crate::{codec, StoreError};

const COMPONENT_COLUMNS: &str = "id, name, normalized_name, homepage_url, repository_url, \
     description, deprecated, created_at, updated_at";

const VERSION_COLUMNS: &str = "id, oss_id, version, license_expression_raw, license_concluded, \
     purl, modified, modification_description, fork_origin_url, review_status, \
     last_reviewed_at, created_at, updated_at";

fn component_from_row(row: &SqliteRow) -> Result<OssComponent, StoreError> {
    Ok(OssComponent {
        id: codec::uuid(row, "id")?,
        name: row.try_get("name")?,
        normalized_name: row.try_get("normalized_name")?,
        homepage_url: row.try_get("homepage_url")?,
        repository_url: row.try_get("repository_url")?,
        description: row.try_get("description")?,
        deprecated: row.try_get("deprecated")?,
        created_at: codec::timestamp(row, "created_at")?,
        updated_at: codec::timestamp(row, "updated_at")?,
    })
}

fn version_from_row(row: &SqliteRow) -> Result<OssVersion, StoreError> {
    Ok(OssVersion {
        id: codec::uuid(row, "id")?,
        oss_id: codec::uuid(row, "oss_id")?,
        version: row.try_get("version")?,
        license_expression_raw: row.try_get("license_expression_raw")?,
        license_concluded: row.try_get("license_concluded")?,
        purl: row.try_get("purl")?,
        modified: row.try_get("modified")?,
        modification_description: row.try_get("modification_description")?,
        fork_origin_url: row.try_get("fork_origin_url")?,
        review_status: codec::parsed(row, "review_status")?,
        last_reviewed_at: codec::opt_timestamp(row, "last_reviewed_at")?,
        created_at: codec::timestamp(row, "created_at")?,
        updated_at: codec::timestamp(row, "updated_at")?,
    })
}

/// Insert a component. The normalized name is unique.
pub async fn insert_component<'e, E>(executor: E, component: &OssComponent) -> Result<(), StoreError>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        r"
        INSERT INTO oss_components
            (id, name, normalized_name, homepage_url, repository_url, description,
             deprecated, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ",
    )
    .bind(component.id.to_string())
    .bind(&component.name)
    .bind(&component.normalized_name)
    .bind(component.homepage_url.as_deref())
    .bind(component.repository_url.as_deref())
    .bind(component.description.as_deref())
    .bind(component.deprecated)
    .bind(time::to_db(&component.created_at))
    .bind(time::to_db(&component.updated_at))
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn get_component<'e, E>(executor: E, id: Uuid) -> Result<Option<OssComponent>, StoreError>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("SELECT {COMPONENT_COLUMNS} FROM oss_components WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(executor)
        .await?;
    row.as_ref().map(component_from_row).transpose()
}

/// Insert a version. `(oss_id, version)` is unique.
pub async fn insert_version<'e, E>(executor: E, version: &OssVersion) -> Result<(), StoreError>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        r"
        INSERT INTO oss_versions
            (id, oss_id, version, license_expression_raw, license_concluded, purl, modified,
             modification_description, fork_origin_url, review_status, last_reviewed_at,
             created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ",
    )
    .bind(version.id.to_string())
    .bind(version.oss_id.to_string())
    .bind(&version.version)
    .bind(version.license_expression_raw.as_deref())
    .bind(version.license_concluded.as_deref())
    .bind(version.purl.as_deref())
    .bind(version.modified)
    .bind(version.modification_description.as_deref())
    .bind(version.fork_origin_url.as_deref())
    .bind(version.review_status.as_str())
    .bind(version.last_reviewed_at.as_ref().map(time::to_db))
    .bind(time::to_db(&version.created_at))
    .bind(time::to_db(&version.updated_at))
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn get_version<'e, E>(executor: E, id: Uuid) -> Result<Option<OssVersion>, StoreError>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("SELECT {VERSION_COLUMNS} FROM oss_versions WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(executor)
        .await?;
    row.as_ref().map(version_from_row).transpose()
}

/// Set the review status and stamp `last_reviewed_at`. `None` if no such version.
pub async fn update_review<'e, E>(
    executor: E,
    id: Uuid,
    status: ReviewStatus,
    at: DateTime<Utc>,
) -> Result<Option<OssVersion>, StoreError>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!(
        "UPDATE oss_versions SET review_status = ?, last_reviewed_at = ?, updated_at = ? \
         WHERE id = ? RETURNING {VERSION_COLUMNS}"
    );
    let stamp = time::to_db(&at);
    let row = sqlx::query(&sql)
        .bind(status.as_str())
        .bind(&stamp)
        .bind(&stamp)
        .bind(id.to_string())
        .fetch_optional(executor)
        .await?;
    row.as_ref().map(version_from_row).transpose()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::Store;
    use osscat_governance::normalize_name;

    pub(crate) fn component(name: &str) -> OssComponent {
        let now = time::now();
        OssComponent {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            normalized_name: normalize_name(name),
            homepage_url: None,
            repository_url: Some(format!("https://example.org/{name}")),
            description: None,
            deprecated: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub(crate) fn version(oss_id: Uuid, label: &str) -> OssVersion {
        let now = time::now();
        OssVersion {
            id: Uuid::new_v4(),
            oss_id,
            version: label.to_owned(),
            license_expression_raw: Some("MIT".into()),
            license_concluded: None,
            purl: None,
            modified: false,
            modification_description: None,
            fork_origin_url: None,
            review_status: ReviewStatus::Draft,
            last_reviewed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn component_and_version_round_trip() {
        let store = Store::in_memory().await.unwrap();
        let c = component("Left_Pad");
        insert_component(store.pool(), &c).await.unwrap();
        let fetched = get_component(store.pool(), c.id).await.unwrap().unwrap();
        assert_eq!(fetched.normalized_name, "left-pad");

        let v = version(c.id, "1.3.0");
        insert_version(store.pool(), &v).await.unwrap();
        assert_eq!(get_version(store.pool(), v.id).await.unwrap(), Some(v.clone()));

        let dup = version(c.id, "1.3.0");
        assert!(matches!(
            insert_version(store.pool(), &dup).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn version_requires_component() {
        let store = Store::in_memory().await.unwrap();
        let orphan = version(Uuid::new_v4(), "0.1.0");
        assert!(insert_version(store.pool(), &orphan).await.is_err());
    }

    #[tokio::test]
    async fn review_update_stamps_reviewed_at() {
        let store = Store::in_memory().await.unwrap();
        let c = component("serde");
        insert_component(store.pool(), &c).await.unwrap();
        let v = version(c.id, "1.0.0");
        insert_version(store.pool(), &v).await.unwrap();

        let at = time::now();
        let reviewed = update_review(store.pool(), v.id, ReviewStatus::Verified, at)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reviewed.review_status, ReviewStatus::Verified);
        assert_eq!(reviewed.last_reviewed_at, Some(at));
        assert!(update_review(store.pool(), Uuid::new_v4(), ReviewStatus::Verified, at)
            .await
            .unwrap()
            .is_none());
    }
}
