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
use osscat_governance::{ProjectUsage, ScopeStatus, UsageFilter};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteExecutor};
use uuid::Uuid;

use crate::{codec, StoreError};

const COLUMNS: &str = "id, project_id, oss_id, oss_version_id, usage_role, scope_status, \
     inclusion_note, direct_dependency, added_at, evaluated_at, evaluated_by";

fn from_row(row: &SqliteRow) -> Result<ProjectUsage, StoreError> {
    Ok(ProjectUsage {
        id: codec::uuid(row, "id")?,
        project_id: codec::uuid(row, "project_id")?,
        oss_id: codec::uuid(row, "oss_id")?,
        oss_version_id: codec::uuid(row, "oss_version_id")?,
        usage_role: codec::parsed(row, "usage_role")?,
        scope_status: codec::parsed(row, "scope_status")?,
        inclusion_note: row.try_get("inclusion_note")?,
        direct_dependency: row.try_get("direct_dependency")?,
        added_at: codec::timestamp(row, "added_at")?,
        evaluated_at: codec::opt_timestamp(row, "evaluated_at")?,
        evaluated_by: row.try_get("evaluated_by")?,
    })
}

pub async fn insert<'e, E>(executor: E, usage: &ProjectUsage) -> Result<(), StoreError>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        r"
        INSERT INTO project_usages
            (id, project_id, oss_id, oss_version_id, usage_role, scope_status,
             inclusion_note, direct_dependency, added_at, evaluated_at, evaluated_by)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ",
    )
    .bind(usage.id.to_string())
    .bind(usage.project_id.to_string())
    .bind(usage.oss_id.to_string())
    .bind(usage.oss_version_id.to_string())
    .bind(usage.usage_role.as_str())
    .bind(usage.scope_status.as_str())
    .bind(usage.inclusion_note.as_deref())
    .bind(usage.direct_dependency)
    .bind(time::to_db(&usage.added_at))
    .bind(usage.evaluated_at.as_ref().map(time::to_db))
    .bind(usage.evaluated_by.as_deref())
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn get<'e, E>(executor: E, id: Uuid) -> Result<Option<ProjectUsage>, StoreError>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("SELECT {COLUMNS} FROM project_usages WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(executor)
        .await?;
    row.as_ref().map(from_row).transpose()
}

/// Usages of one project matching every set filter, newest first.
pub async fn list<'e, E>(
    executor: E,
    project_id: Uuid,
    filter: &UsageFilter,
) -> Result<Vec<ProjectUsage>, StoreError>
where
    E: SqliteExecutor<'e>,
{
    let mut sql = format!("SELECT {COLUMNS} FROM project_usages WHERE project_id = ?");
    if filter.scope_status.is_some() {
        sql.push_str(" AND scope_status = ?");
    }
    if filter.usage_role.is_some() {
        sql.push_str(" AND usage_role = ?");
    }
    if filter.direct.is_some() {
        sql.push_str(" AND direct_dependency = ?");
    }
    sql.push_str(" ORDER BY added_at DESC, rowid DESC");

    let mut query = sqlx::query(&sql).bind(project_id.to_string());
    if let Some(status) = filter.scope_status {
        query = query.bind(status.as_str());
    }
    if let Some(role) = filter.usage_role {
        query = query.bind(role.as_str());
    }
    if let Some(direct) = filter.direct {
        query = query.bind(direct);
    }
    let rows = query.fetch_all(executor).await?;
    rows.iter().map(from_row).collect()
}

/// Apply a reviewer decision. Status, note, and the evaluation stamp change
/// together in one statement. `None` if no such usage.
pub async fn update_scope<'e, E>(
    executor: E,
    id: Uuid,
    status: ScopeStatus,
    inclusion_note: Option<&str>,
    evaluated_at: DateTime<Utc>,
    evaluated_by: &str,
) -> Result<Option<ProjectUsage>, StoreError>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!(
        "UPDATE project_usages \
         SET scope_status = ?, inclusion_note = ?, evaluated_at = ?, evaluated_by = ? \
         WHERE id = ? RETURNING {COLUMNS}"
    );
    let row = sqlx::query(&sql)
        .bind(status.as_str())
        .bind(inclusion_note)
        .bind(time::to_db(&evaluated_at))
        .bind(evaluated_by)
        .bind(id.to_string())
        .fetch_optional(executor)
        .await?;
    row.as_ref().map(from_row).transpose()
}
