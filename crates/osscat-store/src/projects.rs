//! ---
//! osscat_section: "03-persistence-logging"
//! osscat_subsection: "module"
//! osscat_type: "source"
//! osscat_scope: "code"
//! osscat_description: "Relational persistence for the OSS catalog."
//! osscat_version: "v0.0.0-prealpha"
//! osscat_owner: "tbd"
//! ---
use osscat_common::time;
use osscat_governance::Project;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteExecutor};
use uuid::Uuid;

use crate::{codec, StoreError};

const COLUMNS: &str =
    "id, project_code, name, department, manager, description, created_at, updated_at";

fn from_row(row: &SqliteRow) -> Result<Project, StoreError> {
    Ok(Project {
        id: codec::uuid(row, "id")?,
        project_code: row.try_get("project_code")?,
        name: row.try_get("name")?,
        department: row.try_get("department")?,
        manager: row.try_get("manager")?,
        description: row.try_get("description")?,
        created_at: codec::timestamp(row, "created_at")?,
        updated_at: codec::timestamp(row, "updated_at")?,
    })
}

/// Insert a project. A duplicate project code is a [`StoreError::Conflict`].
pub async fn insert<'e, E>(executor: E, project: &Project) -> Result<(), StoreError>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        r"
        INSERT INTO projects
            (id, project_code, name, department, manager, description, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ",
    )
    .bind(project.id.to_string())
    .bind(&project.project_code)
    .bind(&project.name)
    .bind(project.department.as_deref())
    .bind(project.manager.as_deref())
    .bind(project.description.as_deref())
    .bind(time::to_db(&project.created_at))
    .bind(time::to_db(&project.updated_at))
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn get<'e, E>(executor: E, id: Uuid) -> Result<Option<Project>, StoreError>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("SELECT {COLUMNS} FROM projects WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(executor)
        .await?;
    row.as_ref().map(from_row).transpose()
}

pub async fn list<'e, E>(executor: E) -> Result<Vec<Project>, StoreError>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("SELECT {COLUMNS} FROM projects ORDER BY project_code");
    let rows = sqlx::query(&sql).fetch_all(executor).await?;
    rows.iter().map(from_row).collect()
}

/// Delete a project; its usages go with it. Returns whether a row existed.
pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<bool, StoreError>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM projects WHERE id = ?")
        .bind(id.to_string())
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}
