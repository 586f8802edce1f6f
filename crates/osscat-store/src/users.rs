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
use osscat_security::{PasswordDigest, Role, RoleSet, User};
use serde::Deserialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteExecutor};
use uuid::Uuid;

use crate::{codec, StoreError};

const COLUMNS: &str = "id, username, display_name, email, roles, active, password_hash, \
     created_at, updated_at";

/// Optional listing filters, ANDed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFilter {
    /// Substring of the username.
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

fn encode_roles(roles: &RoleSet) -> Result<String, StoreError> {
    serde_json::to_string(roles).map_err(|err| StoreError::Decode(format!("roles: {err}")))
}

fn from_row(row: &SqliteRow) -> Result<User, StoreError> {
    let roles: String = row.try_get("roles")?;
    let roles: RoleSet =
        serde_json::from_str(&roles).map_err(|err| StoreError::Decode(format!("roles: {err}")))?;
    let digest: String = row.try_get("password_hash")?;
    Ok(User {
        id: codec::uuid(row, "id")?,
        username: row.try_get("username")?,
        display_name: row.try_get("display_name")?,
        email: row.try_get("email")?,
        roles,
        active: row.try_get("active")?,
        credential: PasswordDigest::from_stored(digest),
        created_at: codec::timestamp(row, "created_at")?,
        updated_at: codec::timestamp(row, "updated_at")?,
    })
}

/// Insert a user. A taken username is a [`StoreError::Conflict`].
pub async fn insert<'e, E>(executor: E, user: &User) -> Result<(), StoreError>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        r"
        INSERT INTO users
            (id, username, display_name, email, roles, active, password_hash,
             created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ",
    )
    .bind(user.id.to_string())
    .bind(&user.username)
    .bind(user.display_name.as_deref())
    .bind(user.email.as_deref())
    .bind(encode_roles(&user.roles)?)
    .bind(user.active)
    .bind(user.credential.as_str())
    .bind(time::to_db(&user.created_at))
    .bind(time::to_db(&user.updated_at))
    .execute(executor)
    .await?;
    Ok(())
}

/// Overwrite every mutable column of an existing user.
pub async fn update<'e, E>(executor: E, user: &User) -> Result<(), StoreError>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        r"
        UPDATE users
        SET display_name = ?, email = ?, roles = ?, active = ?, password_hash = ?, updated_at = ?
        WHERE id = ?
        ",
    )
    .bind(user.display_name.as_deref())
    .bind(user.email.as_deref())
    .bind(encode_roles(&user.roles)?)
    .bind(user.active)
    .bind(user.credential.as_str())
    .bind(time::to_db(&user.updated_at))
    .bind(user.id.to_string())
    .execute(executor)
    .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound("user"));
    }
    Ok(())
}

pub async fn get<'e, E>(executor: E, id: Uuid) -> Result<Option<User>, StoreError>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("SELECT {COLUMNS} FROM users WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(executor)
        .await?;
    row.as_ref().map(from_row).transpose()
}

pub async fn find_by_username<'e, E>(executor: E, username: &str) -> Result<Option<User>, StoreError>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("SELECT {COLUMNS} FROM users WHERE username = ?");
    let row = sqlx::query(&sql)
        .bind(username)
        .fetch_optional(executor)
        .await?;
    row.as_ref().map(from_row).transpose()
}

/// Users matching every set filter, ordered by username.
pub async fn search<'e, E>(executor: E, filter: &UserFilter) -> Result<Vec<User>, StoreError>
where
    E: SqliteExecutor<'e>,
{
    let mut conditions = Vec::new();
    if filter.username.is_some() {
        conditions.push("instr(username, ?) > 0");
    }
    if filter.role.is_some() {
        conditions.push("EXISTS (SELECT 1 FROM json_each(users.roles) WHERE json_each.value = ?)");
    }
    let mut sql = format!("SELECT {COLUMNS} FROM users");
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
    sql.push_str(" ORDER BY username");

    let mut query = sqlx::query(&sql);
    if let Some(username) = &filter.username {
        query = query.bind(username.as_str());
    }
    if let Some(role) = filter.role {
        query = query.bind(role.as_str());
    }
    let rows = query.fetch_all(executor).await?;
    rows.iter().map(from_row).collect()
}

/// Remove a user. Returns whether a row existed.
pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<bool, StoreError>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id.to_string())
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}
