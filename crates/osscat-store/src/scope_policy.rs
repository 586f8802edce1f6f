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
use osscat_governance::{PolicyPatch, ScopePolicy};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteExecutor};
use uuid::Uuid;

use crate::{codec, StoreError};

fn from_row(row: &SqliteRow) -> Result<ScopePolicy, StoreError> {
    Ok(ScopePolicy {
        id: codec::uuid(row, "id")?,
        runtime_required_default_in_scope: row.try_get("runtime_required_default_in_scope")?,
        server_env_included: row.try_get("server_env_included")?,
        auto_mark_forks_in_scope: row.try_get("auto_mark_forks_in_scope")?,
        updated_at: codec::timestamp(row, "updated_at")?,
        updated_by: row.try_get("updated_by")?,
    })
}

/// The current policy, or `None` when none was ever written.
pub async fn get<'e, E>(executor: E) -> Result<Option<ScopePolicy>, StoreError>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query(
        r"
        SELECT id, runtime_required_default_in_scope, server_env_included,
               auto_mark_forks_in_scope, updated_at, updated_by
        FROM scope_policies
        WHERE singleton = 1
        ",
    )
    .fetch_optional(executor)
    .await?;
    row.as_ref().map(from_row).transpose()
}

/// Create the policy or merge the set fields into it, in one statement.
///
/// On insert unset flags are false and a new id is assigned; on conflict the
/// existing id is kept. `updated_at`/`updated_by` are always stamped.
pub async fn upsert<'e, E>(
    executor: E,
    patch: &PolicyPatch,
    actor: &str,
    at: DateTime<Utc>,
) -> Result<ScopePolicy, StoreError>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query(
        r"
        INSERT INTO scope_policies (
            singleton, id, runtime_required_default_in_scope, server_env_included,
            auto_mark_forks_in_scope, updated_at, updated_by
        )
        VALUES (1, ?, COALESCE(?, 0), COALESCE(?, 0), COALESCE(?, 0), ?, ?)
        ON CONFLICT (singleton) DO UPDATE SET
            runtime_required_default_in_scope =
                COALESCE(?, scope_policies.runtime_required_default_in_scope),
            server_env_included = COALESCE(?, scope_policies.server_env_included),
            auto_mark_forks_in_scope = COALESCE(?, scope_policies.auto_mark_forks_in_scope),
            updated_at = excluded.updated_at,
            updated_by = excluded.updated_by
        RETURNING id, runtime_required_default_in_scope, server_env_included,
                  auto_mark_forks_in_scope, updated_at, updated_by
        ",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(patch.runtime_required_default_in_scope)
    .bind(patch.server_env_included)
    .bind(patch.auto_mark_forks_in_scope)
    .bind(time::to_db(&at))
    .bind(actor)
    .bind(patch.runtime_required_default_in_scope)
    .bind(patch.server_env_included)
    .bind(patch.auto_mark_forks_in_scope)
    .fetch_one(executor)
    .await?;
    from_row(&row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Store;

    #[tokio::test]
    async fn missing_policy_reads_as_none() {
        let store = Store::in_memory().await.unwrap();
        assert!(get(store.pool()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn first_upsert_defaults_unset_fields_to_false() {
        let store = Store::in_memory().await.unwrap();
        let patch = PolicyPatch {
            server_env_included: Some(true),
            ..PolicyPatch::default()
        };
        let created = upsert(store.pool(), &patch, "admin", time::now()).await.unwrap();
        assert!(created.server_env_included);
        assert!(!created.runtime_required_default_in_scope);
        assert!(!created.auto_mark_forks_in_scope);
        assert_eq!(created.updated_by, "admin");
        assert_eq!(get(store.pool()).await.unwrap(), Some(created));
    }

    #[tokio::test]
    async fn later_upserts_merge_and_keep_identity() {
        let store = Store::in_memory().await.unwrap();
        let first = upsert(
            store.pool(),
            &PolicyPatch {
                runtime_required_default_in_scope: Some(true),
                server_env_included: Some(true),
                ..PolicyPatch::default()
            },
            "admin",
            time::now(),
        )
        .await
        .unwrap();

        let later = time::now() + chrono::Duration::seconds(5);
        let second = upsert(
            store.pool(),
            &PolicyPatch {
                server_env_included: Some(false),
                ..PolicyPatch::default()
            },
            "bob",
            later,
        )
        .await
        .unwrap();

        assert_eq!(second.id, first.id);
        assert!(second.runtime_required_default_in_scope);
        assert!(!second.server_env_included);
        assert_eq!(second.updated_by, "bob");
        assert_eq!(second.updated_at, later);

        let untouched = upsert(store.pool(), &PolicyPatch::default(), "carol", later)
            .await
            .unwrap();
        assert!(untouched.runtime_required_default_in_scope);
        assert_eq!(untouched.updated_by, "carol");

        let rows: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM scope_policies")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(rows.0, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_first_upserts_keep_a_single_row() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::connect(&osscat_common::config::DatabaseConfig {
            url: format!("sqlite://{}", dir.path().join("policy.db").display()),
            max_connections: 8,
        })
        .await
        .unwrap();

        let writers: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    let mut tx = store.begin().await?;
                    let patch = PolicyPatch {
                        auto_mark_forks_in_scope: Some(i % 2 == 1),
                        ..PolicyPatch::default()
                    };
                    let policy = upsert(&mut *tx, &patch, &format!("admin-{i}"), time::now()).await?;
                    tx.commit().await?;
                    Ok::<_, StoreError>(policy.id)
                })
            })
            .collect();
        let mut ids = Vec::new();
        for writer in writers {
            ids.push(writer.await.unwrap().unwrap());
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);

        let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM scope_policies")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(rows, 1);
        store.close().await;
    }
}
