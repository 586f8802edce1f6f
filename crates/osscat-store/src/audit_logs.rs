//! ---
//! osscat_section: "03-persistence-logging"
//! osscat_subsection: "module"
//! osscat_type: "source"
//! osscat_scope: "code"
//! osscat_description: "Relational persistence for the OSS catalog."
//! osscat_version: "v0.0.0-prealpha"
//! osscat_owner: "tbd"
//! ---
//! Append-only audit trail. Rows are never updated or deleted; the schema
//! rejects both with triggers.

use chrono::{DateTime, Utc};
use osscat_common::time;
use osscat_governance::{AuditFilter, AuditLog, NewAuditEntry};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteExecutor};
use uuid::Uuid;

use crate::{codec, StoreError};

const COLUMNS: &str = "id, entity_type, entity_id, action, user_name, summary, created_at";

fn from_row(row: &SqliteRow) -> Result<AuditLog, StoreError> {
    Ok(AuditLog {
        id: codec::uuid(row, "id")?,
        entity_type: row.try_get("entity_type")?,
        entity_id: row.try_get("entity_id")?,
        action: row.try_get("action")?,
        user_name: row.try_get("user_name")?,
        summary: row.try_get("summary")?,
        created_at: codec::timestamp(row, "created_at")?,
    })
}

/// Append one entry. Failure propagates so the caller's transaction rolls back.
pub async fn record<'e, E>(
    executor: E,
    entry: &NewAuditEntry,
    at: DateTime<Utc>,
) -> Result<AuditLog, StoreError>
where
    E: SqliteExecutor<'e>,
{
    let log = AuditLog {
        id: Uuid::new_v4(),
        entity_type: entry.entity_type.as_str().to_owned(),
        entity_id: entry.entity_id.clone(),
        action: entry.action.as_str().to_owned(),
        user_name: entry.user_name.clone(),
        summary: entry.summary.clone(),
        created_at: at,
    };
    sqlx::query(
        r"
        INSERT INTO audit_logs (id, entity_type, entity_id, action, user_name, summary, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ",
    )
    .bind(log.id.to_string())
    .bind(&log.entity_type)
    .bind(&log.entity_id)
    .bind(&log.action)
    .bind(&log.user_name)
    .bind(log.summary.as_deref())
    .bind(time::to_db(&log.created_at))
    .execute(executor)
    .await?;
    Ok(log)
}

/// Entries matching every set filter, newest first. Time bounds are inclusive
/// at the stored microsecond precision: `from` rounds up, `to` rounds down.
pub async fn search<'e, E>(executor: E, filter: &AuditFilter) -> Result<Vec<AuditLog>, StoreError>
where
    E: SqliteExecutor<'e>,
{
    let mut conditions = Vec::new();
    if filter.entity_type.is_some() {
        conditions.push("entity_type = ?");
    }
    if filter.entity_id.is_some() {
        conditions.push("entity_id = ?");
    }
    if filter.from.is_some() {
        conditions.push("created_at >= ?");
    }
    if filter.to.is_some() {
        conditions.push("created_at <= ?");
    }

    let mut sql = format!("SELECT {COLUMNS} FROM audit_logs");
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
    // rowid breaks ties between entries written in the same microsecond.
    sql.push_str(" ORDER BY created_at DESC, rowid DESC");

    let mut query = sqlx::query(&sql);
    if let Some(entity_type) = &filter.entity_type {
        query = query.bind(entity_type.as_str());
    }
    if let Some(entity_id) = &filter.entity_id {
        query = query.bind(entity_id.as_str());
    }
    if let Some(from) = &filter.from {
        query = query.bind(time::to_db(&time::ceil_micros(from)));
    }
    if let Some(to) = &filter.to {
        query = query.bind(time::to_db(to));
    }

    let rows = query.fetch_all(executor).await?;
    rows.iter().map(from_row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Store;
    use chrono::TimeZone;
    use osscat_governance::{AuditAction, AuditEntity};

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap()
    }

    async fn seeded() -> Store {
        let store = Store::in_memory().await.unwrap();
        let entries = [
            (AuditEntity::ProjectUsage, "u-1", at(0)),
            (AuditEntity::ProjectUsage, "u-2", at(10)),
            (AuditEntity::ScopePolicy, "p-1", at(20)),
            (AuditEntity::ProjectUsage, "u-1", at(30)),
        ];
        for (entity, id, ts) in entries {
            let entry = NewAuditEntry::new(entity, id, AuditAction::ScopeOverride, "alice")
                .with_summary("scopeStatus=IN_SCOPE");
            record(store.pool(), &entry, ts).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn unfiltered_search_is_newest_first() {
        let store = seeded().await;
        let logs = search(store.pool(), &AuditFilter::default()).await.unwrap();
        let times: Vec<_> = logs.iter().map(|log| log.created_at).collect();
        assert_eq!(times, vec![at(30), at(20), at(10), at(0)]);
    }

    #[tokio::test]
    async fn filters_are_conjunctive_with_inclusive_bounds() {
        let store = seeded().await;
        let filter = AuditFilter {
            from: Some(at(0)),
            to: Some(at(30)),
            ..AuditFilter::entity(AuditEntity::ProjectUsage, "u-1")
        };
        let logs = search(store.pool(), &filter).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert!(logs.iter().all(|log| filter.matches(log)));

        let window = AuditFilter {
            from: Some(at(10)),
            to: Some(at(20)),
            ..AuditFilter::default()
        };
        let logs = search(store.pool(), &window).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].entity_type, "SCOPE_POLICY");
        assert_eq!(logs[1].entity_id, "u-2");
    }

    #[tokio::test]
    async fn sub_microsecond_bounds_do_not_widen_the_window() {
        let store = Store::in_memory().await.unwrap();
        let base = at(0);
        let later = base + chrono::Duration::microseconds(1);
        for (id, ts) in [("on-the-second", base), ("one-micro-later", later)] {
            let entry = NewAuditEntry::new(AuditEntity::User, id, AuditAction::UserUpdate, "admin");
            record(store.pool(), &entry, ts).await.unwrap();
        }
        let half_micro = base + chrono::Duration::nanoseconds(500);

        let after = AuditFilter {
            from: Some(half_micro),
            ..AuditFilter::default()
        };
        let logs = search(store.pool(), &after).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].entity_id, "one-micro-later");
        assert!(logs.iter().all(|log| after.matches(log)));

        let before = AuditFilter {
            to: Some(half_micro),
            ..AuditFilter::default()
        };
        let logs = search(store.pool(), &before).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].entity_id, "on-the-second");
    }

    #[tokio::test]
    async fn same_instant_keeps_insertion_order_reversed() {
        let store = Store::in_memory().await.unwrap();
        for id in ["first", "second"] {
            let entry = NewAuditEntry::new(AuditEntity::User, id, AuditAction::UserUpdate, "admin");
            record(store.pool(), &entry, at(0)).await.unwrap();
        }
        let logs = search(store.pool(), &AuditFilter::default()).await.unwrap();
        assert_eq!(logs[0].entity_id, "second");
        assert_eq!(logs[1].entity_id, "first");
    }

    #[tokio::test]
    async fn entries_cannot_be_rewritten() {
        let store = seeded().await;
        let update = sqlx::query("UPDATE audit_logs SET user_name = 'mallory'")
            .execute(store.pool())
            .await;
        assert!(update.is_err());
        let delete = sqlx::query("DELETE FROM audit_logs").execute(store.pool()).await;
        assert!(delete.is_err());
        let logs = search(store.pool(), &AuditFilter::default()).await.unwrap();
        assert_eq!(logs.len(), 4);
        assert!(logs.iter().all(|log| log.user_name == "alice"));
    }
}
