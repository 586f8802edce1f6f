//! ---
//! osscat_section: "03-persistence-logging"
//! osscat_subsection: "module"
//! osscat_type: "source"
//! osscat_scope: "code"
//! osscat_description: "Relational persistence for the OSS catalog."
//! osscat_version: "v0.0.0-prealpha"
//! osscat_owner: "tbd"
//! ---
//! SQLite-backed store.
//!
//! Repository functions take any SQLite executor, so a service can run
//! several of them inside one transaction (`&mut *tx`) or directly against
//! the pool for single reads.

pub mod audit_logs;
mod codec;
mod error;
pub mod oss;
pub mod projects;
pub mod scope_policy;
pub mod usages;
pub mod users;

use std::str::FromStr;
use std::time::Duration;

use osscat_common::config::DatabaseConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use tracing::{debug, info};

pub use error::StoreError;
pub use users::UserFilter;

const SCHEMA: &str = include_str!("schema.sql");

/// Open write transaction from [`Store::begin`].
pub type StoreTx = Transaction<'static, Sqlite>;

/// Handle to the catalog database. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

impl Store {
    /// Open the database named by the configuration and apply the schema.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = if is_memory_url(&config.url) {
            // Every connection to `:memory:` is a separate database; pin one.
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(config.max_connections)
                .connect_with(options)
                .await?
        };

        let store = Self { pool };
        store.apply_schema().await?;
        info!(url = %config.url, "catalog store ready");
        Ok(store)
    }

    /// Fresh private in-memory database with the schema applied.
    pub async fn in_memory() -> Result<Self, StoreError> {
        Self::connect(&DatabaseConfig {
            url: "sqlite::memory:".to_owned(),
            max_connections: 1,
        })
        .await
    }

    async fn apply_schema(&self) -> Result<(), StoreError> {
        debug!("applying catalog schema");
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Start a write transaction. Dropping it without `commit` rolls back.
    ///
    /// The write lock is taken at `BEGIN`, so a read-then-write sequence
    /// waits on `busy_timeout` instead of failing when it upgrades.
    pub async fn begin(&self) -> Result<StoreTx, StoreError> {
        Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
