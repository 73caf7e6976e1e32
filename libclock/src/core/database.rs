use crate::core::error::Result;
use sqlx::{Pool, Row, Sqlite, SqlitePool, sqlite::SqliteConnectOptions};
use std::path::Path;
use tracing::{debug, trace};

/// Tables that hold attendance data, ordered so that rows can be deleted
/// without violating foreign key constraints
const DATA_TABLES: [&str; 4] = ["ct_pings", "ct_shifts", "ct_stores", "ct_employees"];

/// An object that represents a connection to the attendance database
#[derive(Clone, Debug)]
pub struct Database(Pool<Sqlite>);

impl From<Pool<Sqlite>> for Database {
    /// **WARNING**: This is primarily intended for tests. You should probably
    /// use [Database::open()] instead of creating the pool yourself, since
    /// [Database::open()] will perform database schema migration automatically.
    fn from(value: Pool<Sqlite>) -> Self {
        Self(value)
    }
}

impl Database {
    /// Open a connection to the specified database, creating the file if it
    /// does not exist yet. This will also perform any necessary sql migrations
    /// to ensure that the database is up to date with the latest schema.
    pub async fn open<P: AsRef<Path>>(db: P) -> Result<Self> {
        debug!(path = ?db.as_ref(), "Opening database");
        let options = SqliteConnectOptions::new()
            .filename(db)
            .create_if_missing(true)
            .foreign_keys(true);
        let dbpool = SqlitePool::connect_with(options).await?;
        trace!("Running database migrations");
        sqlx::migrate!("../db/migrations").run(&dbpool).await?;
        Ok(Database(dbpool))
    }

    /// gets a reference to the underlying sqlx connection pool
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.0
    }

    /// Remove every employee, store, shift and location ping from the
    /// database. The schema itself is left in place.
    pub async fn reset(&self) -> Result<()> {
        let mut tx = self.0.begin().await?;
        for table in DATA_TABLES {
            debug!("Clearing table {table}");
            sqlx::query(&format!("DELETE FROM {table}"))
                .execute(tx.as_mut())
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// List the names of the tables in the database, excluding internal
    /// sqlite and migration bookkeeping tables
    pub async fn tables(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"SELECT name FROM sqlite_schema WHERE type='table'
            AND name NOT LIKE 'sqlite_%' AND name NOT LIKE '_sqlx_%'
            ORDER BY name"#,
        )
        .fetch_all(&self.0)
        .await?;
        rows.into_iter()
            .map(|row| row.try_get::<String, _>("name").map_err(Into::into))
            .collect()
    }
}
