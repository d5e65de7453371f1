//! Database connection and catalog repositories
//!
//! The catalog schema is owned by the ingestion process; this service only
//! opens it (read-only by default) and queries it.

pub mod books;
pub mod sql;

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

pub use books::BookRepository;

/// Connection settings for the catalog database.
#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    /// SQLite URL (`sqlite:catalog.db`, `sqlite::memory:`) or a plain file path.
    pub url: String,
    pub max_connections: u32,
    /// Open the database read-only. The catalog never writes.
    pub read_only: bool,
    /// How long to wait for a free pooled connection.
    pub acquire_timeout: Duration,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            url: "./data/gutenberg.db".to_string(),
            max_connections: 10,
            read_only: true,
            acquire_timeout: Duration::from_secs(10),
        }
    }
}

impl DatabaseOptions {
    fn connect_options(&self) -> Result<SqliteConnectOptions> {
        let options = if self.url.starts_with("sqlite:") {
            SqliteConnectOptions::from_str(&self.url)
                .with_context(|| format!("Invalid database URL '{}'", self.url))?
        } else {
            SqliteConnectOptions::new().filename(&self.url)
        };
        Ok(options
            .read_only(self.read_only)
            .create_if_missing(false)
            .with_regexp())
    }
}

/// Database wrapper providing connection pool access
#[derive(Clone, Debug)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database wrapper from an existing pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new database connection pool
    pub async fn connect(options: &DatabaseOptions) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(options.acquire_timeout)
            .connect_with(options.connect_options()?)
            .await
            .with_context(|| format!("Failed to open catalog database '{}'", options.url))?;

        Ok(Self { pool })
    }

    /// Create a new database connection pool, retrying every `retry_interval`
    /// until it succeeds or `give_up_after` has elapsed.
    pub async fn connect_with_retry(
        options: &DatabaseOptions,
        retry_interval: Duration,
        give_up_after: Duration,
    ) -> Result<Self> {
        let started = tokio::time::Instant::now();
        loop {
            match Self::connect(options).await {
                Ok(db) => return Ok(db),
                Err(e) if started.elapsed() + retry_interval < give_up_after => {
                    tracing::warn!(
                        error = %e,
                        retry_in_secs = retry_interval.as_secs(),
                        "Database connection failed, retrying"
                    );
                    tokio::time::sleep(retry_interval).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Get the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get a book repository
    pub fn books(&self) -> BookRepository {
        BookRepository::new(self.pool.clone())
    }

    /// Returns `true` if the database answers a trivial query.
    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_path_becomes_filename() {
        let options = DatabaseOptions {
            url: "/var/lib/catalog/gutenberg.db".to_string(),
            ..Default::default()
        };
        let connect = options.connect_options().unwrap();
        assert_eq!(
            connect.get_filename(),
            std::path::Path::new("/var/lib/catalog/gutenberg.db")
        );
    }

    #[tokio::test]
    async fn test_connect_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let options = DatabaseOptions {
            url: dir.path().join("absent.db").display().to_string(),
            ..Default::default()
        };
        assert!(Database::connect(&options).await.is_err());
    }

    #[tokio::test]
    async fn test_read_only_connection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.db");

        // Build the file with a writable connection, the way ingestion would.
        let writer = SqlitePoolOptions::new()
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(&path)
                    .create_if_missing(true),
            )
            .await
            .unwrap();
        sqlx::raw_sql(include_str!("../../tests/fixtures/schema.sql"))
            .execute(&writer)
            .await
            .unwrap();
        sqlx::raw_sql(include_str!("../../tests/fixtures/seed.sql"))
            .execute(&writer)
            .await
            .unwrap();
        writer.close().await;

        let options = DatabaseOptions {
            url: path.display().to_string(),
            ..Default::default()
        };
        let db = tokio_test::assert_ok!(Database::connect(&options).await);
        assert!(db.ping().await);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books_book")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 24);

        let write = sqlx::query("DELETE FROM books_book").execute(db.pool()).await;
        tokio_test::assert_err!(write);
    }

    #[tokio::test]
    async fn test_regexp_registered_on_connect() {
        let options = DatabaseOptions {
            url: "sqlite::memory:".to_string(),
            read_only: false,
            ..Default::default()
        };
        let db = Database::connect(&options).await.unwrap();
        let matched: bool = sqlx::query_scalar("SELECT 'Brontë' REGEXP ?")
            .bind("(?i)BRONTË")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert!(matched);
    }
}
