//! Database connection pool abstraction
//!
//! Resource repositories talk to a `DatabasePool` trait object and branch on
//! `driver()` to reach the concrete sqlx pool. SQLite is the default engine
//! (and the one tests run against); MySQL is selected through configuration.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{
    mysql::{MySqlPool, MySqlPoolOptions},
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
};
use std::str::FromStr;
use std::sync::Arc;

use crate::config::{DatabaseConfig, DatabaseDriver};

/// Database pool trait that abstracts over the supported backends.
#[async_trait]
pub trait DatabasePool: Send + Sync {
    /// Execute a raw SQL statement that doesn't return rows
    async fn execute(&self, query: &str) -> Result<u64>;

    /// Check if the database connection is healthy
    async fn ping(&self) -> Result<()>;

    /// Close the connection pool
    async fn close(&self);

    /// Get the database driver type
    fn driver(&self) -> DatabaseDriver;

    /// Get the underlying SQLite pool if this is a SQLite connection
    fn as_sqlite(&self) -> Option<&SqlitePool>;

    /// Get the underlying MySQL pool if this is a MySQL connection
    fn as_mysql(&self) -> Option<&MySqlPool>;
}

/// SQLite connection pool implementation
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    /// Open (creating if needed) a SQLite database.
    ///
    /// Accepts `:memory:`, `sqlite:` URLs and bare file paths.
    pub async fn new(url: &str) -> Result<Self> {
        let connection_url = sqlite_connection_url(url)?;
        let in_memory = connection_url.starts_with("sqlite::memory:");

        // Pragmas set here apply to every pooled connection
        let options = SqliteConnectOptions::from_str(&connection_url)
            .with_context(|| format!("Invalid SQLite URL: {}", url))?
            .foreign_keys(true)
            .create_if_missing(true);

        // Each in-memory connection is its own database, so keep exactly one alive
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(16)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to SQLite database: {}", url))?;

        Ok(Self { pool })
    }
}

/// Normalise a configured SQLite location into a connection URL, creating the
/// parent directory of file databases.
fn sqlite_connection_url(url: &str) -> Result<String> {
    if url == ":memory:" || url.starts_with("sqlite::memory:") {
        return Ok("sqlite::memory:".to_string());
    }

    let path = url.trim_start_matches("sqlite:");
    let path = path.split('?').next().unwrap_or(path);
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory: {:?}", parent))?;
        }
    }

    Ok(if url.contains('?') {
        url.to_string()
    } else {
        format!("sqlite:{}?mode=rwc", path)
    })
}

#[async_trait]
impl DatabasePool for SqliteDatabase {
    async fn execute(&self, query: &str) -> Result<u64> {
        let result = sqlx::query(query)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to execute query: {}", query))?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("Database ping failed")?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    fn driver(&self) -> DatabaseDriver {
        DatabaseDriver::Sqlite
    }

    fn as_sqlite(&self) -> Option<&SqlitePool> {
        Some(&self.pool)
    }

    fn as_mysql(&self) -> Option<&MySqlPool> {
        None
    }
}

/// MySQL connection pool implementation
pub struct MysqlDatabase {
    pool: MySqlPool,
}

impl MysqlDatabase {
    /// Create a new MySQL connection pool
    pub async fn new(url: &str) -> Result<Self> {
        let connection_url = if url.starts_with("mysql://") {
            url.to_string()
        } else {
            format!("mysql://{}", url)
        };

        let pool = MySqlPoolOptions::new()
            .max_connections(32)
            .connect(&connection_url)
            .await
            .with_context(|| format!("Failed to connect to MySQL database: {}", url))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl DatabasePool for MysqlDatabase {
    async fn execute(&self, query: &str) -> Result<u64> {
        let result = sqlx::query(query)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to execute query: {}", query))?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("Database ping failed")?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    fn driver(&self) -> DatabaseDriver {
        DatabaseDriver::Mysql
    }

    fn as_sqlite(&self) -> Option<&SqlitePool> {
        None
    }

    fn as_mysql(&self) -> Option<&MySqlPool> {
        Some(&self.pool)
    }
}

/// SQLite pool behind a handle whose driver reports `Sqlite`
pub(crate) fn require_sqlite(pool: &dyn DatabasePool) -> Result<&SqlitePool> {
    pool.as_sqlite()
        .context("Driver reports SQLite but no SQLite pool is attached")
}

/// MySQL pool behind a handle whose driver reports `Mysql`
pub(crate) fn require_mysql(pool: &dyn DatabasePool) -> Result<&MySqlPool> {
    pool.as_mysql()
        .context("Driver reports MySQL but no MySQL pool is attached")
}

/// Shared handle to whichever backend the configuration selected
pub type DynDatabasePool = Arc<dyn DatabasePool>;

/// Create a database connection pool based on configuration.
pub async fn create_pool(config: &DatabaseConfig) -> Result<DynDatabasePool> {
    match config.driver {
        DatabaseDriver::Sqlite => Ok(Arc::new(SqliteDatabase::new(&config.url).await?)),
        DatabaseDriver::Mysql => Ok(Arc::new(MysqlDatabase::new(&config.url).await?)),
    }
}

/// Create a SQLite in-memory database pool for testing
pub async fn create_test_pool() -> Result<DynDatabasePool> {
    let config = DatabaseConfig {
        driver: DatabaseDriver::Sqlite,
        url: ":memory:".to_string(),
    };
    create_pool(&config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_test_pool() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        assert_eq!(pool.driver(), DatabaseDriver::Sqlite);
        assert!(pool.as_sqlite().is_some());
        assert!(pool.as_mysql().is_none());
        pool.ping().await.expect("Ping should succeed");
    }

    #[tokio::test]
    async fn test_sqlite_pool_execute() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        pool.execute("CREATE TABLE scratch (id INTEGER PRIMARY KEY, name TEXT)")
            .await
            .expect("Failed to create table");

        let affected = pool
            .execute("INSERT INTO scratch (name) VALUES ('lobby')")
            .await
            .expect("Failed to insert");
        assert_eq!(affected, 1);
    }

    #[tokio::test]
    async fn test_sqlite_nested_directory_creation() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("nested").join("dir").join("playhub.db");

        let config = DatabaseConfig {
            driver: DatabaseDriver::Sqlite,
            url: db_path.to_string_lossy().to_string(),
        };

        let pool = create_pool(&config).await.expect("Failed to create pool");
        pool.ping().await.expect("Ping should succeed");
        assert!(db_path.exists());
    }

    #[test]
    fn test_sqlite_connection_url_forms() {
        assert_eq!(sqlite_connection_url(":memory:").unwrap(), "sqlite::memory:");
        assert_eq!(
            sqlite_connection_url("sqlite:playhub_url_test.db?mode=ro").unwrap(),
            "sqlite:playhub_url_test.db?mode=ro"
        );
        assert_eq!(
            sqlite_connection_url("playhub_url_test.db").unwrap(),
            "sqlite:playhub_url_test.db?mode=rwc"
        );
    }

    #[tokio::test]
    #[ignore = "Requires MySQL server"]
    async fn test_mysql_pool_ping() {
        let url = std::env::var("MYSQL_TEST_URL")
            .unwrap_or_else(|_| "mysql://root@localhost/test".to_string());

        let config = DatabaseConfig {
            driver: DatabaseDriver::Mysql,
            url,
        };

        let pool = create_pool(&config).await.expect("Failed to create pool");
        assert_eq!(pool.driver(), DatabaseDriver::Mysql);
        pool.ping().await.expect("Ping should succeed");
    }
}
