//! Database migrations
//!
//! Migrations are embedded in the binary as SQL strings, one variant per
//! supported engine. Applied versions are tracked in `_migrations`.
//!
//! # Usage
//!
//! ```ignore
//! use playhub::db::{create_pool, migrations};
//!
//! let pool = create_pool(&config).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

use anyhow::{Context, Result};
use sqlx::{MySqlPool, Row, SqlitePool};

use super::pool::{require_mysql, require_sqlite};
use super::DynDatabasePool;
use crate::config::DatabaseDriver;

/// A database migration with SQL for both SQLite and MySQL
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number (must be unique and sequential)
    pub version: i32,
    pub name: &'static str,
    pub up_sqlite: &'static str,
    pub up_mysql: &'static str,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_platforms",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS platforms (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(100) NOT NULL UNIQUE,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS platforms (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(100) NOT NULL UNIQUE,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
    },
    Migration {
        version: 2,
        name: "create_languages",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS languages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                code VARCHAR(8) NOT NULL UNIQUE,
                name VARCHAR(100) NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS languages (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                code VARCHAR(8) NOT NULL UNIQUE,
                name VARCHAR(100) NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
    },
    // Games use application-assigned snowflake ids
    Migration {
        version: 3,
        name: "create_games",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS games (
                id INTEGER PRIMARY KEY,
                name VARCHAR(150) NOT NULL,
                description TEXT,
                platform_id INTEGER REFERENCES platforms(id) ON DELETE SET NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                deleted_at TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_games_platform_id ON games(platform_id);
            CREATE INDEX IF NOT EXISTS idx_games_deleted_at ON games(deleted_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS games (
                id BIGINT PRIMARY KEY,
                name VARCHAR(150) NOT NULL,
                description TEXT,
                platform_id BIGINT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                deleted_at TIMESTAMP NULL,
                FOREIGN KEY (platform_id) REFERENCES platforms(id) ON DELETE SET NULL
            );
            CREATE INDEX idx_games_platform_id ON games(platform_id);
            CREATE INDEX idx_games_deleted_at ON games(deleted_at);
        "#,
    },
    Migration {
        version: 4,
        name: "create_ranks",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS ranks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                game_id INTEGER NOT NULL REFERENCES games(id) ON DELETE CASCADE,
                name VARCHAR(100) NOT NULL,
                position INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE (game_id, name)
            );
            CREATE INDEX IF NOT EXISTS idx_ranks_game_id ON ranks(game_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS ranks (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                game_id BIGINT NOT NULL,
                name VARCHAR(100) NOT NULL,
                position INT NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE KEY uq_ranks_game_name (game_id, name),
                FOREIGN KEY (game_id) REFERENCES games(id) ON DELETE CASCADE
            );
        "#,
    },
    // `row_version` backs optimistic locking on updates
    Migration {
        version: 5,
        name: "create_lobbies",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS lobbies (
                id INTEGER PRIMARY KEY,
                game_id INTEGER NOT NULL REFERENCES games(id),
                platform_id INTEGER REFERENCES platforms(id) ON DELETE SET NULL,
                language_id INTEGER REFERENCES languages(id) ON DELETE SET NULL,
                title VARCHAR(150) NOT NULL,
                description TEXT,
                max_players INTEGER NOT NULL,
                row_version INTEGER NOT NULL DEFAULT 1,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                deleted_at TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_lobbies_game_id ON lobbies(game_id);
            CREATE INDEX IF NOT EXISTS idx_lobbies_platform_id ON lobbies(platform_id);
            CREATE INDEX IF NOT EXISTS idx_lobbies_language_id ON lobbies(language_id);
            CREATE INDEX IF NOT EXISTS idx_lobbies_deleted_at ON lobbies(deleted_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS lobbies (
                id BIGINT PRIMARY KEY,
                game_id BIGINT NOT NULL,
                platform_id BIGINT NULL,
                language_id BIGINT NULL,
                title VARCHAR(150) NOT NULL,
                description TEXT,
                max_players INT NOT NULL,
                row_version BIGINT NOT NULL DEFAULT 1,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                deleted_at TIMESTAMP NULL,
                FOREIGN KEY (game_id) REFERENCES games(id),
                FOREIGN KEY (platform_id) REFERENCES platforms(id) ON DELETE SET NULL,
                FOREIGN KEY (language_id) REFERENCES languages(id) ON DELETE SET NULL
            );
            CREATE INDEX idx_lobbies_deleted_at ON lobbies(deleted_at);
        "#,
    },
];

/// Apply every migration not yet recorded in `_migrations`.
///
/// Returns the number of migrations applied.
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;
    let applied = applied_versions(pool).await?;

    let mut count = 0;
    for migration in MIGRATIONS.iter().filter(|m| !applied.contains(&m.version)) {
        tracing::info!(
            "Applying migration {}: {}",
            migration.version,
            migration.name
        );
        apply_migration(pool, migration)
            .await
            .with_context(|| format!("Failed to apply migration: {}", migration.name))?;
        count += 1;
    }

    if count > 0 {
        tracing::info!("Applied {} migration(s)", count);
    } else {
        tracing::debug!("No pending migrations");
    }

    Ok(count)
}

async fn create_migrations_table(pool: &DynDatabasePool) -> Result<()> {
    let version_type = match pool.driver() {
        DatabaseDriver::Sqlite => "INTEGER",
        DatabaseDriver::Mysql => "INT",
    };
    let sql = format!(
        "CREATE TABLE IF NOT EXISTS _migrations (\
            version {} PRIMARY KEY, \
            name VARCHAR(255) NOT NULL UNIQUE, \
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP)",
        version_type
    );

    pool.execute(&sql).await?;
    Ok(())
}

/// Versions already recorded, in ascending order
pub async fn applied_versions(pool: &DynDatabasePool) -> Result<Vec<i32>> {
    let versions: Vec<i64> = match pool.driver() {
        DatabaseDriver::Sqlite => {
            let rows = sqlx::query("SELECT version FROM _migrations ORDER BY version")
                .fetch_all(require_sqlite(pool.as_ref())?)
                .await?;
            rows.iter()
                .map(|row| row.try_get::<i64, _>("version"))
                .collect::<Result<_, _>>()?
        }
        DatabaseDriver::Mysql => {
            let rows = sqlx::query("SELECT version FROM _migrations ORDER BY version")
                .fetch_all(require_mysql(pool.as_ref())?)
                .await?;
            rows.iter()
                .map(|row| row.try_get::<i32, _>("version").map(i64::from))
                .collect::<Result<_, _>>()?
        }
    };

    Ok(versions.into_iter().map(|v| v as i32).collect())
}

async fn apply_migration(pool: &DynDatabasePool, migration: &Migration) -> Result<()> {
    match pool.driver() {
        DatabaseDriver::Sqlite => {
            apply_migration_sqlite(require_sqlite(pool.as_ref())?, migration).await
        }
        DatabaseDriver::Mysql => {
            apply_migration_mysql(require_mysql(pool.as_ref())?, migration).await
        }
    }
}

// SQLite runs the statements and the bookkeeping insert in one transaction.
async fn apply_migration_sqlite(pool: &SqlitePool, migration: &Migration) -> Result<()> {
    let mut tx = pool.begin().await?;
    for statement in split_sql_statements(migration.up_sqlite) {
        sqlx::query(statement)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }

    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

// MySQL DDL commits implicitly, so no transaction here.
async fn apply_migration_mysql(pool: &MySqlPool, migration: &Migration) -> Result<()> {
    for statement in split_sql_statements(migration.up_mysql) {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }

    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(pool)
        .await?;

    Ok(())
}

fn truncate_sql(sql: &str) -> String {
    match sql.char_indices().nth(100) {
        Some((idx, _)) => format!("{}...", &sql[..idx]),
        None => sql.to_string(),
    }
}

/// Split a migration body into statements, dropping comment-only fragments
fn split_sql_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|stmt| !stmt.is_empty() && !is_comment_only(stmt))
        .collect()
}

fn is_comment_only(s: &str) -> bool {
    s.lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with("--"))
}

/// Number of migrations not yet applied
pub async fn pending_count(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;
    let applied = applied_versions(pool).await?;
    Ok(MIGRATIONS
        .iter()
        .filter(|m| !applied.contains(&m.version))
        .count())
}

pub fn get_migration(version: i32) -> Option<&'static Migration> {
    MIGRATIONS.iter().find(|m| m.version == version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    async fn migrated_pool() -> DynDatabasePool {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        run_migrations(&pool).await.expect("Failed to run migrations");
        pool
    }

    async fn table_exists(pool: &SqlitePool, table: &str) -> bool {
        sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(table)
            .fetch_optional(pool)
            .await
            .expect("Failed to query sqlite_master")
            .is_some()
    }

    #[tokio::test]
    async fn test_run_migrations_is_idempotent() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        let count = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(count, MIGRATIONS.len());

        let count = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(count, 0);
        assert_eq!(
            applied_versions(&pool).await.unwrap(),
            vec![1, 2, 3, 4, 5]
        );
    }

    #[tokio::test]
    async fn test_pending_count() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        assert_eq!(pending_count(&pool).await.unwrap(), MIGRATIONS.len());

        run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(pending_count(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_resource_tables_created() {
        let pool = migrated_pool().await;
        let sqlite = pool.as_sqlite().unwrap();

        for table in ["platforms", "languages", "games", "ranks", "lobbies"] {
            assert!(table_exists(sqlite, table).await, "missing table {}", table);
        }
    }

    #[tokio::test]
    async fn test_lobby_row_version_defaults_to_one() {
        let pool = migrated_pool().await;
        let sqlite = pool.as_sqlite().unwrap();

        sqlx::query("INSERT INTO games (id, name) VALUES (10, 'Rocket League')")
            .execute(sqlite)
            .await
            .unwrap();
        sqlx::query("INSERT INTO lobbies (id, game_id, title, max_players) VALUES (20, 10, 'Ranked 2v2', 4)")
            .execute(sqlite)
            .await
            .unwrap();

        let row = sqlx::query("SELECT row_version, deleted_at FROM lobbies WHERE id = 20")
            .fetch_one(sqlite)
            .await
            .unwrap();
        assert_eq!(row.get::<i64, _>("row_version"), 1);
        assert!(row.get::<Option<String>, _>("deleted_at").is_none());
    }

    #[tokio::test]
    async fn test_foreign_key_constraints() {
        let pool = migrated_pool().await;
        let sqlite = pool.as_sqlite().unwrap();

        let result = sqlx::query("INSERT INTO ranks (game_id, name) VALUES (999, 'Gold')")
            .execute(sqlite)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_unique_constraints() {
        let pool = migrated_pool().await;
        let sqlite = pool.as_sqlite().unwrap();

        sqlx::query("INSERT INTO languages (code, name) VALUES ('en', 'English')")
            .execute(sqlite)
            .await
            .unwrap();
        let duplicate = sqlx::query("INSERT INTO languages (code, name) VALUES ('en', 'Anglais')")
            .execute(sqlite)
            .await;
        assert!(duplicate.is_err());
    }

    #[test]
    fn test_migration_versions_are_sequential() {
        for (i, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(migration.version, i as i32 + 1);
        }
        assert_eq!(get_migration(1).unwrap().name, "create_platforms");
        assert!(get_migration(999).is_none());
    }

    #[test]
    fn test_split_sql_statements() {
        let statements = split_sql_statements("CREATE TABLE a (id INT); CREATE TABLE b (id INT);");
        assert_eq!(statements, vec!["CREATE TABLE a (id INT)", "CREATE TABLE b (id INT)"]);

        let statements = split_sql_statements("-- Comment\nCREATE TABLE a (id INT);\n-- trailing");
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn test_is_comment_only() {
        assert!(is_comment_only("-- This is a comment"));
        assert!(is_comment_only("-- Line 1\n-- Line 2"));
        assert!(!is_comment_only("CREATE TABLE test"));
        assert!(!is_comment_only("-- Comment\nCREATE TABLE test"));
    }
}
