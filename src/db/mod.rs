pub mod models;

use crate::error::{Result, TaskError};
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions};
use sqlx::Sqlite;
use std::path::Path;

pub const SCHEMA_VERSION: &str = "0.3.0";

pub async fn create_pool(db_path: &Path) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Take a pooled connection and open a write transaction on it.
///
/// `BEGIN IMMEDIATE` grabs SQLite's write lock up front, so reads made inside
/// the transaction cannot be invalidated by another writer before commit.
pub async fn begin_immediate(pool: &SqlitePool) -> Result<PoolConnection<Sqlite>> {
    let mut conn = pool.acquire().await?;
    sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
    Ok(conn)
}

/// Commit on success, roll back on any error (including a failed commit)
pub async fn finish_immediate<T>(conn: &mut SqliteConnection, outcome: Result<T>) -> Result<T> {
    let outcome = match outcome {
        Ok(value) => sqlx::query("COMMIT")
            .execute(&mut *conn)
            .await
            .map(|_| value)
            .map_err(TaskError::from),
        Err(e) => Err(e),
    };

    if outcome.is_err() {
        if let Err(rollback_err) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
            tracing::debug!(error = %rollback_err, "Rollback skipped");
        }
    }

    outcome
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA journal_mode=WAL;")
        .execute(pool)
        .await?;

    // Subtask rows carry a parent and regular rows never do
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tasks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner TEXT NOT NULL DEFAULT 'human',
            name TEXT NOT NULL,
            description TEXT,
            status TEXT NOT NULL DEFAULT 'todo',
            user_priority INTEGER NOT NULL DEFAULT 5,
            due_date DATETIME,
            estimated_effort TEXT,
            bump_count INTEGER NOT NULL DEFAULT 0,
            created_at DATETIME NOT NULL,
            completed_at DATETIME,
            task_type TEXT NOT NULL DEFAULT 'regular',
            parent_task_id INTEGER,
            FOREIGN KEY (parent_task_id) REFERENCES tasks(id) ON DELETE CASCADE,
            CHECK (status IN ('todo', 'in_progress', 'done')),
            CHECK (user_priority BETWEEN 1 AND 10),
            CHECK (bump_count >= 0),
            CHECK (estimated_effort IS NULL OR estimated_effort IN ('small', 'medium', 'large', 'xlarge')),
            CHECK (task_type IN ('regular', 'subtask')),
            CHECK ((task_type = 'subtask') = (parent_task_id IS NOT NULL)),
            CHECK (owner != '')
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_tasks_parent
        ON tasks(parent_task_id)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_tasks_status
        ON tasks(status, id)
        "#,
    )
    .execute(pool)
    .await?;

    // task_id is blocked by blocked_by_id
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dependencies (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            task_id INTEGER NOT NULL,
            blocked_by_id INTEGER NOT NULL,
            created_at DATETIME NOT NULL,
            FOREIGN KEY (task_id) REFERENCES tasks(id) ON DELETE CASCADE,
            FOREIGN KEY (blocked_by_id) REFERENCES tasks(id) ON DELETE CASCADE,
            UNIQUE(task_id, blocked_by_id),
            CHECK(task_id != blocked_by_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_dependencies_task
        ON dependencies(task_id)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_dependencies_blocked_by
        ON dependencies(blocked_by_id)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS workspace_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO workspace_state (key, value)
        VALUES ('schema_version', ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value
        "#,
    )
    .bind(SCHEMA_VERSION)
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn migrated_pool(temp_dir: &TempDir) -> SqlitePool {
        let db_path = temp_dir.path().join("test.db");
        let pool = create_pool(&db_path).await.unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_create_pool_success() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let pool = create_pool(&db_path).await.unwrap();

        let result: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&pool)
            .await
            .unwrap();

        assert_eq!(result, 1);
        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn test_run_migrations_creates_tables() {
        let temp_dir = TempDir::new().unwrap();
        let pool = migrated_pool(&temp_dir).await;

        let tables: Vec<String> =
            sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
                .fetch_all(&pool)
                .await
                .unwrap();

        assert!(tables.contains(&"tasks".to_string()));
        assert!(tables.contains(&"dependencies".to_string()));
        assert!(tables.contains(&"workspace_state".to_string()));
    }

    #[tokio::test]
    async fn test_run_migrations_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let pool = migrated_pool(&temp_dir).await;

        run_migrations(&pool).await.unwrap();

        let version: String =
            sqlx::query_scalar("SELECT value FROM workspace_state WHERE key = 'schema_version'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_dependencies_indexes_created() {
        let temp_dir = TempDir::new().unwrap();
        let pool = migrated_pool(&temp_dir).await;

        let indexes: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type='index' AND name LIKE 'idx_dependencies_%'",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        assert!(indexes.contains(&"idx_dependencies_task".to_string()));
        assert!(indexes.contains(&"idx_dependencies_blocked_by".to_string()));
    }

    #[tokio::test]
    async fn test_task_status_constraint() {
        let temp_dir = TempDir::new().unwrap();
        let pool = migrated_pool(&temp_dir).await;

        let result =
            sqlx::query("INSERT INTO tasks (name, status, created_at) VALUES (?, ?, datetime('now'))")
                .bind("Test")
                .bind("doing")
                .execute(&pool)
                .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_priority_range_constraint() {
        let temp_dir = TempDir::new().unwrap();
        let pool = migrated_pool(&temp_dir).await;

        let result = sqlx::query(
            "INSERT INTO tasks (name, user_priority, created_at) VALUES (?, ?, datetime('now'))",
        )
        .bind("Test")
        .bind(11)
        .execute(&pool)
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_subtask_requires_parent_constraint() {
        let temp_dir = TempDir::new().unwrap();
        let pool = migrated_pool(&temp_dir).await;

        let orphan = sqlx::query(
            "INSERT INTO tasks (name, task_type, created_at) VALUES ('Orphan', 'subtask', datetime('now'))",
        )
        .execute(&pool)
        .await;
        assert!(orphan.is_err());

        let parent_id = sqlx::query(
            "INSERT INTO tasks (name, created_at) VALUES ('Parent', datetime('now'))",
        )
        .execute(&pool)
        .await
        .unwrap()
        .last_insert_rowid();

        let regular_with_parent = sqlx::query(
            "INSERT INTO tasks (name, task_type, parent_task_id, created_at) VALUES ('Bad', 'regular', ?, datetime('now'))",
        )
        .bind(parent_id)
        .execute(&pool)
        .await;
        assert!(regular_with_parent.is_err());
    }

    #[tokio::test]
    async fn test_dependency_self_loop_constraint() {
        let temp_dir = TempDir::new().unwrap();
        let pool = migrated_pool(&temp_dir).await;

        let id = sqlx::query("INSERT INTO tasks (name, created_at) VALUES ('A', datetime('now'))")
            .execute(&pool)
            .await
            .unwrap()
            .last_insert_rowid();

        let result = sqlx::query(
            "INSERT INTO dependencies (task_id, blocked_by_id, created_at) VALUES (?, ?, datetime('now'))",
        )
        .bind(id)
        .bind(id)
        .execute(&pool)
        .await;

        assert!(result.is_err());
    }
}
