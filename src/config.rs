//! Project configuration stored as key-value rows in `workspace_state`.
//!
//! Keys under `priority.` override the scoring constants; everything is read
//! back through [`load_priority_config`] each time a service is built.

use crate::error::{Result, TaskError};
use crate::priority::PriorityConfig;
use sqlx::SqlitePool;

/// Keys that cannot be modified via config commands
pub const PROTECTED_KEYS: &[&str] = &["schema_version"];

pub fn ensure_writable(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(TaskError::InvalidInput("Config key cannot be empty".to_string()));
    }
    if PROTECTED_KEYS.contains(&key) {
        return Err(TaskError::ActionNotAllowed(format!(
            "Cannot modify protected key: '{}'",
            key
        )));
    }
    Ok(())
}

pub async fn config_set(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO workspace_state (key, value) VALUES (?, ?) ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

/// Set a key after checking it is writable and, for `priority.` keys, that the
/// resulting scoring config is still valid.
pub async fn config_set_checked(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    ensure_writable(key)?;

    if key.starts_with(PriorityConfig::KEY_PREFIX) {
        let mut entries = config_list(pool, Some(PriorityConfig::KEY_PREFIX)).await?;
        entries.retain(|(k, _)| k != key);
        entries.push((key.to_string(), value.to_string()));
        PriorityConfig::from_entries(entries.iter().map(|(k, v)| (k.as_str(), v.as_str())))?;
    }

    config_set(pool, key, value).await?;
    tracing::info!(key, value, "Config updated");
    Ok(())
}

pub async fn config_get(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value: Option<String> =
        sqlx::query_scalar("SELECT value FROM workspace_state WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;
    Ok(value)
}

pub async fn config_list(pool: &SqlitePool, prefix: Option<&str>) -> Result<Vec<(String, String)>> {
    let rows: Vec<(String, String)> = if let Some(p) = prefix {
        let pattern = format!("{}%", p);
        sqlx::query_as(
            "SELECT key, value FROM workspace_state WHERE key != 'schema_version' AND key LIKE ? ORDER BY key",
        )
        .bind(pattern)
        .fetch_all(pool)
        .await?
    } else {
        sqlx::query_as(
            "SELECT key, value FROM workspace_state WHERE key != 'schema_version' ORDER BY key",
        )
        .fetch_all(pool)
        .await?
    };
    Ok(rows)
}

pub async fn config_delete(pool: &SqlitePool, key: &str) -> Result<bool> {
    ensure_writable(key)?;
    let result = sqlx::query("DELETE FROM workspace_state WHERE key = ?")
        .bind(key)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Defaults merged with any stored `priority.*` overrides
pub async fn load_priority_config(pool: &SqlitePool) -> Result<PriorityConfig> {
    let entries = config_list(pool, Some(PriorityConfig::KEY_PREFIX)).await?;
    if entries.is_empty() {
        return Ok(PriorityConfig::default());
    }

    tracing::debug!(overrides = entries.len(), "Loading priority overrides");
    PriorityConfig::from_entries(entries.iter().map(|(k, v)| (k.as_str(), v.as_str())))
}
