use crate::db::models::{Dependency, Task};
use crate::db::{begin_immediate, finish_immediate};
use crate::error::{Result, TaskError};
use crate::graph::{newly_unblocked, validate_new_edge, DependencyGraph, DependencyInfo, Dependent, Endpoint};
use crate::sql_constants::{
    CHECK_TASK_EXISTS, DELETE_DEPENDENCY, INSERT_DEPENDENCY, SELECT_BLOCKERS, SELECT_BLOCKING,
    SELECT_DEPENDENCY, SELECT_REACHABLE_EDGES, SELECT_TASK_BY_ID,
};
use chrono::Utc;
use sqlx::{Executor, Sqlite, SqliteConnection, SqlitePool};
use std::time::Duration;

/// Attempts made when SQLite reports the write lock as busy
const MAX_ADD_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(20);

/// Record that `task_id` is blocked by `blocked_by_id`.
///
/// The check and the insert run inside one `BEGIN IMMEDIATE` transaction, so
/// two writers racing to close the same cycle are serialized by SQLite's write
/// lock and the second one sees the first one's edge.
///
/// # Errors
///
/// - `TaskNotFound` if either task is missing
/// - `SelfDependency`, `DuplicateDependency`, `InvalidDependencyType`,
///   `DependencyCycle` from edge validation, in that order
pub async fn add_dependency(pool: &SqlitePool, task_id: i64, blocked_by_id: i64) -> Result<Dependency> {
    let mut attempt = 1;
    loop {
        match try_add_dependency(pool, task_id, blocked_by_id).await {
            Err(e) if e.is_transient() && attempt < MAX_ADD_ATTEMPTS => {
                tracing::warn!(
                    task_id,
                    blocked_by_id,
                    attempt,
                    error = %e,
                    "Dependency insert hit a locked database, retrying"
                );
                tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                attempt += 1;
            },
            Ok(dep) => {
                tracing::info!(task_id, blocked_by_id, dependency_id = dep.id, "Dependency added");
                return Ok(dep);
            },
            Err(e) => {
                tracing::debug!(task_id, blocked_by_id, error = %e, "Dependency rejected");
                return Err(e);
            },
        }
    }
}

async fn try_add_dependency(pool: &SqlitePool, task_id: i64, blocked_by_id: i64) -> Result<Dependency> {
    let mut conn = begin_immediate(pool).await?;
    let outcome = insert_checked(&mut conn, task_id, blocked_by_id).await;
    finish_immediate(&mut conn, outcome).await
}

async fn insert_checked(conn: &mut SqliteConnection, task_id: i64, blocked_by_id: i64) -> Result<Dependency> {
    let task = fetch_task(&mut *conn, task_id).await?;
    let blocker = fetch_task(&mut *conn, blocked_by_id).await?;

    let reachable: Vec<(i64, i64)> = sqlx::query_as(SELECT_REACHABLE_EDGES)
        .bind(blocked_by_id)
        .fetch_all(&mut *conn)
        .await?;
    let mut graph = DependencyGraph::from_edges(reachable);

    let existing: Option<Dependency> = sqlx::query_as(SELECT_DEPENDENCY)
        .bind(task_id)
        .bind(blocked_by_id)
        .fetch_optional(&mut *conn)
        .await?;
    if existing.is_some() {
        graph.add_edge(task_id, blocked_by_id);
    }

    validate_new_edge(&graph, Endpoint::from(&task), Endpoint::from(&blocker))?;

    let created_at = Utc::now();
    let id = sqlx::query(INSERT_DEPENDENCY)
        .bind(task_id)
        .bind(blocked_by_id)
        .bind(created_at)
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();

    Ok(Dependency {
        id,
        task_id,
        blocked_by_id,
        created_at,
    })
}

/// Remove the edge `task_id` blocked-by `blocked_by_id`
pub async fn remove_dependency(pool: &SqlitePool, task_id: i64, blocked_by_id: i64) -> Result<()> {
    let result = sqlx::query(DELETE_DEPENDENCY)
        .bind(task_id)
        .bind(blocked_by_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(TaskError::DependencyNotFound {
            task_id,
            blocked_by_id,
        });
    }

    tracing::info!(task_id, blocked_by_id, "Dependency removed");
    Ok(())
}

pub async fn get_dependency_info(pool: &SqlitePool, task_id: i64) -> Result<DependencyInfo> {
    let exists: bool = sqlx::query_scalar(CHECK_TASK_EXISTS)
        .bind(task_id)
        .fetch_one(pool)
        .await?;
    if !exists {
        return Err(TaskError::TaskNotFound(task_id));
    }

    let blockers = list_blockers(pool, task_id).await?;
    let blocking = list_blocking(pool, task_id).await?;

    Ok(DependencyInfo::from_tasks(task_id, &blockers, &blocking))
}

/// Tasks that became unblocked now that `task_id` is done.
///
/// Advisory only: nothing is started or completed automatically.
pub async fn on_blocker_completed(pool: &SqlitePool, task_id: i64) -> Result<Vec<i64>> {
    let mut dependents = Vec::new();
    for task in list_blocking(pool, task_id).await? {
        let blockers = list_blockers(pool, task.id).await?;
        dependents.push(Dependent { task, blockers });
    }

    let unblocked = newly_unblocked(task_id, &dependents);
    if !unblocked.is_empty() {
        tracing::info!(task_id, unblocked = ?unblocked, "Completion unblocked dependents");
    }
    Ok(unblocked)
}

pub(crate) async fn fetch_task<'e, E>(executor: E, task_id: i64) -> Result<Task>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Task>(SELECT_TASK_BY_ID)
        .bind(task_id)
        .fetch_optional(executor)
        .await?
        .ok_or(TaskError::TaskNotFound(task_id))
}

/// Tasks that `task_id` is blocked by, ordered by id
pub(crate) async fn list_blockers<'e, E>(executor: E, task_id: i64) -> Result<Vec<Task>>
where
    E: Executor<'e, Database = Sqlite>,
{
    Ok(sqlx::query_as::<_, Task>(SELECT_BLOCKERS)
        .bind(task_id)
        .fetch_all(executor)
        .await?)
}

/// Tasks blocked by `task_id`, ordered by id
pub(crate) async fn list_blocking<'e, E>(executor: E, task_id: i64) -> Result<Vec<Task>>
where
    E: Executor<'e, Database = Sqlite>,
{
    Ok(sqlx::query_as::<_, Task>(SELECT_BLOCKING)
        .bind(task_id)
        .fetch_all(executor)
        .await?)
}
