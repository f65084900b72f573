//! Storage seam consumed by the ordering core.
//!
//! The core never performs I/O itself; the gate and dependency checks pull
//! already-materialized rows through this trait. The SQLite
//! [`TaskManager`](crate::tasks::TaskManager) is the shipped implementation.

use std::future::Future;

use crate::db::models::{Task, TaskEdges};
use crate::error::Result;

pub trait TaskStore: Send + Sync {
    /// Fails with `TaskNotFound` when the id is unknown
    fn get_task_by_id(&self, id: i64) -> impl Future<Output = Result<Task>> + Send;

    fn list_children(&self, parent_id: i64) -> impl Future<Output = Result<Vec<Task>>> + Send;

    fn list_edges_for_task(&self, task_id: i64) -> impl Future<Output = Result<TaskEdges>> + Send;

    fn task_exists_and_is_regular(&self, id: i64) -> impl Future<Output = Result<bool>> + Send;

    /// Tasks that `task_id` is blocked by
    fn list_blockers(&self, task_id: i64) -> impl Future<Output = Result<Vec<Task>>> + Send;

    /// Tasks blocked by `task_id`
    fn list_blocking(&self, task_id: i64) -> impl Future<Output = Result<Vec<Task>>> + Send;
}
