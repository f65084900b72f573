use crate::backend::TaskStore;
use crate::config::load_priority_config;
use crate::db::models::{
    CompletionResponse, Dependency, Effort, NextStepSuggestion, ScoredTask, Task, TaskEdges,
    TaskStatus, TaskType,
};
use crate::db::{begin_immediate, finish_immediate};
use crate::dependencies::{fetch_task, on_blocker_completed};
use crate::error::{Result, TaskError};
use crate::gate::{check_completion, evaluate_completion, next_step_suggestion, CompletionCheck};
use crate::lifecycle::{ensure_bumpable, ensure_restorable, ensure_transition};
use crate::priority::{PriorityCalculator, PriorityConfig};
use crate::sql_constants::{
    CHECK_TASK_IS_REGULAR, SELECT_CHILDREN, SELECT_EDGES_AS_BLOCKED, SELECT_EDGES_AS_BLOCKER,
    SELECT_TASK_BASE,
};
use crate::subtasks::{compute_subtask_info, validate_parent, SubtaskInfo};
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

pub const DEFAULT_USER_PRIORITY: i32 = 5;
pub const DEFAULT_OWNER: &str = "human";

/// Input for [`TaskManager::add_task`]
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub name: String,
    pub description: Option<String>,
    /// 1-10, defaults to 5
    pub user_priority: Option<i32>,
    pub due_date: Option<DateTime<Utc>>,
    pub estimated_effort: Option<Effort>,
    /// Makes the new task a subtask of this regular task
    pub parent_task_id: Option<i64>,
    pub owner: Option<String>,
}

impl NewTask {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Partial update for [`TaskManager::update_task`]. `None` leaves a field as is;
/// the nested options clear a field when set to `Some(None)`.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub user_priority: Option<i32>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub estimated_effort: Option<Option<Effort>>,
    /// Todo or InProgress only; completion goes through `done_task`
    pub status: Option<TaskStatus>,
}

impl TaskUpdate {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.user_priority.is_none()
            && self.due_date.is_none()
            && self.estimated_effort.is_none()
            && self.status.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub parent_task_id: Option<i64>,
    /// Keep only tasks flagged at risk
    pub at_risk_only: bool,
}

pub struct TaskManager<'a> {
    pool: &'a SqlitePool,
    calculator: PriorityCalculator,
}

impl<'a> TaskManager<'a> {
    /// Manager with the default scoring constants
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self::with_config(pool, PriorityConfig::default())
    }

    pub fn with_config(pool: &'a SqlitePool, config: PriorityConfig) -> Self {
        Self {
            pool,
            calculator: PriorityCalculator::new(config),
        }
    }

    /// Manager using the project's stored `priority.*` overrides
    pub async fn load(pool: &'a SqlitePool) -> Result<Self> {
        let config = load_priority_config(pool).await?;
        Ok(Self::with_config(pool, config))
    }

    pub fn calculator(&self) -> &PriorityCalculator {
        &self.calculator
    }

    fn score_at(&self, task: Task, now: DateTime<Utc>) -> ScoredTask {
        let priority = self.calculator.calculate_with_breakdown_at(&task, now);
        let at_risk = self.calculator.is_at_risk_at(&task, now);
        ScoredTask {
            task,
            priority,
            at_risk,
        }
    }

    fn score(&self, task: Task) -> ScoredTask {
        self.score_at(task, Utc::now())
    }

    /// Create a task in Todo with no bumps.
    ///
    /// With a parent the task becomes a subtask; the parent must exist and be
    /// a regular task.
    pub async fn add_task(&self, new_task: NewTask) -> Result<ScoredTask> {
        let name = new_task.name.trim();
        if name.is_empty() {
            return Err(TaskError::InvalidInput("Task name cannot be empty".to_string()));
        }
        let user_priority = new_task.user_priority.unwrap_or(DEFAULT_USER_PRIORITY);
        validate_user_priority(user_priority)?;

        let owner = new_task.owner.as_deref().unwrap_or(DEFAULT_OWNER);
        if owner.trim().is_empty() {
            return Err(TaskError::InvalidInput("Owner cannot be empty".to_string()));
        }

        let task_type = match new_task.parent_task_id {
            Some(parent_id) => {
                let parent = self.find_task(parent_id).await?;
                validate_parent(parent_id, parent.as_ref())?;
                TaskType::Subtask
            },
            None => TaskType::Regular,
        };

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO tasks (owner, name, description, status, user_priority, due_date,
                               estimated_effort, bump_count, created_at, task_type, parent_task_id)
            VALUES (?, ?, ?, 'todo', ?, ?, ?, 0, ?, ?, ?)
            "#,
        )
        .bind(owner)
        .bind(name)
        .bind(new_task.description.as_deref())
        .bind(user_priority)
        .bind(new_task.due_date)
        .bind(new_task.estimated_effort)
        .bind(now)
        .bind(task_type)
        .bind(new_task.parent_task_id)
        .execute(self.pool)
        .await?;

        let id = result.last_insert_rowid();
        crate::log_task_operation!("add", id, task_type.as_str());

        Ok(self.score(self.get_task(id).await?))
    }

    pub async fn get_task(&self, id: i64) -> Result<Task> {
        fetch_task(self.pool, id).await
    }

    async fn find_task(&self, id: i64) -> Result<Option<Task>> {
        match self.get_task(id).await {
            Ok(task) => Ok(Some(task)),
            Err(TaskError::TaskNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Task with its priority freshly computed
    pub async fn get_scored_task(&self, id: i64) -> Result<ScoredTask> {
        Ok(self.score(self.get_task(id).await?))
    }

    /// Tasks matching `filter`, highest score first (ties by id)
    pub async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<ScoredTask>> {
        let mut builder: sqlx::QueryBuilder<sqlx::Sqlite> = sqlx::QueryBuilder::new(SELECT_TASK_BASE);

        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status);
        }
        if let Some(parent_id) = filter.parent_task_id {
            builder.push(" AND parent_task_id = ").push_bind(parent_id);
        }

        let tasks: Vec<Task> = builder.build_query_as::<Task>().fetch_all(self.pool).await?;

        let now = Utc::now();
        let mut scored: Vec<ScoredTask> = tasks
            .into_iter()
            .map(|task| self.score_at(task, now))
            .filter(|scored| !filter.at_risk_only || scored.at_risk)
            .collect();

        scored.sort_by(|a, b| b.score().cmp(&a.score()).then(a.task.id.cmp(&b.task.id)));
        Ok(scored)
    }

    pub async fn update_task(&self, id: i64, update: TaskUpdate) -> Result<ScoredTask> {
        let task = self.get_task(id).await?;

        if update.is_empty() {
            return Ok(self.score(task));
        }

        if let Some(name) = &update.name {
            if name.trim().is_empty() {
                return Err(TaskError::InvalidInput("Task name cannot be empty".to_string()));
            }
        }
        if let Some(priority) = update.user_priority {
            validate_user_priority(priority)?;
        }
        if let Some(status) = update.status {
            if status.is_done() {
                return Err(TaskError::ActionNotAllowed(format!(
                    "Task #{} can only be completed with `done`",
                    id
                )));
            }
            if status != task.status {
                ensure_transition(&task, status)?;
            }
        }

        let mut builder: sqlx::QueryBuilder<sqlx::Sqlite> = sqlx::QueryBuilder::new("UPDATE tasks SET ");
        let mut fields = builder.separated(", ");

        if let Some(name) = &update.name {
            fields.push("name = ").push_bind_unseparated(name.trim().to_string());
        }
        if let Some(description) = &update.description {
            fields.push("description = ").push_bind_unseparated(description.clone());
        }
        if let Some(priority) = update.user_priority {
            fields.push("user_priority = ").push_bind_unseparated(priority);
        }
        if let Some(due_date) = update.due_date {
            fields.push("due_date = ").push_bind_unseparated(due_date);
        }
        if let Some(effort) = update.estimated_effort {
            fields.push("estimated_effort = ").push_bind_unseparated(effort);
        }
        if let Some(status) = update.status {
            fields.push("status = ").push_bind_unseparated(status);
        }

        builder.push(" WHERE id = ").push_bind(id);
        builder.build().execute(self.pool).await?;

        crate::log_task_operation!("update", id);
        self.get_scored_task(id).await
    }

    /// Record that the task was deferred once more
    pub async fn bump_task(&self, id: i64) -> Result<ScoredTask> {
        let task = self.get_task(id).await?;
        ensure_bumpable(&task)?;

        sqlx::query("UPDATE tasks SET bump_count = bump_count + 1 WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        crate::log_task_operation!("bump", id, task.bump_count + 1);
        self.get_scored_task(id).await
    }

    pub async fn start_task(&self, id: i64) -> Result<ScoredTask> {
        let task = self.get_task(id).await?;
        ensure_transition(&task, TaskStatus::InProgress)?;

        sqlx::query("UPDATE tasks SET status = 'in_progress' WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        crate::log_task_operation!("start", id);
        self.get_scored_task(id).await
    }

    /// Move a task to Done once the completion gate allows it.
    ///
    /// The gate check and the status write share one write transaction.
    /// Unblocked dependents are computed after commit and are advisory; a
    /// failure there is logged and yields an empty list.
    pub async fn done_task(&self, id: i64) -> Result<CompletionResponse> {
        let mut conn = begin_immediate(self.pool).await?;
        let outcome = complete_in_tx(&mut conn, id).await;
        let next_step_suggestion = finish_immediate(&mut conn, outcome).await?;
        drop(conn);

        crate::log_task_operation!("done", id);

        let unblocked_task_ids = match on_blocker_completed(self.pool, id).await {
            Ok(ids) => ids,
            Err(e) => {
                crate::log_error!(e, "computing unblocked dependents");
                Vec::new()
            },
        };

        Ok(CompletionResponse {
            completed_task: self.get_scored_task(id).await?,
            unblocked_task_ids,
            next_step_suggestion,
        })
    }

    /// Reopen a done task as Todo
    pub async fn restore_task(&self, id: i64) -> Result<ScoredTask> {
        let task = self.get_task(id).await?;
        ensure_restorable(&task)?;

        sqlx::query("UPDATE tasks SET status = 'todo', completed_at = NULL WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        crate::log_task_operation!("restore", id);
        self.get_scored_task(id).await
    }

    pub async fn subtask_info(&self, id: i64) -> Result<SubtaskInfo> {
        self.get_task(id).await?;
        let children = self.list_children(id).await?;
        Ok(compute_subtask_info(&children))
    }

    /// Gate decision without side effects
    pub async fn check_completion(&self, id: i64) -> Result<CompletionCheck> {
        check_completion(self, id).await
    }

    pub async fn list_children(&self, parent_id: i64) -> Result<Vec<Task>> {
        Ok(sqlx::query_as::<_, Task>(SELECT_CHILDREN)
            .bind(parent_id)
            .fetch_all(self.pool)
            .await?)
    }

    pub async fn list_edges_for_task(&self, task_id: i64) -> Result<TaskEdges> {
        let as_blocked = sqlx::query_as::<_, Dependency>(SELECT_EDGES_AS_BLOCKED)
            .bind(task_id)
            .fetch_all(self.pool)
            .await?;
        let as_blocker = sqlx::query_as::<_, Dependency>(SELECT_EDGES_AS_BLOCKER)
            .bind(task_id)
            .fetch_all(self.pool)
            .await?;

        Ok(TaskEdges {
            as_blocked,
            as_blocker,
        })
    }

    pub async fn task_exists_and_is_regular(&self, id: i64) -> Result<bool> {
        Ok(sqlx::query_scalar(CHECK_TASK_IS_REGULAR)
            .bind(id)
            .fetch_one(self.pool)
            .await?)
    }

    pub async fn list_blockers(&self, task_id: i64) -> Result<Vec<Task>> {
        crate::dependencies::list_blockers(self.pool, task_id).await
    }

    pub async fn list_blocking(&self, task_id: i64) -> Result<Vec<Task>> {
        crate::dependencies::list_blocking(self.pool, task_id).await
    }
}

fn validate_user_priority(priority: i32) -> Result<()> {
    if !(1..=10).contains(&priority) {
        return Err(TaskError::InvalidInput(format!(
            "Priority must be between 1 and 10 (got {})",
            priority
        )));
    }
    Ok(())
}

async fn complete_in_tx(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<NextStepSuggestion> {
    let task = fetch_task(&mut *conn, id).await?;
    ensure_transition(&task, TaskStatus::Done)?;

    let children: Vec<Task> = sqlx::query_as(SELECT_CHILDREN)
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;
    let blockers = crate::dependencies::list_blockers(&mut *conn, id).await?;

    evaluate_completion(&task, &children, &blockers)?;

    sqlx::query("UPDATE tasks SET status = 'done', completed_at = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *conn)
        .await?;

    let (parent, siblings) = match task.parent_task_id {
        Some(parent_id) => {
            let parent = fetch_task(&mut *conn, parent_id).await?;
            let siblings: Vec<Task> = sqlx::query_as(SELECT_CHILDREN)
                .bind(parent_id)
                .fetch_all(&mut *conn)
                .await?;
            (Some(parent), siblings)
        },
        None => (None, Vec::new()),
    };

    Ok(next_step_suggestion(
        &task,
        parent.as_ref(),
        &siblings,
        children.len() as i64,
    ))
}

impl TaskStore for TaskManager<'_> {
    fn get_task_by_id(&self, id: i64) -> impl std::future::Future<Output = Result<Task>> + Send {
        self.get_task(id)
    }

    fn list_children(
        &self,
        parent_id: i64,
    ) -> impl std::future::Future<Output = Result<Vec<Task>>> + Send {
        self.list_children(parent_id)
    }

    fn list_edges_for_task(
        &self,
        task_id: i64,
    ) -> impl std::future::Future<Output = Result<TaskEdges>> + Send {
        self.list_edges_for_task(task_id)
    }

    fn task_exists_and_is_regular(
        &self,
        id: i64,
    ) -> impl std::future::Future<Output = Result<bool>> + Send {
        self.task_exists_and_is_regular(id)
    }

    fn list_blockers(
        &self,
        task_id: i64,
    ) -> impl std::future::Future<Output = Result<Vec<Task>>> + Send {
        self.list_blockers(task_id)
    }

    fn list_blocking(
        &self,
        task_id: i64,
    ) -> impl std::future::Future<Output = Result<Vec<Task>>> + Send {
        self.list_blocking(task_id)
    }
}
