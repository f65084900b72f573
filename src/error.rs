use crate::db::models::{TaskRef, TaskStatus, TaskType};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task not found: {0}")]
    TaskNotFound(i64),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Task #{task_id} cannot be blocked by itself")]
    SelfDependency { task_id: i64 },

    #[error("Task #{task_id} is already blocked by task #{blocked_by_id}")]
    DuplicateDependency { task_id: i64, blocked_by_id: i64 },

    #[error("Task #{task_id} is a {task_type} task; only regular tasks can take part in dependencies")]
    InvalidDependencyType { task_id: i64, task_type: TaskType },

    #[error(
        "Blocking task #{task_id} on task #{blocked_by_id} would create a cycle: {}",
        format_cycle(.task_id, .path)
    )]
    DependencyCycle {
        task_id: i64,
        blocked_by_id: i64,
        /// Existing path from `blocked_by_id` to `task_id` along blocked-by edges
        path: Vec<i64>,
    },

    #[error("Task #{task_id} is not blocked by task #{blocked_by_id}")]
    DependencyNotFound { task_id: i64, blocked_by_id: i64 },

    #[error(
        "Task #{task_id} is blocked by {} incomplete task(s): {}",
        .blockers.len(),
        format_refs(.blockers)
    )]
    BlockedByDependency {
        task_id: i64,
        blockers: Vec<TaskRef>,
    },

    #[error(
        "Task #{task_id} has {} incomplete subtask(s): {}",
        .remaining.len(),
        format_refs(.remaining)
    )]
    BlockedBySubtasks {
        task_id: i64,
        remaining: Vec<TaskRef>,
    },

    #[error("Parent task not found: {0}")]
    ParentNotFound(i64),

    #[error("Task #{parent_id} is a subtask; subtasks cannot have subtasks of their own")]
    SubtaskDepthExceeded { parent_id: i64 },

    #[error("Task #{task_id} cannot move from {from} to {to}")]
    InvalidStatusTransition {
        task_id: i64,
        from: TaskStatus,
        to: TaskStatus,
    },

    #[error("Action not allowed: {0}")]
    ActionNotAllowed(String),

    #[error("Current directory is not a taskgate project")]
    NotAProject,

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

fn format_refs(refs: &[TaskRef]) -> String {
    refs.iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_cycle(task_id: &i64, path: &[i64]) -> String {
    std::iter::once(*task_id)
        .chain(path.iter().copied())
        .map(|id| format!("#{}", id))
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl TaskError {
    pub fn to_error_code(&self) -> &'static str {
        match self {
            TaskError::TaskNotFound(_) => "TASK_NOT_FOUND",
            TaskError::DatabaseError(_) => "DATABASE_ERROR",
            TaskError::InvalidInput(_) => "INVALID_INPUT",
            TaskError::SelfDependency { .. } => "SELF_DEPENDENCY",
            TaskError::DuplicateDependency { .. } => "DUPLICATE_DEPENDENCY",
            TaskError::InvalidDependencyType { .. } => "INVALID_DEPENDENCY_TYPE",
            TaskError::DependencyCycle { .. } => "DEPENDENCY_CYCLE",
            TaskError::DependencyNotFound { .. } => "DEPENDENCY_NOT_FOUND",
            TaskError::BlockedByDependency { .. } => "BLOCKED_BY_DEPENDENCY",
            TaskError::BlockedBySubtasks { .. } => "BLOCKED_BY_SUBTASKS",
            TaskError::ParentNotFound(_) => "PARENT_NOT_FOUND",
            TaskError::SubtaskDepthExceeded { .. } => "SUBTASK_DEPTH_EXCEEDED",
            TaskError::InvalidStatusTransition { .. } => "INVALID_STATUS_TRANSITION",
            TaskError::ActionNotAllowed(_) => "ACTION_NOT_ALLOWED",
            TaskError::NotAProject => "NOT_A_PROJECT",
            TaskError::IoError(_) | TaskError::JsonError(_) => "INTERNAL_ERROR",
        }
    }

    pub fn to_error_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.to_string(),
            code: self.to_error_code().to_string(),
        }
    }

    /// SQLite lock contention (SQLITE_BUSY / SQLITE_LOCKED and their extended codes).
    /// The only failure worth retrying; domain errors are permanent for their input.
    pub fn is_transient(&self) -> bool {
        let TaskError::DatabaseError(sqlx::Error::Database(db_err)) = self else {
            return false;
        };

        match db_err.code() {
            Some(code) => code
                .parse::<i32>()
                .map(|c| matches!(c & 0xff, 5 | 6))
                .unwrap_or(false),
            None => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, TaskError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn task_ref(id: i64, name: &str, status: TaskStatus) -> TaskRef {
        TaskRef {
            id,
            name: name.to_string(),
            status,
        }
    }

    #[test]
    fn test_cycle_message_lists_closing_path() {
        let err = TaskError::DependencyCycle {
            task_id: 3,
            blocked_by_id: 1,
            path: vec![1, 2, 3],
        };
        assert_eq!(
            err.to_string(),
            "Blocking task #3 on task #1 would create a cycle: #3 -> #1 -> #2 -> #3"
        );
        assert_eq!(err.to_error_code(), "DEPENDENCY_CYCLE");
    }

    #[test]
    fn test_blocked_by_dependency_message() {
        let err = TaskError::BlockedByDependency {
            task_id: 4,
            blockers: vec![
                task_ref(1, "Design", TaskStatus::Todo),
                task_ref(2, "Review", TaskStatus::InProgress),
            ],
        };
        assert_eq!(
            err.to_string(),
            "Task #4 is blocked by 2 incomplete task(s): #1 'Design' [todo], #2 'Review' [in_progress]"
        );
    }

    #[test]
    fn test_blocked_by_subtasks_message() {
        let err = TaskError::BlockedBySubtasks {
            task_id: 9,
            remaining: vec![task_ref(11, "Child", TaskStatus::Todo)],
        };
        assert_eq!(
            err.to_string(),
            "Task #9 has 1 incomplete subtask(s): #11 'Child' [todo]"
        );
        assert_eq!(err.to_error_code(), "BLOCKED_BY_SUBTASKS");
    }

    #[test]
    fn test_error_response_shape() {
        let response = TaskError::SelfDependency { task_id: 5 }.to_error_response();
        assert_eq!(response.code, "SELF_DEPENDENCY");
        assert_eq!(response.error, "Task #5 cannot be blocked by itself");
    }

    #[test]
    fn test_domain_errors_are_not_transient() {
        assert!(!TaskError::TaskNotFound(1).is_transient());
        assert!(!TaskError::DuplicateDependency {
            task_id: 1,
            blocked_by_id: 2
        }
        .is_transient());
        assert!(!TaskError::DatabaseError(sqlx::Error::RowNotFound).is_transient());
    }
}
