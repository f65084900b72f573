//! Legal status transitions.
//!
//! ```text
//! Todo ──► InProgress ──► Done
//!   │  ◄──────┘            ▲
//!   └──────────────────────┘
//! ```
//!
//! Done is terminal here; reopening goes through [`ensure_restorable`].

use crate::db::models::{Task, TaskStatus};
use crate::error::{Result, TaskError};

impl TaskStatus {
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Todo, TaskStatus::InProgress)
                | (TaskStatus::Todo, TaskStatus::Done)
                | (TaskStatus::InProgress, TaskStatus::Done)
                | (TaskStatus::InProgress, TaskStatus::Todo)
        )
    }
}

pub fn ensure_transition(task: &Task, next: TaskStatus) -> Result<()> {
    if task.status.can_transition_to(next) {
        Ok(())
    } else {
        Err(TaskError::InvalidStatusTransition {
            task_id: task.id,
            from: task.status,
            to: next,
        })
    }
}

/// Only done tasks can be restored, and they return to Todo
pub fn ensure_restorable(task: &Task) -> Result<()> {
    if task.status.is_done() {
        Ok(())
    } else {
        Err(TaskError::InvalidStatusTransition {
            task_id: task.id,
            from: task.status,
            to: TaskStatus::Todo,
        })
    }
}

pub fn ensure_bumpable(task: &Task) -> Result<()> {
    if task.status.is_done() {
        return Err(TaskError::ActionNotAllowed(format!(
            "Task #{} is done and cannot be bumped",
            task.id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::TaskType;
    use chrono::Utc;

    fn task_with(status: TaskStatus) -> Task {
        Task {
            id: 1,
            owner: "me".to_string(),
            name: "Task".to_string(),
            description: None,
            status,
            user_priority: 5,
            due_date: None,
            estimated_effort: None,
            bump_count: 0,
            created_at: Utc::now(),
            completed_at: None,
            task_type: TaskType::Regular,
            parent_task_id: None,
        }
    }

    #[test]
    fn test_transition_table() {
        use TaskStatus::*;

        assert!(Todo.can_transition_to(InProgress));
        assert!(Todo.can_transition_to(Done));
        assert!(InProgress.can_transition_to(Done));
        assert!(InProgress.can_transition_to(Todo));

        assert!(!Todo.can_transition_to(Todo));
        assert!(!InProgress.can_transition_to(InProgress));
        assert!(!Done.can_transition_to(Todo));
        assert!(!Done.can_transition_to(InProgress));
        assert!(!Done.can_transition_to(Done));
    }

    #[test]
    fn test_ensure_transition_error_context() {
        let err = ensure_transition(&task_with(TaskStatus::Done), TaskStatus::InProgress).unwrap_err();
        assert!(matches!(
            err,
            TaskError::InvalidStatusTransition {
                task_id: 1,
                from: TaskStatus::Done,
                to: TaskStatus::InProgress
            }
        ));
    }

    #[test]
    fn test_restore_and_bump_guards() {
        assert!(ensure_restorable(&task_with(TaskStatus::Done)).is_ok());
        assert!(ensure_restorable(&task_with(TaskStatus::Todo)).is_err());

        assert!(ensure_bumpable(&task_with(TaskStatus::InProgress)).is_ok());
        assert!(matches!(
            ensure_bumpable(&task_with(TaskStatus::Done)),
            Err(TaskError::ActionNotAllowed(_))
        ));
    }
}
