//! Subtask roll-up for parent tasks.

use crate::db::models::{Task, TaskRef, TaskStatus};
use crate::error::{Result, TaskError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtaskInfo {
    pub total: i64,
    pub completed: i64,
    pub in_progress: i64,
    pub todo: i64,
    /// `completed / total`, 0.0 when there are no subtasks
    pub completion_rate: f64,
    /// True when every subtask is done; vacuously true with no subtasks
    pub all_complete: bool,
}

pub fn compute_subtask_info(children: &[Task]) -> SubtaskInfo {
    let (mut completed, mut in_progress, mut todo) = (0, 0, 0);
    for child in children {
        match child.status {
            TaskStatus::Done => completed += 1,
            TaskStatus::InProgress => in_progress += 1,
            TaskStatus::Todo => todo += 1,
        }
    }

    let total = children.len() as i64;
    let completion_rate = if total == 0 {
        0.0
    } else {
        completed as f64 / total as f64
    };

    SubtaskInfo {
        total,
        completed,
        in_progress,
        todo,
        completion_rate,
        all_complete: completed == total,
    }
}

pub fn can_complete_parent(children: &[Task]) -> bool {
    compute_subtask_info(children).all_complete
}

/// Subtasks that are not yet done, ordered by id
pub fn incomplete_children(children: &[Task]) -> Vec<TaskRef> {
    let mut remaining: Vec<TaskRef> = children
        .iter()
        .filter(|c| !c.status.is_done())
        .map(Task::to_ref)
        .collect();
    remaining.sort_by_key(|r| r.id);
    remaining
}

/// Nesting depth is capped at one: a parent must exist and be a regular task
pub fn validate_parent(parent_id: i64, parent: Option<&Task>) -> Result<()> {
    match parent {
        None => Err(TaskError::ParentNotFound(parent_id)),
        Some(p) if !p.is_regular() => {
            Err(TaskError::SubtaskDepthExceeded { parent_id })
        },
        Some(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::TaskType;
    use chrono::Utc;

    fn child(id: i64, status: TaskStatus) -> Task {
        Task {
            id,
            owner: "me".to_string(),
            name: format!("Child {}", id),
            description: None,
            status,
            user_priority: 5,
            due_date: None,
            estimated_effort: None,
            bump_count: 0,
            created_at: Utc::now(),
            completed_at: None,
            task_type: TaskType::Subtask,
            parent_task_id: Some(1),
        }
    }

    #[test]
    fn test_no_children_is_vacuously_complete() {
        let info = compute_subtask_info(&[]);
        assert_eq!(info.total, 0);
        assert_eq!(info.completion_rate, 0.0);
        assert!(info.all_complete);
        assert!(can_complete_parent(&[]));
    }

    #[test]
    fn test_half_done_parent() {
        let children = vec![child(2, TaskStatus::Done), child(3, TaskStatus::Todo)];
        let info = compute_subtask_info(&children);

        assert_eq!(info.total, 2);
        assert_eq!(info.completed, 1);
        assert_eq!(info.todo, 1);
        assert_eq!(info.in_progress, 0);
        assert_eq!(info.completion_rate, 0.5);
        assert!(!info.all_complete);
        assert!(!can_complete_parent(&children));
    }

    #[test]
    fn test_all_done_parent() {
        let children = vec![child(2, TaskStatus::Done), child(3, TaskStatus::Done)];
        assert!(can_complete_parent(&children));
        assert_eq!(compute_subtask_info(&children).completion_rate, 1.0);
    }

    #[test]
    fn test_in_progress_counts_as_incomplete() {
        let children = vec![
            child(5, TaskStatus::InProgress),
            child(2, TaskStatus::Todo),
            child(3, TaskStatus::Done),
        ];
        let info = compute_subtask_info(&children);
        assert_eq!(info.in_progress, 1);
        assert!(!can_complete_parent(&children));

        let remaining = incomplete_children(&children);
        assert_eq!(remaining.iter().map(|r| r.id).collect::<Vec<_>>(), vec![2, 5]);
    }

    #[test]
    fn test_validate_parent() {
        let mut parent = child(1, TaskStatus::Todo);
        parent.task_type = TaskType::Regular;
        parent.parent_task_id = None;
        assert!(validate_parent(1, Some(&parent)).is_ok());

        assert!(matches!(
            validate_parent(42, None),
            Err(TaskError::ParentNotFound(42))
        ));

        let nested = child(4, TaskStatus::Todo);
        assert!(matches!(
            validate_parent(4, Some(&nested)),
            Err(TaskError::SubtaskDepthExceeded { parent_id: 4 })
        ));
    }
}
