//! Completion gate: decides whether a task may move to Done.
//!
//! A regular task is eligible only when all of its subtasks are done and none
//! of its blockers is incomplete. Subtasks are never gated. When both
//! conditions fail, the subtask failure is reported.

use crate::backend::TaskStore;
use crate::db::models::{NextStepSuggestion, Task};
use crate::error::{Result, TaskError};
use crate::graph::DependencyInfo;
use crate::subtasks::{compute_subtask_info, incomplete_children, SubtaskInfo};
use serde::{Deserialize, Serialize};

pub fn evaluate_completion(task: &Task, children: &[Task], blockers: &[Task]) -> Result<()> {
    if !task.is_regular() {
        return Ok(());
    }

    let remaining = incomplete_children(children);
    if !remaining.is_empty() {
        return Err(TaskError::BlockedBySubtasks {
            task_id: task.id,
            remaining,
        });
    }

    let info = DependencyInfo::from_tasks(task.id, blockers, &[]);
    if info.is_blocked {
        return Err(TaskError::BlockedByDependency {
            task_id: task.id,
            blockers: info.incomplete_blockers,
        });
    }

    Ok(())
}

/// Non-failing report of the gate's current decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionCheck {
    pub task_id: i64,
    pub can_complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtasks: Option<SubtaskInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<DependencyInfo>,
}

/// Pull live subtask and dependency state from `store` and run the gate.
///
/// Store failures propagate, so a caller that cannot list children never
/// sees `can_complete: true`.
pub async fn check_completion<S: TaskStore>(store: &S, task_id: i64) -> Result<CompletionCheck> {
    let task = store.get_task_by_id(task_id).await?;

    if !task.is_regular() {
        return Ok(CompletionCheck {
            task_id,
            can_complete: true,
            reason: None,
            subtasks: None,
            dependencies: None,
        });
    }

    let children = store.list_children(task_id).await?;
    let blockers = store.list_blockers(task_id).await?;
    let blocking = store.list_blocking(task_id).await?;

    let decision = evaluate_completion(&task, &children, &blockers);

    Ok(CompletionCheck {
        task_id,
        can_complete: decision.is_ok(),
        reason: decision.err().map(|e| e.to_string()),
        subtasks: Some(compute_subtask_info(&children)),
        dependencies: Some(DependencyInfo::from_tasks(task_id, &blockers, &blocking)),
    })
}

/// Advisory follow-up after `completed` reached Done.
///
/// `siblings` are the other children of the completed task's parent (if any);
/// `child_count` is the number of subtasks the completed task itself has.
pub fn next_step_suggestion(
    completed: &Task,
    parent: Option<&Task>,
    siblings: &[Task],
    child_count: i64,
) -> NextStepSuggestion {
    if let Some(parent) = parent {
        let remaining = siblings
            .iter()
            .filter(|s| s.id != completed.id && !s.status.is_done())
            .count() as i64;

        if remaining == 0 {
            return NextStepSuggestion::ParentIsReady {
                message: format!(
                    "All subtasks of parent #{} '{}' are now complete. The parent task can be completed.",
                    parent.id, parent.name
                ),
                parent_task_id: parent.id,
                parent_task_name: parent.name.clone(),
            };
        }

        return NextStepSuggestion::SiblingTasksRemain {
            message: format!(
                "Task #{} completed. Parent task #{} '{}' has {} subtask(s) remaining.",
                completed.id, parent.id, parent.name, remaining
            ),
            parent_task_id: parent.id,
            parent_task_name: parent.name.clone(),
            remaining_siblings_count: remaining,
        };
    }

    if child_count > 0 {
        NextStepSuggestion::TopLevelTaskCompleted {
            message: format!(
                "Task #{} '{}' and all of its subtasks are complete.",
                completed.id, completed.name
            ),
            completed_task_id: completed.id,
            completed_task_name: completed.name.clone(),
        }
    } else {
        NextStepSuggestion::NoParentContext {
            message: format!("Task #{} '{}' has been completed.", completed.id, completed.name),
            completed_task_id: completed.id,
            completed_task_name: completed.name.clone(),
        }
    }
}
