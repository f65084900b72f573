use crate::error::TaskError;
use crate::priority::PriorityBreakdown;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, TaskStatus::Done)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "todo" => Ok(TaskStatus::Todo),
            "in_progress" | "in-progress" | "doing" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            _ => Err(TaskError::InvalidInput(format!(
                "Invalid status '{}'. Valid values: todo, in_progress, done",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum TaskType {
    Regular,
    Subtask,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Regular => "regular",
            TaskType::Subtask => "subtask",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Estimated size of a task. Smaller tasks get a larger priority boost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Effort {
    Small,
    Medium,
    Large,
    XLarge,
}

impl Effort {
    pub fn as_str(&self) -> &'static str {
        match self {
            Effort::Small => "small",
            Effort::Medium => "medium",
            Effort::Large => "large",
            Effort::XLarge => "xlarge",
        }
    }
}

impl fmt::Display for Effort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Effort {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "small" | "s" => Ok(Effort::Small),
            "medium" | "m" => Ok(Effort::Medium),
            "large" | "l" => Ok(Effort::Large),
            "xlarge" | "xl" => Ok(Effort::XLarge),
            _ => Err(TaskError::InvalidInput(format!(
                "Invalid effort '{}'. Valid values: small, medium, large, xlarge",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: i64,
    pub owner: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TaskStatus,
    pub user_priority: i32,
    pub due_date: Option<DateTime<Utc>>,
    pub estimated_effort: Option<Effort>,
    pub bump_count: i32,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub task_type: TaskType,
    pub parent_task_id: Option<i64>,
}

impl Task {
    pub fn is_regular(&self) -> bool {
        self.task_type == TaskType::Regular
    }

    pub fn to_ref(&self) -> TaskRef {
        TaskRef {
            id: self.id,
            name: self.name.clone(),
            status: self.status,
        }
    }
}

/// Compact task reference used in dependency info and error context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRef {
    pub id: i64,
    pub name: String,
    pub status: TaskStatus,
}

impl fmt::Display for TaskRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} '{}' [{}]", self.id, self.name, self.status)
    }
}

/// A blocked-by edge: `task_id` cannot complete until `blocked_by_id` is done
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Dependency {
    pub id: i64,
    pub task_id: i64,
    pub blocked_by_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Edge rows touching a single task, split by direction
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskEdges {
    /// Edges where the task is the blocked side
    pub as_blocked: Vec<Dependency>,
    /// Edges where the task is the blocker
    pub as_blocker: Vec<Dependency>,
}

/// A task together with its priority computed at read time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredTask {
    #[serde(flatten)]
    pub task: Task,
    pub priority: PriorityBreakdown,
    pub at_risk: bool,
}

impl ScoredTask {
    pub fn score(&self) -> u8 {
        self.priority.score
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub completed_task: ScoredTask,
    /// Tasks whose last incomplete blocker was this one. Advisory only.
    pub unblocked_task_ids: Vec<i64>,
    pub next_step_suggestion: NextStepSuggestion,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NextStepSuggestion {
    #[serde(rename = "PARENT_IS_READY")]
    ParentIsReady {
        message: String,
        parent_task_id: i64,
        parent_task_name: String,
    },
    #[serde(rename = "SIBLING_TASKS_REMAIN")]
    SiblingTasksRemain {
        message: String,
        parent_task_id: i64,
        parent_task_name: String,
        remaining_siblings_count: i64,
    },
    #[serde(rename = "TOP_LEVEL_TASK_COMPLETED")]
    TopLevelTaskCompleted {
        message: String,
        completed_task_id: i64,
        completed_task_name: String,
    },
    #[serde(rename = "NO_PARENT_CONTEXT")]
    NoParentContext {
        message: String,
        completed_task_id: i64,
        completed_task_name: String,
    },
}

impl NextStepSuggestion {
    pub fn message(&self) -> &str {
        match self {
            NextStepSuggestion::ParentIsReady { message, .. }
            | NextStepSuggestion::SiblingTasksRemain { message, .. }
            | NextStepSuggestion::TopLevelTaskCompleted { message, .. }
            | NextStepSuggestion::NoParentContext { message, .. } => message,
        }
    }
}
