use crate::cli::{OutputFormat, TaskCommands};
use crate::cli_handlers::utils::{
    emit, format_task_line, print_subtask_info, print_task_detail,
};
use crate::db::models::{CompletionResponse, Effort, NextStepSuggestion, TaskStatus};
use crate::error::Result;
use crate::project::ProjectContext;
use crate::tasks::{NewTask, TaskFilter, TaskManager, TaskUpdate};
use crate::time_utils::parse_due_date;
use chrono::Utc;
use serde_json::json;

/// Handle all `tg task` subcommands
pub async fn handle_task_command(cmd: TaskCommands) -> Result<()> {
    match cmd {
        TaskCommands::Add {
            name,
            description,
            priority,
            due,
            effort,
            parent,
            owner,
            format,
        } => {
            let new_task = NewTask {
                name,
                description,
                user_priority: priority,
                due_date: due.as_deref().map(|d| parse_due_date(d, Utc::now())).transpose()?,
                estimated_effort: effort.as_deref().map(str::parse::<Effort>).transpose()?,
                parent_task_id: parent,
                owner,
            };
            handle_add(new_task, format).await
        },

        TaskCommands::Get { id, format } => handle_get(id, format).await,

        TaskCommands::List {
            status,
            parent,
            at_risk,
            format,
        } => {
            let filter = TaskFilter {
                status: status.as_deref().map(str::parse::<TaskStatus>).transpose()?,
                parent_task_id: parent,
                at_risk_only: at_risk,
            };
            handle_list(filter, format).await
        },

        TaskCommands::Update {
            id,
            name,
            description,
            priority,
            due,
            clear_due,
            effort,
            status,
            format,
        } => {
            let update = build_update(
                name,
                description,
                priority,
                due,
                clear_due,
                effort,
                status,
            )?;
            handle_update(id, update, format).await
        },

        TaskCommands::Bump { id, format } => {
            let ctx = ProjectContext::load_or_init().await?;
            let task_mgr = TaskManager::load(&ctx.pool).await?;
            let scored = task_mgr.bump_task(id).await?;
            emit(format, &scored, |s| {
                println!(
                    "Bumped task #{} '{}' ({} bumps, priority now {})",
                    s.task.id,
                    s.task.name,
                    s.task.bump_count,
                    s.score()
                );
            })
        },

        TaskCommands::Start { id, format } => {
            let ctx = ProjectContext::load_or_init().await?;
            let task_mgr = TaskManager::load(&ctx.pool).await?;
            let scored = task_mgr.start_task(id).await?;
            emit(format, &scored, |s| {
                println!("Started task #{} '{}'", s.task.id, s.task.name);
            })
        },

        TaskCommands::Done { id, format } => handle_done(id, format).await,

        TaskCommands::Restore { id, format } => {
            let ctx = ProjectContext::load_or_init().await?;
            let task_mgr = TaskManager::load(&ctx.pool).await?;
            let scored = task_mgr.restore_task(id).await?;
            emit(format, &scored, |s| {
                println!("Restored task #{} '{}' to todo", s.task.id, s.task.name);
            })
        },

        TaskCommands::Subtasks { id, format } => {
            let ctx = ProjectContext::load().await?;
            let task_mgr = TaskManager::load(&ctx.pool).await?;
            let info = task_mgr.subtask_info(id).await?;
            let children = task_mgr.list_tasks(&TaskFilter {
                parent_task_id: Some(id),
                ..TaskFilter::default()
            })
            .await?;

            match format {
                OutputFormat::Json => {
                    let payload = json!({
                        "task_id": id,
                        "summary": info,
                        "subtasks": children,
                    });
                    println!("{}", serde_json::to_string_pretty(&payload)?);
                },
                OutputFormat::Text => {
                    print_subtask_info(id, &info);
                    for child in &children {
                        println!("  {}", format_task_line(child));
                    }
                },
            }
            Ok(())
        },
    }
}

// ============================================================================
// Individual command handlers
// ============================================================================

/// Translate raw update flags into a [`TaskUpdate`].
///
/// An empty description clears it; effort "none" clears the estimate.
fn build_update(
    name: Option<String>,
    description: Option<String>,
    priority: Option<i32>,
    due: Option<String>,
    clear_due: bool,
    effort: Option<String>,
    status: Option<String>,
) -> Result<TaskUpdate> {
    let due_date = if clear_due {
        Some(None)
    } else {
        due.as_deref()
            .map(|d| parse_due_date(d, Utc::now()).map(Some))
            .transpose()?
    };

    let estimated_effort = match effort.as_deref() {
        None => None,
        Some("none") => Some(None),
        Some(e) => Some(Some(e.parse::<Effort>()?)),
    };

    Ok(TaskUpdate {
        name,
        description: description.map(|d| if d.is_empty() { None } else { Some(d) }),
        user_priority: priority,
        due_date,
        estimated_effort,
        status: status.as_deref().map(str::parse::<TaskStatus>).transpose()?,
    })
}

async fn handle_add(new_task: NewTask, format: OutputFormat) -> Result<()> {
    let ctx = ProjectContext::load_or_init().await?;
    let task_mgr = TaskManager::load(&ctx.pool).await?;
    let scored = task_mgr.add_task(new_task).await?;

    emit(format, &scored, |s| {
        match s.task.parent_task_id {
            Some(parent) => println!(
                "Created subtask #{} '{}' under #{}",
                s.task.id, s.task.name, parent
            ),
            None => println!("Created task #{} '{}'", s.task.id, s.task.name),
        }
        println!("  Priority: {}", s.score());
    })
}

async fn handle_get(id: i64, format: OutputFormat) -> Result<()> {
    let ctx = ProjectContext::load().await?;
    let task_mgr = TaskManager::load(&ctx.pool).await?;
    let scored = task_mgr.get_scored_task(id).await?;

    emit(format, &scored, print_task_detail)
}

async fn handle_list(filter: TaskFilter, format: OutputFormat) -> Result<()> {
    let ctx = ProjectContext::load().await?;
    let task_mgr = TaskManager::load(&ctx.pool).await?;
    let tasks = task_mgr.list_tasks(&filter).await?;

    emit(format, &tasks, |tasks| {
        if tasks.is_empty() {
            println!("No tasks found.");
            return;
        }
        for scored in tasks {
            println!("{}", format_task_line(scored));
        }
    })
}

async fn handle_update(id: i64, update: TaskUpdate, format: OutputFormat) -> Result<()> {
    let ctx = ProjectContext::load_or_init().await?;
    let task_mgr = TaskManager::load(&ctx.pool).await?;
    let scored = task_mgr.update_task(id, update).await?;

    emit(format, &scored, |s| {
        println!("Updated task #{} '{}'", s.task.id, s.task.name);
        println!("  Priority: {}", s.score());
    })
}

async fn handle_done(id: i64, format: OutputFormat) -> Result<()> {
    let ctx = ProjectContext::load_or_init().await?;
    let task_mgr = TaskManager::load(&ctx.pool).await?;
    let result = task_mgr.done_task(id).await?;

    emit(format, &result, print_completion)
}

fn print_completion(result: &CompletionResponse) {
    let task = &result.completed_task.task;
    println!("Completed task #{} '{}'", task.id, task.name);

    if !result.unblocked_task_ids.is_empty() {
        let ids: Vec<String> = result
            .unblocked_task_ids
            .iter()
            .map(|id| format!("#{}", id))
            .collect();
        println!("  Unblocked: {}", ids.join(", "));
    }

    match &result.next_step_suggestion {
        NextStepSuggestion::ParentIsReady {
            message,
            parent_task_id,
            ..
        } => {
            println!("  Next: {} (tg task done {})", message, parent_task_id);
        },
        NextStepSuggestion::SiblingTasksRemain {
            message,
            remaining_siblings_count,
            ..
        } => {
            println!(
                "  Next: {} ({} siblings remaining)",
                message, remaining_siblings_count
            );
        },
        NextStepSuggestion::TopLevelTaskCompleted { message, .. }
        | NextStepSuggestion::NoParentContext { message, .. } => {
            println!("  {}", message);
        },
    }
}
