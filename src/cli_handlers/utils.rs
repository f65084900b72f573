//! Utility functions for CLI handlers
//!
//! Status badges, text rendering of scored tasks and the shared JSON printer.

use crate::cli::OutputFormat;
use crate::db::models::{ScoredTask, TaskRef, TaskStatus};
use crate::error::Result;
use crate::graph::DependencyInfo;
use crate::subtasks::SubtaskInfo;
use serde::Serialize;

/// Get a status badge icon for task status
pub fn get_status_badge(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Done => "✓",
        TaskStatus::InProgress => "→",
        TaskStatus::Todo => "○",
    }
}

/// Pretty-print `value` as JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print `value` as JSON, or run `text` for the human-readable form
pub fn emit<T: Serialize>(format: OutputFormat, value: &T, text: impl FnOnce(&T)) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(value),
        OutputFormat::Text => {
            text(value);
            Ok(())
        },
    }
}

/// One-line summary used by list output
pub fn format_task_line(scored: &ScoredTask) -> String {
    let task = &scored.task;
    let mut line = format!(
        "{} #{} [{:>3}] {}",
        get_status_badge(task.status),
        task.id,
        scored.score(),
        task.name
    );
    if let Some(parent) = task.parent_task_id {
        line.push_str(&format!(" (subtask of #{})", parent));
    }
    if let Some(due) = task.due_date {
        line.push_str(&format!(" due {}", due.format("%Y-%m-%d %H:%M")));
    }
    if scored.at_risk {
        line.push_str(" !at-risk");
    }
    line
}

/// Multi-line detail view with the priority breakdown
pub fn print_task_detail(scored: &ScoredTask) {
    let task = &scored.task;
    let p = &scored.priority;

    println!(
        "{} Task #{}: {}",
        get_status_badge(task.status),
        task.id,
        task.name
    );
    println!("  Status: {}", task.status);
    println!("  Owner: {}", task.owner);
    match task.parent_task_id {
        Some(parent) => println!("  Type: subtask of #{}", parent),
        None => println!("  Type: {}", task.task_type),
    }
    if let Some(desc) = &task.description {
        println!("  Description: {}", desc);
    }
    if let Some(due) = task.due_date {
        println!("  Due: {}", due.to_rfc3339());
    }
    if let Some(effort) = task.estimated_effort {
        println!("  Effort: {}", effort);
    }
    println!("  Bumps: {}", task.bump_count);
    if let Some(done_at) = task.completed_at {
        println!("  Completed: {}", done_at.to_rfc3339());
    }

    println!(
        "  Priority: {}{}",
        p.score,
        if scored.at_risk { " (at risk)" } else { "" }
    );
    println!(
        "    user {:.1} | age {:.1} | deadline {:.1} | bumps -{:.1} | effort x{:.2}",
        p.user_priority, p.time_decay, p.deadline_urgency, p.bump_penalty, p.effort_boost
    );
}

pub fn print_subtask_info(parent_id: i64, info: &SubtaskInfo) {
    if info.total == 0 {
        println!("Task #{} has no subtasks", parent_id);
        return;
    }
    println!(
        "Task #{}: {}/{} subtasks done ({:.0}%)",
        parent_id,
        info.completed,
        info.total,
        info.completion_rate * 100.0
    );
    println!(
        "  todo {} | in progress {} | done {}",
        info.todo, info.in_progress, info.completed
    );
}

fn print_ref_list(title: &str, refs: &[TaskRef]) {
    if refs.is_empty() {
        println!("  {}: none", title);
        return;
    }
    println!("  {}:", title);
    for r in refs {
        println!("    {} #{} {}", get_status_badge(r.status), r.id, r.name);
    }
}

pub fn print_dependency_info(info: &DependencyInfo) {
    let state = if info.is_blocked { "blocked" } else { "unblocked" };
    println!("Task #{} is {}", info.task_id, state);
    print_ref_list("Blocked by", &info.blockers);
    print_ref_list("Blocks", &info.blocking);
}
