use crate::cli::{DepCommands, OutputFormat};
use crate::cli_handlers::utils::{emit, print_dependency_info, print_json};
use crate::dependencies::{add_dependency, get_dependency_info, remove_dependency};
use crate::error::Result;
use crate::project::ProjectContext;
use serde_json::json;

/// Handle all `tg dep` subcommands
pub async fn handle_dep_command(cmd: DepCommands) -> Result<()> {
    match cmd {
        DepCommands::Add {
            task,
            blocked_by,
            format,
        } => {
            let ctx = ProjectContext::load_or_init().await?;
            let dependency = add_dependency(&ctx.pool, task, blocked_by).await?;
            emit(format, &dependency, |d| {
                println!("Task #{} is now blocked by #{}", d.task_id, d.blocked_by_id);
            })
        },

        DepCommands::Rm {
            task,
            blocked_by,
            format,
        } => {
            let ctx = ProjectContext::load_or_init().await?;
            remove_dependency(&ctx.pool, task, blocked_by).await?;
            match format {
                OutputFormat::Json => print_json(&json!({
                    "task_id": task,
                    "blocked_by_id": blocked_by,
                    "removed": true,
                })),
                OutputFormat::Text => {
                    println!("Task #{} is no longer blocked by #{}", task, blocked_by);
                    Ok(())
                },
            }
        },

        DepCommands::Info { task, format } => {
            let ctx = ProjectContext::load().await?;
            let info = get_dependency_info(&ctx.pool, task).await?;
            emit(format, &info, print_dependency_info)
        },
    }
}
