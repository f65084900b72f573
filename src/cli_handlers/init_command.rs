use crate::cli::OutputFormat;
use crate::cli_handlers::utils::print_json;
use crate::db::SCHEMA_VERSION;
use crate::error::{Result, TaskError};
use crate::project::{ProjectContext, TASKGATE_DIR};
use serde_json::json;
use std::path::PathBuf;

/// Initialize a project at `at`, or in the current directory.
///
/// Re-running on an existing project is harmless: migrations are idempotent.
pub async fn handle_init_command(at: Option<String>, format: OutputFormat) -> Result<()> {
    let target_dir = match &at {
        Some(path) => {
            let p = PathBuf::from(path);
            if !p.exists() {
                return Err(TaskError::InvalidInput(format!(
                    "Directory does not exist: {}",
                    path
                )));
            }
            if !p.is_dir() {
                return Err(TaskError::InvalidInput(format!(
                    "Path is not a directory: {}",
                    path
                )));
            }
            p
        },
        None => std::env::current_dir()?,
    };

    let already_initialized = target_dir.join(TASKGATE_DIR).is_dir();
    let ctx = ProjectContext::initialize_at(&target_dir).await?;

    match format {
        OutputFormat::Json => print_json(&json!({
            "success": true,
            "root": ctx.root.display().to_string(),
            "database_path": ctx.db_path.display().to_string(),
            "schema_version": SCHEMA_VERSION,
            "already_initialized": already_initialized,
        }))?,
        OutputFormat::Text => {
            if already_initialized {
                println!("taskgate project already initialized at {}", ctx.root.display());
            } else {
                println!("Initialized taskgate project at {}", ctx.root.display());
            }
            println!("  Database: {}", ctx.db_path.display());
        },
    }

    Ok(())
}
