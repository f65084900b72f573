use crate::cli::{ConfigCommands, OutputFormat};
use crate::cli_handlers::utils::print_json;
use crate::config::{config_delete, config_get, config_list, config_set_checked, ensure_writable};
use crate::error::{Result, TaskError};
use crate::project::ProjectContext;
use serde_json::json;

/// Handle all `tg config` subcommands
pub async fn handle_config_command(cmd: ConfigCommands) -> Result<()> {
    match cmd {
        ConfigCommands::Set { key, value, format } => handle_set(&key, &value, format).await,
        ConfigCommands::Get { key, format } => handle_get(&key, format).await,
        ConfigCommands::List { prefix, format } => handle_list(prefix.as_deref(), format).await,
        ConfigCommands::Unset { key, format } => handle_unset(&key, format).await,
    }
}

async fn handle_set(key: &str, value: &str, format: OutputFormat) -> Result<()> {
    let ctx = ProjectContext::load_or_init().await?;
    config_set_checked(&ctx.pool, key, value).await?;

    match format {
        OutputFormat::Json => print_json(&json!({
            "key": key,
            "value": value,
            "message": "Configuration updated",
        }))?,
        OutputFormat::Text => println!("Set {} = {}", key, value),
    }

    Ok(())
}

async fn handle_get(key: &str, format: OutputFormat) -> Result<()> {
    let ctx = ProjectContext::load().await?;
    let value = config_get(&ctx.pool, key).await?;

    match format {
        OutputFormat::Json => print_json(&json!({ "key": key, "value": value }))?,
        OutputFormat::Text => match value {
            Some(v) => println!("{} = {}", key, v),
            None => println!("{}: (not set)", key),
        },
    }

    Ok(())
}

async fn handle_list(prefix: Option<&str>, format: OutputFormat) -> Result<()> {
    let ctx = ProjectContext::load().await?;
    let entries = config_list(&ctx.pool, prefix).await?;

    match format {
        OutputFormat::Json => {
            let items: Vec<serde_json::Value> = entries
                .iter()
                .map(|(k, v)| json!({ "key": k, "value": v }))
                .collect();
            print_json(&json!({ "config": items }))?;
        },
        OutputFormat::Text => {
            if entries.is_empty() {
                println!("No configuration entries found.");
            } else {
                for (key, value) in &entries {
                    println!("{} = {}", key, value);
                }
            }
        },
    }

    Ok(())
}

async fn handle_unset(key: &str, format: OutputFormat) -> Result<()> {
    ensure_writable(key)?;

    let ctx = ProjectContext::load_or_init().await?;
    let deleted = config_delete(&ctx.pool, key).await?;
    if !deleted {
        return Err(TaskError::InvalidInput(format!(
            "Config key '{}' is not set",
            key
        )));
    }

    match format {
        OutputFormat::Json => print_json(&json!({
            "key": key,
            "deleted": true,
            "message": "Configuration removed",
        }))?,
        OutputFormat::Text => println!("Removed {}", key),
    }

    Ok(())
}
