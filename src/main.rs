use clap::Parser;
use taskgate::cli::{Cli, Commands};
use taskgate::cli_handlers::{
    handle_config_command, handle_dep_command, handle_init_command, handle_task_command,
};
use taskgate::error::Result;
use taskgate::logging::{init_logging, LoggingConfig};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_config =
        LoggingConfig::from_args(cli.quiet, cli.verbose > 0, cli.json).with_file_output(None);

    if let Err(e) = init_logging(log_config) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(cli).await {
        tracing::debug!(code = e.to_error_code(), error = %e, "Command failed");
        let error_response = e.to_error_response();
        match serde_json::to_string_pretty(&error_response) {
            Ok(body) => eprintln!("{}", body),
            Err(_) => eprintln!("{}", e),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { at, format } => handle_init_command(at, format).await,
        Commands::Task(cmd) => handle_task_command(cmd).await,
        Commands::Dep(cmd) => handle_dep_command(cmd).await,
        Commands::Config(cmd) => handle_config_command(cmd).await,
    }
}
