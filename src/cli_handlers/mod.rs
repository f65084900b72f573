// CLI command handlers module
//
// Core: task, dep
// System: init, config

pub mod config_commands;
pub mod dependency_commands;
pub mod init_command;
pub mod task_commands;
pub mod utils;

pub use config_commands::handle_config_command;
pub use dependency_commands::handle_dep_command;
pub use init_command::handle_init_command;
pub use task_commands::handle_task_command;
pub use utils::{get_status_badge, print_json};
