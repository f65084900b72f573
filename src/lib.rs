pub mod backend;
pub mod cli;
pub mod cli_handlers;
pub mod config;
pub mod db;
pub mod dependencies;
pub mod error;
pub mod gate;
pub mod graph;
pub mod lifecycle;
pub mod logging;
pub mod priority;
pub mod project;
pub mod sql_constants;
pub mod subtasks;
pub mod tasks;
pub mod time_utils;

#[cfg(test)]
pub mod test_utils;
