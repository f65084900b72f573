use clap::{Parser, Subcommand};

const LONG_ABOUT: &str = r#"
taskgate - priority-scored tasks with dependency and subtask completion gates

Every task carries a 0-100 priority score computed on read from its user
priority, age, deadline, bump count and estimated effort.

Key Rules:
  • A task cannot be marked done while any task blocking it is unfinished
  • A parent task cannot be marked done while any of its subtasks is unfinished
  • Dependency edges may never form a cycle
  • Subtasks cannot have subtasks and cannot take part in dependencies

Typical workflow:
  tg init
  tg task add "Ship release" --priority 8 --due 3d
  tg task add "Write changelog" --parent 1
  tg dep add 1 2
  tg task done 1      ← refused until the changelog is done
"#;

#[derive(Parser, Clone)]
#[command(name = "tg")]
#[command(about = "Priority-scored task tracker with dependency-aware completion gates")]
#[command(long_about = LONG_ABOUT)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output (-q)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output logs in JSON format
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Initialize a taskgate project
    ///
    /// Creates a .taskgate directory with the project database.
    ///
    /// Examples:
    ///   tg init                    # Initialize in current directory
    ///   tg init --at /my/project   # Initialize at specific directory
    Init {
        /// Directory to initialize (default: current directory)
        #[arg(long)]
        at: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Create, inspect and move tasks through their lifecycle
    ///
    /// Examples:
    ///   tg task add "Implement auth" --priority 8 --due 2d
    ///   tg task list --status todo
    ///   tg task start 42
    ///   tg task done 42
    #[command(subcommand)]
    Task(TaskCommands),

    /// Manage blocked-by dependencies between tasks
    ///
    /// Examples:
    ///   tg dep add 42 7     # task 42 is blocked by task 7
    ///   tg dep info 42
    #[command(subcommand)]
    Dep(DepCommands),

    /// Configuration management (key-value store)
    ///
    /// Priority tuning lives under the "priority." prefix.
    ///
    /// Examples:
    ///   tg config set priority.weight.deadline 0.4
    ///   tg config list --prefix priority
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Clone)]
pub enum TaskCommands {
    /// Create a new task
    ///
    /// Examples:
    ///   tg task add "Implement auth"
    ///   tg task add "Fix bug" --priority 9 --due 1d --effort small
    ///   tg task add "Write tests" --parent 42
    Add {
        /// Task name
        name: String,

        /// Task description
        #[arg(short, long)]
        description: Option<String>,

        /// User priority, 1 (lowest) to 10 (highest). Default: 5
        #[arg(short, long)]
        priority: Option<i32>,

        /// Due date: offset (3d, 12h, 2w), date (2025-01-31) or RFC 3339 timestamp
        #[arg(long)]
        due: Option<String>,

        /// Estimated effort (small, medium, large, xlarge)
        #[arg(short, long)]
        effort: Option<String>,

        /// Create as a subtask of this task
        #[arg(long)]
        parent: Option<i64>,

        /// Task owner (default: human)
        #[arg(long)]
        owner: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show a task with its priority breakdown
    ///
    /// Examples:
    ///   tg task get 42
    ///   tg task get 42 --format json
    Get {
        /// Task ID
        id: i64,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// List tasks, highest priority first
    ///
    /// Examples:
    ///   tg task list
    ///   tg task list --status in_progress
    ///   tg task list --parent 42
    ///   tg task list --at-risk
    List {
        /// Filter by status (todo, in_progress, done)
        #[arg(short, long)]
        status: Option<String>,

        /// Only subtasks of this task
        #[arg(long)]
        parent: Option<i64>,

        /// Only tasks that are overdue or bumped too often
        #[arg(long)]
        at_risk: bool,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Update fields of an existing task
    ///
    /// Examples:
    ///   tg task update 42 --name "New name"
    ///   tg task update 42 --priority 9 --due 2025-06-30
    ///   tg task update 42 --clear-due
    ///   tg task update 42 --status todo
    Update {
        /// Task ID
        id: i64,

        /// New task name
        #[arg(long)]
        name: Option<String>,

        /// New description (empty string clears it)
        #[arg(short, long)]
        description: Option<String>,

        /// New user priority (1-10)
        #[arg(short, long)]
        priority: Option<i32>,

        /// New due date
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<String>,

        /// Remove the due date
        #[arg(long)]
        clear_due: bool,

        /// New estimated effort (small, medium, large, xlarge, or "none" to clear)
        #[arg(short, long)]
        effort: Option<String>,

        /// New status (todo, in_progress). Use `tg task done` to complete.
        #[arg(short, long)]
        status: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Record that a task was postponed
    ///
    /// Each bump feeds the bump component of the score until its cap is reached,
    /// and a task bumped often enough is flagged at risk.
    ///
    /// Examples:
    ///   tg task bump 42
    Bump {
        /// Task ID
        id: i64,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Start working on a task (todo -> in_progress)
    ///
    /// Examples:
    ///   tg task start 42
    Start {
        /// Task ID
        id: i64,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Mark a task as done
    ///
    /// Refused while any blocking task or any subtask is unfinished.
    ///
    /// Examples:
    ///   tg task done 42
    Done {
        /// Task ID
        id: i64,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Reopen a completed task (done -> todo)
    ///
    /// Examples:
    ///   tg task restore 42
    Restore {
        /// Task ID
        id: i64,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show subtask progress of a task
    ///
    /// Examples:
    ///   tg task subtasks 42
    Subtasks {
        /// Parent task ID
        id: i64,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[derive(Subcommand, Clone)]
pub enum DepCommands {
    /// Make TASK blocked by BLOCKED_BY
    ///
    /// Rejected when it would create a cycle.
    ///
    /// Examples:
    ///   tg dep add 42 7
    Add {
        /// Task that will wait
        task: i64,

        /// Task that must be done first
        blocked_by: i64,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Remove a blocked-by dependency
    ///
    /// Examples:
    ///   tg dep rm 42 7
    Rm {
        /// Blocked task
        task: i64,

        /// Blocking task
        blocked_by: i64,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show what blocks a task and what it blocks
    ///
    /// Examples:
    ///   tg dep info 42
    Info {
        /// Task ID
        task: i64,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Set a configuration value
    ///
    /// Keys under "priority." are validated before they are stored.
    ///
    /// Examples:
    ///   tg config set priority.weight.user 0.5
    ///   tg config set priority.bump_cap 40
    Set {
        /// Configuration key (e.g., priority.weight.user)
        key: String,

        /// Configuration value
        value: String,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Get a configuration value
    ///
    /// Examples:
    ///   tg config get priority.weight.user
    Get {
        /// Configuration key
        key: String,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// List configuration entries
    ///
    /// Examples:
    ///   tg config list
    ///   tg config list --prefix priority
    List {
        /// Filter by key prefix (e.g., "priority" shows all priority.* keys)
        #[arg(long)]
        prefix: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Remove a configuration entry
    ///
    /// Examples:
    ///   tg config unset priority.bump_cap
    Unset {
        /// Configuration key to remove
        key: String,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_task_add() {
        let cli = Cli::try_parse_from([
            "tg", "task", "add", "Ship it", "--priority", "8", "--due", "3d", "--effort", "small",
        ])
        .unwrap();

        match cli.command {
            Commands::Task(TaskCommands::Add {
                name,
                priority,
                due,
                effort,
                format,
                ..
            }) => {
                assert_eq!(name, "Ship it");
                assert_eq!(priority, Some(8));
                assert_eq!(due.as_deref(), Some("3d"));
                assert_eq!(effort.as_deref(), Some("small"));
                assert_eq!(format, OutputFormat::Text);
            },
            _ => panic!("expected task add"),
        }
    }

    #[test]
    fn test_parse_dep_add_json() {
        let cli = Cli::try_parse_from(["tg", "dep", "add", "3", "1", "--format", "json"]).unwrap();
        match cli.command {
            Commands::Dep(DepCommands::Add {
                task,
                blocked_by,
                format,
            }) => {
                assert_eq!((task, blocked_by), (3, 1));
                assert_eq!(format, OutputFormat::Json);
            },
            _ => panic!("expected dep add"),
        }
    }

    #[test]
    fn test_update_due_conflicts_with_clear_due() {
        let result = Cli::try_parse_from([
            "tg",
            "task",
            "update",
            "1",
            "--due",
            "1d",
            "--clear-due",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_verbose_counts() {
        let cli = Cli::try_parse_from(["tg", "-vv", "task", "list"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(!cli.quiet);
    }
}
