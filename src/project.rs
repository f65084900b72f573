use crate::db::{create_pool, run_migrations};
use crate::error::{Result, TaskError};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};

pub const TASKGATE_DIR: &str = ".taskgate";
pub const DB_FILE: &str = "project.db";
/// Overrides project discovery when set
pub const PROJECT_DIR_ENV: &str = "TASKGATE_PROJECT_DIR";

/// Project root markers in priority order (highest priority first)
const PROJECT_ROOT_MARKERS: &[&str] = &[
    ".git",
    ".hg",
    "Cargo.toml",
    "package.json",
    "pyproject.toml",
    "go.mod",
];

#[derive(Debug)]
pub struct ProjectContext {
    pub root: PathBuf,
    pub db_path: PathBuf,
    pub pool: SqlitePool,
}

impl ProjectContext {
    /// Find the project root.
    ///
    /// Search strategy (in priority order):
    /// 1. `TASKGATE_PROJECT_DIR`, if it contains `.taskgate/`
    /// 2. Search upwards from the current directory for `.taskgate/`
    pub fn find_project_root() -> Option<PathBuf> {
        if let Some(env_path) = std::env::var_os(PROJECT_DIR_ENV) {
            let path = PathBuf::from(env_path);
            if path.join(TASKGATE_DIR).is_dir() {
                tracing::debug!(root = %path.display(), "Using project from {}", PROJECT_DIR_ENV);
                return Some(path);
            }
            tracing::warn!(
                root = %path.display(),
                "{} is set but contains no {} directory",
                PROJECT_DIR_ENV,
                TASKGATE_DIR
            );
        }

        let cwd = std::env::current_dir().ok()?;
        Self::find_project_root_from(&cwd)
    }

    /// Walk up from `start` looking for a `.taskgate/` directory
    pub fn find_project_root_from(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .find(|dir| dir.join(TASKGATE_DIR).is_dir())
            .map(Path::to_path_buf)
    }

    /// Nearest ancestor of `start` holding a project marker such as `.git`
    fn infer_project_root(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .find(|dir| PROJECT_ROOT_MARKERS.iter().any(|m| dir.join(m).exists()))
            .map(Path::to_path_buf)
    }

    /// Create (or reopen) a project rooted at `root`
    pub async fn initialize_at(root: &Path) -> Result<Self> {
        let taskgate_dir = root.join(TASKGATE_DIR);
        std::fs::create_dir_all(&taskgate_dir)?;

        let db_path = taskgate_dir.join(DB_FILE);
        let pool = create_pool(&db_path).await?;
        run_migrations(&pool).await?;

        crate::log_project_operation!("initialize", root);

        Ok(ProjectContext {
            root: root.to_path_buf(),
            db_path,
            pool,
        })
    }

    /// Initialize in the inferred project root, falling back to the current
    /// directory when no marker is found.
    pub async fn initialize_project() -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let root = Self::infer_project_root(&cwd).unwrap_or_else(|| {
            tracing::warn!(
                cwd = %cwd.display(),
                "No project marker (e.g. .git) found; initializing in the current directory"
            );
            cwd.clone()
        });

        Self::initialize_at(&root).await
    }

    /// Open an existing project. Migrations are re-applied on open.
    pub async fn load() -> Result<Self> {
        let root = Self::find_project_root().ok_or(TaskError::NotAProject)?;
        Self::load_at(&root).await
    }

    pub async fn load_at(root: &Path) -> Result<Self> {
        let db_path = root.join(TASKGATE_DIR).join(DB_FILE);
        if !db_path.exists() {
            return Err(TaskError::NotAProject);
        }

        let pool = create_pool(&db_path).await?;
        run_migrations(&pool).await?;

        Ok(ProjectContext {
            root: root.to_path_buf(),
            db_path,
            pool,
        })
    }

    /// Load project context, initializing if necessary (for write commands)
    pub async fn load_or_init() -> Result<Self> {
        match Self::load().await {
            Ok(ctx) => Ok(ctx),
            Err(TaskError::NotAProject) => Self::initialize_project().await,
            Err(e) => Err(e),
        }
    }
}
