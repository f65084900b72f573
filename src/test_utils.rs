#[cfg(test)]
pub mod test_helpers {
    use crate::db::{create_pool, run_migrations};
    use sqlx::SqlitePool;
    use tempfile::TempDir;

    /// Migrated database in a throwaway project directory
    pub struct TestContext {
        pub pool: SqlitePool,
        pub _temp_dir: TempDir,
    }

    impl TestContext {
        pub async fn new() -> Self {
            let temp_dir = TempDir::new().unwrap();

            let taskgate_dir = temp_dir.path().join(crate::project::TASKGATE_DIR);
            std::fs::create_dir_all(&taskgate_dir).unwrap();

            let db_path = taskgate_dir.join(crate::project::DB_FILE);

            let pool = create_pool(&db_path).await.unwrap();
            run_migrations(&pool).await.unwrap();

            Self {
                pool,
                _temp_dir: temp_dir,
            }
        }

        pub fn pool(&self) -> &SqlitePool {
            &self.pool
        }
    }
}
