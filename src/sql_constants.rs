//! SQL query constants and fragments
//!
//! Column lists and base queries shared by the task service and the
//! dependency store. Dynamic WHERE clauses are still built inline.

// ============================================================================
// Task Queries
// ============================================================================

/// Column list matching the `Task` row model
pub const TASK_COLUMNS: &str = "id, owner, name, description, status, user_priority, due_date, \
     estimated_effort, bump_count, created_at, completed_at, task_type, parent_task_id";

/// Same columns qualified with the `t` alias, for joins
pub const TASK_COLUMNS_T: &str = "t.id, t.owner, t.name, t.description, t.status, t.user_priority, \
     t.due_date, t.estimated_effort, t.bump_count, t.created_at, t.completed_at, t.task_type, \
     t.parent_task_id";

pub const SELECT_TASK_BY_ID: &str =
    const_format::formatcp!("SELECT {} FROM tasks WHERE id = ?", TASK_COLUMNS);

/// Children of a parent, ordered by id
pub const SELECT_CHILDREN: &str = const_format::formatcp!(
    "SELECT {} FROM tasks WHERE parent_task_id = ? ORDER BY id",
    TASK_COLUMNS
);

/// Base SELECT query with an always-true WHERE for dynamic filters
pub const SELECT_TASK_BASE: &str =
    const_format::formatcp!("SELECT {} FROM tasks WHERE 1=1", TASK_COLUMNS);

/// Check if a task exists by ID
pub const CHECK_TASK_EXISTS: &str = "SELECT EXISTS(SELECT 1 FROM tasks WHERE id = ?)";

pub const CHECK_TASK_IS_REGULAR: &str =
    "SELECT EXISTS(SELECT 1 FROM tasks WHERE id = ? AND task_type = 'regular')";

// ============================================================================
// Dependency Queries
// ============================================================================

pub const DEPENDENCY_COLUMNS: &str = "id, task_id, blocked_by_id, created_at";

pub const SELECT_DEPENDENCY: &str = const_format::formatcp!(
    "SELECT {} FROM dependencies WHERE task_id = ? AND blocked_by_id = ?",
    DEPENDENCY_COLUMNS
);

/// Edges where the task is the blocked side
pub const SELECT_EDGES_AS_BLOCKED: &str = const_format::formatcp!(
    "SELECT {} FROM dependencies WHERE task_id = ? ORDER BY blocked_by_id",
    DEPENDENCY_COLUMNS
);

/// Edges where the task is the blocker
pub const SELECT_EDGES_AS_BLOCKER: &str = const_format::formatcp!(
    "SELECT {} FROM dependencies WHERE blocked_by_id = ? ORDER BY task_id",
    DEPENDENCY_COLUMNS
);

/// Tasks that block the given task
pub const SELECT_BLOCKERS: &str = const_format::formatcp!(
    "SELECT {} FROM tasks t JOIN dependencies d ON t.id = d.blocked_by_id WHERE d.task_id = ? ORDER BY t.id",
    TASK_COLUMNS_T
);

/// Tasks blocked by the given task
pub const SELECT_BLOCKING: &str = const_format::formatcp!(
    "SELECT {} FROM tasks t JOIN dependencies d ON t.id = d.task_id WHERE d.blocked_by_id = ? ORDER BY t.id",
    TASK_COLUMNS_T
);

/// Every edge reachable from a start task by following blocked-by links.
/// A new edge `X blocked-by S` closes a cycle iff X appears in this subgraph.
pub const SELECT_REACHABLE_EDGES: &str = r#"
    WITH RECURSIVE reach(id) AS (
        SELECT ?
        UNION
        SELECT d.blocked_by_id
        FROM dependencies d
        JOIN reach r ON d.task_id = r.id
    )
    SELECT d.task_id, d.blocked_by_id
    FROM dependencies d
    JOIN reach r ON d.task_id = r.id
"#;

pub const INSERT_DEPENDENCY: &str =
    "INSERT INTO dependencies (task_id, blocked_by_id, created_at) VALUES (?, ?, ?)";

pub const DELETE_DEPENDENCY: &str =
    "DELETE FROM dependencies WHERE task_id = ? AND blocked_by_id = ?";

// ============================================================================
// Tests
// ============================================================================
