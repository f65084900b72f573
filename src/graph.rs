//! In-memory view of the blocked-by dependency graph.
//!
//! The graph is rebuilt for each operation from the edge rows that operation
//! needs. Edges point from a task to the task blocking it, so a path
//! `a -> b -> c` reads "a is blocked by b, which is blocked by c".

use crate::db::models::{Task, TaskRef, TaskStatus, TaskType};
use crate::error::{Result, TaskError};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    blocked_by: HashMap<i64, Vec<i64>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(task_id, blocked_by_id)` pairs. Duplicate pairs collapse.
    pub fn from_edges<I>(edges: I) -> Self
    where
        I: IntoIterator<Item = (i64, i64)>,
    {
        let mut graph = Self::new();
        for (task_id, blocked_by_id) in edges {
            graph.add_edge(task_id, blocked_by_id);
        }
        graph
    }

    /// Returns false if the edge was already present
    pub fn add_edge(&mut self, task_id: i64, blocked_by_id: i64) -> bool {
        let targets = self.blocked_by.entry(task_id).or_default();
        if targets.contains(&blocked_by_id) {
            return false;
        }
        targets.push(blocked_by_id);
        true
    }

    pub fn remove_edge(&mut self, task_id: i64, blocked_by_id: i64) -> bool {
        let Some(targets) = self.blocked_by.get_mut(&task_id) else {
            return false;
        };
        let before = targets.len();
        targets.retain(|id| *id != blocked_by_id);
        let removed = targets.len() != before;
        if targets.is_empty() {
            self.blocked_by.remove(&task_id);
        }
        removed
    }

    pub fn contains_edge(&self, task_id: i64, blocked_by_id: i64) -> bool {
        self.blocked_by
            .get(&task_id)
            .is_some_and(|targets| targets.contains(&blocked_by_id))
    }

    pub fn blockers_of(&self, task_id: i64) -> &[i64] {
        self.blocked_by
            .get(&task_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn edge_count(&self) -> usize {
        self.blocked_by.values().map(Vec::len).sum()
    }

    /// Find a path `from -> ... -> to` along blocked-by edges.
    ///
    /// Iterative DFS, O(V + E). The returned path includes both endpoints;
    /// `from == to` yields `[from]`.
    pub fn find_path(&self, from: i64, to: i64) -> Option<Vec<i64>> {
        if from == to {
            return Some(vec![from]);
        }

        let mut visited: HashSet<i64> = HashSet::from([from]);
        let mut parent: HashMap<i64, i64> = HashMap::new();
        let mut stack = vec![from];

        while let Some(current) = stack.pop() {
            for &next in self.blockers_of(current) {
                if !visited.insert(next) {
                    continue;
                }
                parent.insert(next, current);

                if next == to {
                    let mut path = vec![to];
                    let mut node = to;
                    while let Some(&prev) = parent.get(&node) {
                        path.push(prev);
                        node = prev;
                    }
                    path.reverse();
                    return Some(path);
                }

                stack.push(next);
            }
        }

        None
    }

    /// The existing path that a new `task_id blocked by blocked_by_id` edge
    /// would close into a cycle, if any.
    pub fn cycle_path(&self, task_id: i64, blocked_by_id: i64) -> Option<Vec<i64>> {
        self.find_path(blocked_by_id, task_id)
    }

    pub fn is_acyclic(&self) -> bool {
        // Colour-marking DFS: 1 = on stack, 2 = finished
        let mut state: HashMap<i64, u8> = HashMap::new();

        for &start in self.blocked_by.keys() {
            if state.contains_key(&start) {
                continue;
            }

            let mut stack: Vec<(i64, usize)> = vec![(start, 0)];
            state.insert(start, 1);

            while let Some((node, index)) = stack.pop() {
                let blockers = self.blockers_of(node);
                if index < blockers.len() {
                    stack.push((node, index + 1));
                    let next = blockers[index];
                    match state.get(&next) {
                        Some(1) => return false,
                        Some(_) => {},
                        None => {
                            state.insert(next, 1);
                            stack.push((next, 0));
                        },
                    }
                } else {
                    state.insert(node, 2);
                }
            }
        }

        true
    }
}

/// Type and identity of an edge endpoint, as seen by validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub id: i64,
    pub task_type: TaskType,
}

impl From<&Task> for Endpoint {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            task_type: task.task_type,
        }
    }
}

/// Check a candidate edge against the current graph.
///
/// `graph` must contain every edge reachable from `blocked_by`, plus any
/// existing edge between the two endpoints.
pub fn validate_new_edge(graph: &DependencyGraph, task: Endpoint, blocked_by: Endpoint) -> Result<()> {
    if task.id == blocked_by.id {
        return Err(TaskError::SelfDependency { task_id: task.id });
    }

    if graph.contains_edge(task.id, blocked_by.id) {
        return Err(TaskError::DuplicateDependency {
            task_id: task.id,
            blocked_by_id: blocked_by.id,
        });
    }

    for endpoint in [task, blocked_by] {
        if endpoint.task_type != TaskType::Regular {
            return Err(TaskError::InvalidDependencyType {
                task_id: endpoint.id,
                task_type: endpoint.task_type,
            });
        }
    }

    if let Some(path) = graph.cycle_path(task.id, blocked_by.id) {
        return Err(TaskError::DependencyCycle {
            task_id: task.id,
            blocked_by_id: blocked_by.id,
            path,
        });
    }

    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyInfo {
    pub task_id: i64,
    /// Tasks this task is blocked by
    pub blockers: Vec<TaskRef>,
    /// Tasks blocked by this task
    pub blocking: Vec<TaskRef>,
    /// Blockers not yet done
    pub incomplete_blockers: Vec<TaskRef>,
    pub is_blocked: bool,
    pub can_complete: bool,
}

impl DependencyInfo {
    pub fn from_tasks(task_id: i64, blockers: &[Task], blocking: &[Task]) -> Self {
        let mut blockers: Vec<TaskRef> = blockers.iter().map(Task::to_ref).collect();
        let mut blocking: Vec<TaskRef> = blocking.iter().map(Task::to_ref).collect();
        blockers.sort_by_key(|t| t.id);
        blocking.sort_by_key(|t| t.id);

        let incomplete_blockers: Vec<TaskRef> = blockers
            .iter()
            .filter(|t| t.status != TaskStatus::Done)
            .cloned()
            .collect();
        let is_blocked = !incomplete_blockers.is_empty();

        Self {
            task_id,
            blockers,
            blocking,
            incomplete_blockers,
            is_blocked,
            can_complete: !is_blocked,
        }
    }
}

/// A task directly blocked by the completed task, with all of its blockers
#[derive(Debug, Clone)]
pub struct Dependent {
    pub task: Task,
    pub blockers: Vec<Task>,
}

/// Dependents whose last incomplete blocker was `completed_id`.
///
/// `completed_id` counts as done even if the caller's snapshot predates the
/// status write. Dependents that are already done are skipped.
pub fn newly_unblocked(completed_id: i64, dependents: &[Dependent]) -> Vec<i64> {
    let mut unblocked: Vec<i64> = dependents
        .iter()
        .filter(|d| d.task.status != TaskStatus::Done)
        .filter(|d| d.blockers.iter().any(|b| b.id == completed_id))
        .filter(|d| {
            d.blockers
                .iter()
                .all(|b| b.id == completed_id || b.status == TaskStatus::Done)
        })
        .map(|d| d.task.id)
        .collect();

    unblocked.sort_unstable();
    unblocked.dedup();
    unblocked
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn task(id: i64, status: TaskStatus) -> Task {
        Task {
            id,
            owner: "me".to_string(),
            name: format!("Task {}", id),
            description: None,
            status,
            user_priority: 5,
            due_date: None,
            estimated_effort: None,
            bump_count: 0,
            created_at: Utc::now(),
            completed_at: None,
            task_type: TaskType::Regular,
            parent_task_id: None,
        }
    }

    fn regular(id: i64) -> Endpoint {
        Endpoint {
            id,
            task_type: TaskType::Regular,
        }
    }

    #[test]
    fn test_find_path_follows_blocked_by_edges() {
        let graph = DependencyGraph::from_edges([(1, 2), (2, 3), (3, 4)]);
        assert_eq!(graph.find_path(1, 4), Some(vec![1, 2, 3, 4]));
        assert_eq!(graph.find_path(4, 1), None);
        assert_eq!(graph.find_path(2, 2), Some(vec![2]));
    }

    #[test]
    fn test_find_path_handles_diamonds() {
        let graph = DependencyGraph::from_edges([(1, 2), (1, 3), (2, 4), (3, 4), (4, 5)]);
        let path = graph.find_path(1, 5).unwrap();
        assert_eq!(path.first(), Some(&1));
        assert_eq!(path.last(), Some(&5));
        assert_eq!(path.len(), 4);
    }

    #[test]
    fn test_self_dependency_rejected() {
        let graph = DependencyGraph::new();
        let err = validate_new_edge(&graph, regular(7), regular(7)).unwrap_err();
        assert!(matches!(err, TaskError::SelfDependency { task_id: 7 }));
    }

    #[test]
    fn test_duplicate_rejected() {
        let graph = DependencyGraph::from_edges([(1, 2)]);
        let err = validate_new_edge(&graph, regular(1), regular(2)).unwrap_err();
        assert!(matches!(
            err,
            TaskError::DuplicateDependency {
                task_id: 1,
                blocked_by_id: 2
            }
        ));
    }

    #[test]
    fn test_subtask_endpoint_rejected() {
        let graph = DependencyGraph::new();
        let subtask = Endpoint {
            id: 9,
            task_type: TaskType::Subtask,
        };

        let err = validate_new_edge(&graph, regular(1), subtask).unwrap_err();
        assert!(matches!(
            err,
            TaskError::InvalidDependencyType {
                task_id: 9,
                task_type: TaskType::Subtask
            }
        ));

        let err = validate_new_edge(&graph, subtask, regular(1)).unwrap_err();
        assert!(matches!(err, TaskError::InvalidDependencyType { task_id: 9, .. }));
    }

    #[test]
    fn test_closing_edge_reports_cycle_path() {
        // X=1 blocked by Y=2, Y blocked by Z=3
        let graph = DependencyGraph::from_edges([(1, 2), (2, 3)]);

        // Z blocked by X would close X -> Y -> Z
        let err = validate_new_edge(&graph, regular(3), regular(1)).unwrap_err();
        match err {
            TaskError::DependencyCycle {
                task_id,
                blocked_by_id,
                path,
            } => {
                assert_eq!(task_id, 3);
                assert_eq!(blocked_by_id, 1);
                assert_eq!(path, vec![1, 2, 3]);
            },
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_direct_reverse_edge_is_cycle() {
        let graph = DependencyGraph::from_edges([(1, 2)]);
        let err = validate_new_edge(&graph, regular(2), regular(1)).unwrap_err();
        assert!(matches!(err, TaskError::DependencyCycle { .. }));
    }

    #[test]
    fn test_transitive_shortcut_is_allowed() {
        // 1 -> 2 -> 3 already; 1 blocked by 3 directly adds no cycle
        let graph = DependencyGraph::from_edges([(1, 2), (2, 3)]);
        assert!(validate_new_edge(&graph, regular(1), regular(3)).is_ok());
    }

    #[test]
    fn test_accepted_edges_keep_graph_acyclic() {
        let mut graph = DependencyGraph::new();
        let candidates = [(1, 2), (2, 3), (3, 1), (4, 1), (3, 4), (5, 5), (2, 5), (5, 1)];

        for (task_id, blocked_by_id) in candidates {
            if validate_new_edge(&graph, regular(task_id), regular(blocked_by_id)).is_ok() {
                graph.add_edge(task_id, blocked_by_id);
                assert!(graph.find_path(task_id, blocked_by_id).is_some());
            }
            assert!(graph.is_acyclic());
        }

        assert!(graph.contains_edge(1, 2));
        assert!(!graph.contains_edge(3, 1));
        assert!(!graph.contains_edge(5, 1));
    }

    #[test]
    fn test_is_acyclic_detects_cycle() {
        assert!(DependencyGraph::from_edges([(1, 2), (2, 3)]).is_acyclic());
        assert!(!DependencyGraph::from_edges([(1, 2), (2, 3), (3, 1)]).is_acyclic());
    }

    #[test]
    fn test_remove_edge_round_trip() {
        let mut graph = DependencyGraph::from_edges([(1, 2)]);
        assert!(graph.add_edge(1, 3));
        assert!(graph.remove_edge(1, 3));
        assert!(!graph.remove_edge(1, 3));
        assert_eq!(graph.blockers_of(1), &[2]);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_dependency_info_blocked_state() {
        let blockers = vec![task(3, TaskStatus::Done), task(2, TaskStatus::InProgress)];
        let blocking = vec![task(8, TaskStatus::Todo)];

        let info = DependencyInfo::from_tasks(1, &blockers, &blocking);
        assert!(info.is_blocked);
        assert!(!info.can_complete);
        assert_eq!(info.blockers.iter().map(|t| t.id).collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(info.incomplete_blockers.len(), 1);
        assert_eq!(info.incomplete_blockers[0].id, 2);
        assert_eq!(info.blocking[0].id, 8);
    }

    #[test]
    fn test_dependency_info_without_blockers() {
        let info = DependencyInfo::from_tasks(1, &[], &[]);
        assert!(!info.is_blocked);
        assert!(info.can_complete);
    }

    #[test]
    fn test_newly_unblocked() {
        let completed = task(1, TaskStatus::Todo);
        let other_done = task(2, TaskStatus::Done);
        let other_open = task(3, TaskStatus::Todo);

        let dependents = vec![
            Dependent {
                task: task(10, TaskStatus::Todo),
                blockers: vec![completed.clone(), other_done.clone()],
            },
            Dependent {
                task: task(11, TaskStatus::InProgress),
                blockers: vec![completed.clone(), other_open],
            },
            Dependent {
                task: task(12, TaskStatus::Done),
                blockers: vec![completed.clone()],
            },
            Dependent {
                task: task(13, TaskStatus::Todo),
                blockers: vec![other_done],
            },
            Dependent {
                task: task(9, TaskStatus::Todo),
                blockers: vec![completed],
            },
        ];

        assert_eq!(newly_unblocked(1, &dependents), vec![9, 10]);
    }
}
