use chrono::{Duration, Utc};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use taskgate::db::models::{Effort, Task, TaskStatus, TaskType};
use taskgate::db::{create_pool, run_migrations};
use taskgate::dependencies::add_dependency;
use taskgate::graph::DependencyGraph;
use taskgate::priority::PriorityCalculator;
use taskgate::tasks::{NewTask, TaskFilter, TaskManager};
use tempfile::TempDir;
use tokio::runtime::Runtime;

async fn setup_test_db() -> (TempDir, sqlx::SqlitePool) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("bench.db");
    let pool = create_pool(&db_path).await.unwrap();
    run_migrations(&pool).await.unwrap();
    (temp_dir, pool)
}

fn sample_task(id: i64) -> Task {
    let now = Utc::now();
    Task {
        id,
        owner: "human".to_string(),
        name: format!("Task {}", id),
        description: None,
        status: TaskStatus::Todo,
        user_priority: (id % 10 + 1) as i32,
        due_date: Some(now + Duration::hours(id % 200)),
        estimated_effort: Some(Effort::Medium),
        bump_count: (id % 7) as i32,
        created_at: now - Duration::days(id % 45),
        completed_at: None,
        task_type: TaskType::Regular,
        parent_task_id: None,
    }
}

/// `0 blocked by 1 blocked by 2 ... blocked by len-1`
fn chain(len: i64) -> DependencyGraph {
    DependencyGraph::from_edges((0..len - 1).map(|i| (i, i + 1)))
}

fn bench_priority_calculate(c: &mut Criterion) {
    let calc = PriorityCalculator::default();
    let tasks: Vec<Task> = (0..1000).map(sample_task).collect();

    c.bench_function("priority_calculate_1000", |b| {
        b.iter(|| {
            for task in &tasks {
                black_box(calc.calculate(black_box(task)));
            }
        });
    });

    c.bench_function("priority_breakdown", |b| {
        let task = sample_task(3);
        b.iter(|| black_box(calc.calculate_with_breakdown(black_box(&task))));
    });
}

fn bench_cycle_detection(c: &mut Criterion) {
    let mut group = c.benchmark_group("cycle_detection");

    for size in [100i64, 1_000, 10_000].iter() {
        let graph = chain(*size);
        group.bench_with_input(BenchmarkId::new("chain_closing_edge", size), size, |b, &size| {
            // Closing edge: last blocked by first
            b.iter(|| black_box(graph.cycle_path(size - 1, 0)));
        });
        group.bench_with_input(BenchmarkId::new("chain_safe_edge", size), size, |b, &size| {
            b.iter(|| black_box(graph.cycle_path(0, size - 1)));
        });
    }

    group.finish();
}

fn bench_task_list(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("task_list");

    for size in [100, 1_000].iter() {
        let (_temp_dir, pool) = rt.block_on(setup_test_db());
        rt.block_on(async {
            let mgr = TaskManager::new(&pool);
            for i in 0..*size {
                mgr.add_task(NewTask {
                    user_priority: Some(i % 10 + 1),
                    ..NewTask::named(format!("Task {}", i))
                })
                .await
                .unwrap();
            }
        });

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.to_async(&rt).iter(|| async {
                let mgr = TaskManager::new(&pool);
                black_box(mgr.list_tasks(&TaskFilter::default()).await.unwrap());
            });
        });
    }

    group.finish();
}

fn bench_add_dependency_chain(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    c.bench_function("add_dependency_chain_50", |b| {
        b.to_async(&rt).iter(|| async {
            let (_temp_dir, pool) = setup_test_db().await;
            let mgr = TaskManager::new(&pool);

            let mut ids = Vec::with_capacity(50);
            for i in 0..50 {
                ids.push(mgr.add_task(NewTask::named(format!("Step {}", i))).await.unwrap().task.id);
            }
            for pair in ids.windows(2) {
                add_dependency(&pool, pair[0], pair[1]).await.unwrap();
            }

            black_box(add_dependency(&pool, ids[49], ids[0]).await.unwrap_err());
        });
    });
}

criterion_group!(
    benches,
    bench_priority_calculate,
    bench_cycle_detection,
    bench_task_list,
    bench_add_dependency_chain
);

criterion_main!(benches);
