//! Loader benchmarks: row parsing, deduplication and separate loads.
//!
//! Run with: `cargo bench --package strata-query --bench loader_bench`

use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use strata_query::{
    ColumnType, EntitySchema, FilterValue, Loader, LoaderConfig, LoaderOptions, QueryExecutor,
    QueryResult, RelationSpec, Row, SchemaRegistry, SelectQuery,
};

fn schemas() -> Arc<SchemaRegistry> {
    Arc::new(
        SchemaRegistry::new()
            .with(
                EntitySchema::new("user", "users")
                    .column("id", ColumnType::Int)
                    .column("name", ColumnType::String)
                    .primary_key("id")
                    .relation(RelationSpec::one_to_one("profile", "profile").keys("id", "user_id"))
                    .relation(RelationSpec::one_to_many("posts", "post").keys("id", "author_id"))
                    .relation(RelationSpec::one_to_many("tags", "tag").keys("id", "user_id")),
            )
            .with(
                EntitySchema::new("profile", "profiles")
                    .column("id", ColumnType::Int)
                    .column("user_id", ColumnType::Int)
                    .column("bio", ColumnType::String)
                    .primary_key("id"),
            )
            .with(
                EntitySchema::new("post", "posts")
                    .column("id", ColumnType::Int)
                    .column("author_id", ColumnType::Int)
                    .column("title", ColumnType::String)
                    .primary_key("id"),
            )
            .with(
                EntitySchema::new("tag", "tags")
                    .column("user_id", ColumnType::Int)
                    .column("label", ColumnType::String),
            ),
    )
}

/// Returns pre-built rows per table regardless of filters.
struct Canned {
    users: Vec<Row>,
    posts: Vec<Row>,
    tags: Vec<Row>,
}

impl Canned {
    fn new(users: i64, posts_per_user: i64) -> Self {
        let users_rows = (0..users)
            .map(|id| {
                vec![
                    FilterValue::Int(id),
                    FilterValue::String(format!("user {}", id)),
                    FilterValue::Int(id + 1_000_000),
                    FilterValue::Int(id),
                    FilterValue::String("bio".into()),
                ]
            })
            .collect();
        let posts = (0..users * posts_per_user)
            .map(|id| {
                vec![
                    FilterValue::Int(id),
                    FilterValue::Int(id % users),
                    FilterValue::String(format!("post {}", id)),
                ]
            })
            .collect();
        let tags = (0..users * 4)
            .map(|i| {
                vec![
                    FilterValue::Int(i % users),
                    FilterValue::String(format!("tag {}", i % 2)),
                ]
            })
            .collect();
        Self {
            users: users_rows,
            posts,
            tags,
        }
    }
}

impl QueryExecutor for Canned {
    fn fetch(&self, query: &SelectQuery) -> QueryResult<Vec<Row>> {
        Ok(match query.table() {
            "users" => self.users.clone(),
            "posts" => self.posts.clone(),
            _ => self.tags.clone(),
        })
    }
}

// ============================================================================
// Joined Loading
// ============================================================================

fn bench_joined_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("joined_parse");

    for users in [100i64, 1_000, 10_000] {
        let executor = Canned::new(users, 0);
        group.throughput(Throughput::Elements(users as u64));
        group.bench_with_input(BenchmarkId::from_parameter(users), &executor, |b, executor| {
            let mut loader = Loader::new(schemas(), "user").unwrap();
            loader.add_loader("profile", LoaderOptions::new()).unwrap();
            b.iter(|| black_box(loader.load(executor).unwrap()));
        });
    }

    group.finish();
}

// ============================================================================
// Separate Loading
// ============================================================================

fn bench_separate_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("separate_load");

    for batch_size in [10usize, 100, 1_000] {
        let executor = Canned::new(1_000, 5);
        group.bench_with_input(
            BenchmarkId::new("batch_size", batch_size),
            &executor,
            |b, executor| {
                let mut loader = Loader::new(schemas(), "user")
                    .unwrap()
                    .with_config(LoaderConfig::new().batch_size(batch_size));
                loader.add_loader("posts", LoaderOptions::new()).unwrap();
                b.iter(|| black_box(loader.load(executor).unwrap()));
            },
        );
    }

    group.finish();
}

// ============================================================================
// Deduplication
// ============================================================================

fn bench_content_identity(c: &mut Criterion) {
    let mut group = c.benchmark_group("content_identity");
    let executor = Canned::new(1_000, 0);

    for enabled in [true, false] {
        group.bench_with_input(BenchmarkId::from_parameter(enabled), &executor, |b, executor| {
            let mut loader = Loader::new(schemas(), "user")
                .unwrap()
                .with_config(LoaderConfig::new().content_identity(enabled));
            loader.add_loader("tags", LoaderOptions::new()).unwrap();
            b.iter(|| black_box(loader.load(executor).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_joined_parse,
    bench_separate_load,
    bench_content_identity,
);

criterion_main!(benches);
