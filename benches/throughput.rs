//! Throughput Benchmark for sqlrelay
//!
//! This benchmark measures the request path outside the network:
//! classification, framing, and execution against a real store.

use bytes::BytesMut;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use sqlrelay::commands::{classify, CommandHandler};
use sqlrelay::protocol::{encode_frame, parse_frame};
use sqlrelay::storage::{init_schema, Store, StoreConfig};
use std::sync::Arc;

fn create_handler() -> (tempfile::TempDir, CommandHandler) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(Store::new(StoreConfig::new(dir.path().join("bench.db"))));
    init_schema(&store).expect("schema");
    (dir, CommandHandler::new(store))
}

/// Benchmark classification of typical statements
fn bench_classify(c: &mut Criterion) {
    let commands = [
        "SELECT username FROM users",
        "  insert into users (username, password) values ('a', 'b')",
        "DELETE FROM users WHERE username = 'nobody'",
        "PRAGMA journal_mode",
    ];

    let mut group = c.benchmark_group("classify");
    group.throughput(Throughput::Elements(commands.len() as u64));

    group.bench_function("mixed", |b| {
        b.iter(|| {
            for cmd in &commands {
                black_box(classify(black_box(cmd)));
            }
        });
    });

    group.finish();
}

/// Benchmark frame parsing and encoding
fn bench_framing(c: &mut Criterion) {
    let mut group = c.benchmark_group("framing");
    group.throughput(Throughput::Elements(1));

    let message = format!("SELECT * FROM users WHERE username = '{}'\0", "x".repeat(256));

    group.bench_function("parse", |b| {
        b.iter(|| {
            let mut buf = BytesMut::from(message.as_bytes());
            black_box(parse_frame(&mut buf));
        });
    });

    let rows: String = (0..100).map(|i| format!("|('user{}', 'pw')", i)).collect();
    let response = format!("SUCCESS{}", rows);

    group.bench_function("encode_100_rows", |b| {
        b.iter(|| black_box(encode_frame(black_box(&response))));
    });

    group.finish();
}

/// Benchmark full executor round trips (open, run, close per request)
fn bench_execute(c: &mut Criterion) {
    let (_dir, handler) = create_handler();

    for i in 0..100 {
        handler.execute(&format!(
            "INSERT INTO users (username, password) VALUES ('seed{}', 'pw')",
            i
        ));
    }

    let mut group = c.benchmark_group("execute");
    group.throughput(Throughput::Elements(1));

    group.bench_function("insert", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let cmd = format!(
                "INSERT INTO users (username, password) VALUES ('user{}', 'pw')",
                i
            );
            black_box(handler.execute(&cmd));
            i += 1;
        });
    });

    group.bench_function("select_one", |b| {
        b.iter(|| {
            black_box(handler.execute("SELECT username FROM users WHERE username = 'seed42'"));
        });
    });

    group.bench_function("select_100", |b| {
        b.iter(|| {
            black_box(handler.execute("SELECT username, password FROM users LIMIT 100"));
        });
    });

    group.bench_function("unknown", |b| {
        b.iter(|| black_box(handler.execute("VACUUM")));
    });

    group.finish();
}

criterion_group!(benches, bench_classify, bench_framing, bench_execute);
criterion_main!(benches);
