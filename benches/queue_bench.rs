//! Benchmarks for the blocking queues and the worker pool.
//!
//! Covers:
//! - Priority queue push/drain throughput
//! - FIFO queue push/drain throughput
//! - End-to-end pool fan-out latency

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

use workshard::builders::ThreadPoolBuilder;
use workshard::{ConcurrentPriorityQueue, ConcurrentQueue, SyncPoint};

fn bench_priority_queue(c: &mut Criterion) {
    let mut group = c.benchmark_group("priority_queue");
    for size in [64_u64, 512, 4096] {
        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::new("push_drain", size), &size, |b, &n| {
            b.iter(|| {
                let queue = ConcurrentPriorityQueue::new();
                for value in 0..n {
                    queue.push(black_box(value));
                }
                while queue.poll_timeout(Duration::ZERO).is_some() {}
            });
        });
    }
    group.finish();
}

fn bench_fifo_queue(c: &mut Criterion) {
    let mut group = c.benchmark_group("fifo_queue");
    for size in [64_u64, 512, 4096] {
        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::new("push_drain", size), &size, |b, &n| {
            b.iter(|| {
                let queue = ConcurrentQueue::new();
                for value in 0..n {
                    queue.push(black_box(value));
                }
                while queue.poll_timeout(Duration::ZERO).is_some() {}
            });
        });
    }
    group.finish();
}

fn bench_pool_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("thread_pool");
    group.throughput(Throughput::Elements(100));
    group.bench_function("fanout_100_tasks", |b| {
        b.iter(|| {
            let pool = ThreadPoolBuilder::named("bench")
                .with_worker_count(4)
                .with_max_tasks_per_worker(64)
                .with_max_idle(Duration::from_millis(500))
                .build()
                .unwrap();
            pool.start().unwrap();

            let done = Arc::new(SyncPoint::new(4));
            for _ in 0..100 {
                let done = Arc::clone(&done);
                pool.submit(move || {
                    done.add_flag(1);
                })
                .unwrap();
            }
            done.wait_flag(100);
            pool.stop();
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_priority_queue,
    bench_fifo_queue,
    bench_pool_fanout
);
criterion_main!(benches);
