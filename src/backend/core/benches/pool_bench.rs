//! Benchmarks for object pool fetch/remand throughput
//!
//! Run with: cargo bench --bench pool_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lazy_pattern_core::pool::{ObjectPool, PoolConfig, Recyclable};
use std::sync::Arc;

#[derive(Default)]
struct Buffer {
    bytes: Vec<u8>,
}

impl Recyclable for Buffer {
    type Args = usize;

    fn initialize(&mut self, len: usize) {
        self.bytes.resize(len, 0);
    }

    fn reset(&mut self) {
        self.bytes.clear();
    }
}

fn bench_fetch_remand(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let pool = ObjectPool::new(
        PoolConfig::from_fn(Buffer::default)
            .with_max_live(4)
            .with_min_warm(4),
    )
    .unwrap();
    rt.block_on(async { pool.prewarm().await.unwrap() });

    c.bench_function("fetch_remand_warm", |b| {
        b.iter(|| {
            rt.block_on(async {
                let mut buffer = pool.fetch().await.unwrap();
                buffer.initialize(64);
                black_box(buffer.bytes.len());
                pool.remand(buffer).unwrap();
            });
        });
    });
}

fn bench_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended_fetch");
    let rt = tokio::runtime::Runtime::new().unwrap();

    for tasks in [8, 32] {
        group.throughput(Throughput::Elements(tasks as u64));
        group.bench_with_input(BenchmarkId::from_parameter(tasks), &tasks, |b, &tasks| {
            let config = PoolConfig::from_fn(Buffer::default)
                .with_max_live(4)
                .with_min_warm(0);
            let pool = Arc::new(ObjectPool::new(config).unwrap());
            b.iter(|| {
                rt.block_on(async {
                    let handles: Vec<_> = (0..tasks)
                        .map(|_| {
                            let pool = pool.clone();
                            tokio::spawn(async move {
                                let mut buffer = pool.fetch().await.unwrap();
                                buffer.initialize(16);
                                tokio::task::yield_now().await;
                            })
                        })
                        .collect();
                    for handle in handles {
                        handle.await.unwrap();
                    }
                });
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_fetch_remand, bench_contended);
criterion_main!(benches);
