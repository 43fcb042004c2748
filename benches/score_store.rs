//! Score store 自增热路径基准测试

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

use clickwar::scoreboard::{MemoryScoreStore, ScoreStore};

/// 单线程热点国家自增吞吐量
fn bench_increment_hot_country(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = MemoryScoreStore::new();

    c.bench_function("increment/hot_country", |b| {
        b.iter(|| {
            rt.block_on(store.increment("US", "United States", 1))
                .unwrap();
        });
    });
}

/// 单线程轮询多个国家
fn bench_increment_many_countries(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = MemoryScoreStore::new();
    let codes: Vec<String> = (0..200)
        .map(|i| {
            let a = (b'A' + (i / 26) as u8) as char;
            let b = (b'A' + (i % 26) as u8) as char;
            format!("{}{}", a, b)
        })
        .collect();
    let mut idx = 0;

    c.bench_function("increment/many_countries", |b| {
        b.iter(|| {
            let code = &codes[idx % codes.len()];
            rt.block_on(store.increment(code, code, 1)).unwrap();
            idx += 1;
        });
    });
}

/// 多任务并发自增吞吐量
fn bench_concurrent_increment(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("increment/concurrent");

    for num_tasks in [2, 4, 8, 16] {
        group.throughput(Throughput::Elements(1000));
        group.bench_with_input(
            BenchmarkId::new("tasks", num_tasks),
            &num_tasks,
            |b, &num_tasks| {
                b.iter(|| {
                    let store = Arc::new(MemoryScoreStore::new());
                    rt.block_on(async {
                        let mut handles = vec![];
                        for _ in 0..num_tasks {
                            let store = Arc::clone(&store);
                            handles.push(tokio::spawn(async move {
                                for _ in 0..(1000 / num_tasks) {
                                    store.increment("US", "United States", 1).await.unwrap();
                                }
                            }));
                        }
                        for handle in handles {
                            handle.await.unwrap();
                        }
                    });
                });
            },
        );
    }
    group.finish();
}

/// 聚合排序（get_all）开销随国家数的变化
fn bench_get_all(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("get_all");

    for num_countries in [10usize, 100, 250] {
        let store = MemoryScoreStore::new();
        rt.block_on(async {
            for i in 0..num_countries {
                let a = (b'A' + (i / 26) as u8) as char;
                let b = (b'A' + (i % 26) as u8) as char;
                let code = format!("{}{}", a, b);
                store.increment(&code, &code, (i as u64) + 1).await.unwrap();
            }
        });

        group.bench_with_input(
            BenchmarkId::new("countries", num_countries),
            &store,
            |b, store| {
                b.iter(|| {
                    rt.block_on(store.get_all()).unwrap();
                });
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_increment_hot_country,
    bench_increment_many_countries,
    bench_concurrent_increment,
    bench_get_all
);
criterion_main!(benches);
