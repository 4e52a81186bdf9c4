use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use aurora_core::handler::ReceiveOptions;
use aurora_core::keyed_mutex::KeyedMutex;
use aurora_core::Agent;

use serde_json::{json, Value};
use tokio::runtime::Runtime;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .unwrap()
}

fn bench_uncontended_lock_release(c: &mut Criterion) {
    let rt = runtime();
    let locks: KeyedMutex<u64> = KeyedMutex::new();

    c.bench_function("keyed_lock_release_cycle", |b| {
        b.to_async(&rt).iter(|| async {
            let guard = locks.lock(black_box(7)).await;
            drop(guard);
        })
    });
}

fn bench_contended_keys(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("keyed_lock_contention");

    // Same number of acquisitions spread over a varying number of keys.
    for key_count in [1u64, 16, 256] {
        group.bench_with_input(
            BenchmarkId::new("keys", key_count),
            &key_count,
            |b, &keys| {
                b.to_async(&rt).iter(|| async move {
                    let locks: KeyedMutex<u64> = KeyedMutex::new();
                    let tasks: Vec<_> = (0..256u64)
                        .map(|i| {
                            let locks = locks.clone();
                            tokio::spawn(async move {
                                let _guard = locks.lock(i % keys).await;
                                tokio::task::yield_now().await;
                            })
                        })
                        .collect();
                    for task in tasks {
                        task.await.unwrap();
                    }
                    black_box(locks.len())
                })
            },
        );
    }

    group.finish();
}

fn bench_agent_deliver(c: &mut Criterion) {
    let rt = runtime();
    let agent: Agent<Value, ()> = Agent::new(Some("bench"));
    let _handler = agent
        .mutex_receive(
            "player/move",
            ReceiveOptions::new().key_by("player"),
            |_payload: Value| async { Ok::<_, String>(()) },
        )
        .unwrap();
    agent.start();

    c.bench_function("agent_deliver_no_sequence", |b| {
        b.to_async(&rt).iter(|| async {
            let outcome = agent
                .deliver("player/move", json!({"player": "p1", "x": 1}))
                .await
                .unwrap();
            black_box(outcome)
        })
    });
}

criterion_group!(
    benches,
    bench_uncontended_lock_release,
    bench_contended_keys,
    bench_agent_deliver
);
criterion_main!(benches);
