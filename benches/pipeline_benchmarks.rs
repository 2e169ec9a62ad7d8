use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use handoff::parallel;
use handoff::prelude::*;
use std::hint::black_box;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn bench_single_consumer(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_consumer");

    for size in [100u32, 1000, 10000].iter() {
        group.throughput(Throughput::Elements(*size as u64));

        for capacity in [1usize, 64, handoff::UNBOUNDED] {
            let label = if capacity == handoff::UNBOUNDED {
                "unbounded".to_string()
            } else {
                format!("cap_{}", capacity)
            };
            group.bench_with_input(BenchmarkId::new(label, size), size, |b, &size| {
                let rt = runtime();
                b.iter(|| {
                    rt.block_on(async {
                        ProducerConsumer::builder()
                            .add_producer(IterProducer::new(0..size))
                            .add_consumer(CountConsumer::new())
                            .buffer_capacity(capacity)
                            .build()
                            .unwrap()
                            .begin()
                            .await
                            .unwrap();
                    })
                });
            });
        }
    }

    group.finish();
}

fn bench_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_out");
    group.throughput(Throughput::Elements(10000));

    for consumers in [1usize, 2, 4, 8].iter() {
        group.bench_with_input(
            BenchmarkId::new("consumers", consumers),
            consumers,
            |b, &consumers| {
                let rt = runtime();
                b.iter(|| {
                    rt.block_on(async {
                        ProducerConsumer::builder()
                            .add_producer(IterProducer::new(0..10000u32))
                            .add_consumers((0..consumers).map(|_| CountConsumer::new()))
                            .buffer_capacity(256)
                            .build()
                            .unwrap()
                            .begin()
                            .await
                            .unwrap();
                    })
                });
            },
        );
    }

    group.finish();
}

fn bench_parallel_for_each(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel_for_each");

    for workers in [1usize, 4, 16].iter() {
        group.bench_with_input(
            BenchmarkId::new("workers", workers),
            workers,
            |b, &workers| {
                let rt = runtime();
                b.iter(|| {
                    rt.block_on(async {
                        let op = operation_from_fn(|x: u64| async move {
                            black_box(x.wrapping_mul(31));
                            Ok::<_, Error>(())
                        });
                        parallel::for_each_with((0..10000u64).collect::<Vec<_>>(), op, workers)
                            .await
                            .unwrap();
                    })
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_single_consumer,
    bench_fan_out,
    bench_parallel_for_each
);
criterion_main!(benches);
