//! Thermal Time Series Benchmarks
//!
//! Performance benchmarks for sample ingestion, nearest-neighbour lookup and
//! grid resampling.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use thermal_timeseries::{AggregateFunction, RetentionPolicy, Sample, Stepper, TimeSeries};

fn filled(n: i64) -> TimeSeries<f64> {
    (0..n).map(|i| Sample::new(i * 1000, i as f64)).collect()
}

fn push_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("push");
    group.throughput(Throughput::Elements(10_000));

    group.bench_function("append", |b| {
        b.iter(|| {
            let mut series = TimeSeries::new(RetentionPolicy::new(3000, 100_000));
            for i in 0..10_000i64 {
                series.push(i * 1000, i as f64, 0, true);
            }
            black_box(series.len())
        })
    });

    group.bench_function("near_end_out_of_order", |b| {
        b.iter(|| {
            let mut series = TimeSeries::unbounded();
            for i in 0..10_000i64 {
                let ts = if i % 2 == 0 { i * 1000 } else { i * 1000 - 1500 };
                series.push(ts, i as f64, 0, true);
            }
            black_box(series.len())
        })
    });

    group.finish();
}

fn lookup_benchmark(c: &mut Criterion) {
    let series = filled(100_000);

    c.bench_function("floor_ceiling", |b| {
        let mut ts = 0i64;
        b.iter(|| {
            ts = (ts + 7_919_000) % 100_000_000;
            black_box((series.floor(ts + 500), series.ceiling(ts + 500)))
        })
    });

    c.bench_function("has", |b| {
        let mut ts = 0i64;
        b.iter(|| {
            ts = (ts + 7_919_000) % 100_000_000;
            black_box(series.has(ts))
        })
    });
}

fn resample_benchmark(c: &mut Criterion) {
    let series = filled(100_000);
    let mut group = c.benchmark_group("values");

    for width in [1_000i64, 10_000, 60_000] {
        let step = Stepper::fixed(width);
        group.bench_with_input(BenchmarkId::new("avg", width), &step, |b, step| {
            b.iter(|| {
                black_box(series.values(
                    10_000_000,
                    90_000_000,
                    step,
                    Some(&AggregateFunction::Avg),
                    true,
                ))
            })
        });
    }

    group.finish();
}

criterion_group!(benches, push_benchmark, lookup_benchmark, resample_benchmark);
criterion_main!(benches);
