//! Benchmarks for metric aggregation and report export
//!
//! Run with: cargo bench

use botwatch::api::{DetectionResult, Prediction};
use botwatch::export::to_csv;
use botwatch::metrics::{detection_log, ConfusionCounts, Metrics};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

fn create_result(count: usize) -> DetectionResult {
    let predictions = (0..count)
        .map(|i| Prediction {
            prediction: (i % 3 == 0) as u8,
            prediction_label: Some(if i % 3 == 0 { "Botnet" } else { "Normal" }.to_string()),
            probability: (i % 100) as f64 / 100.0,
            confidence: 0.5 + (i % 50) as f64 / 100.0,
            actual_label: Some((i % 2) as u8),
            extra: Default::default(),
        })
        .collect();

    DetectionResult {
        total_samples: Some(count as u64),
        predictions,
        ..Default::default()
    }
}

fn bench_metrics(c: &mut Criterion) {
    let mut group = c.benchmark_group("metrics");

    for size in [50, 1000, 10000] {
        let result = create_result(size);

        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("tally_{}", size), |b| {
            b.iter(|| ConfusionCounts::tally(black_box(&result.predictions)))
        });

        group.bench_function(format!("from_result_{}", size), |b| {
            b.iter(|| Metrics::from_result(black_box(&result)))
        });

        group.bench_function(format!("detection_log_{}", size), |b| {
            b.iter(|| detection_log(black_box(&result)))
        });
    }

    group.finish();
}

fn bench_export(c: &mut Criterion) {
    let mut group = c.benchmark_group("export");

    for size in [50, 1000] {
        let result = create_result(size);

        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("csv_{}", size), |b| {
            b.iter(|| to_csv(black_box(&result)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_metrics, bench_export);
criterion_main!(benches);
