//! Performance benchmarks for a3s-observability
//!
//! Run with: cargo bench

use a3s_observability::mapper::{extract_token_usage, map_generation, map_span};
use a3s_observability::policy::calculate_cost;
use a3s_observability::{
    Config, GenerationObservation, LangfuseProvider, MemoryClient, ObservabilityProvider,
    SpanObservation,
};
use criterion::{criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

fn sample_generation(session: Uuid) -> GenerationObservation {
    GenerationObservation::new("gen-bench", session)
        .with_model("gpt-4")
        .with_provider("openai")
        .with_tokens(1200, 350)
        .with_finish_reason("stop")
        .with_prompt_content("Summarize last quarter's revenue by region")
        .with_duration(Duration::from_millis(850))
        .with_attribute("input_price_per_1m", 10.0)
        .with_attribute("output_price_per_1m", 30.0)
        .with_attribute("cache_read_tokens", 400)
}

fn bench_mapping(c: &mut Criterion) {
    let gen = sample_generation(Uuid::new_v4());
    let span = SpanObservation::new("span-bench", Uuid::new_v4(), "sql_execute")
        .with_span_type("tool")
        .with_input("SELECT 1")
        .with_output("1 row")
        .with_duration(Duration::from_millis(12));

    c.bench_function("map_generation", |b| b.iter(|| map_generation(&gen)));
    c.bench_function("map_span", |b| b.iter(|| map_span(&span)));
    c.bench_function("extract_token_usage", |b| b.iter(|| extract_token_usage(&gen)));
    c.bench_function("calculate_cost", |b| b.iter(|| calculate_cost(&gen)));
}

fn bench_record_generation(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let provider = LangfuseProvider::new(
        Arc::new(MemoryClient::new()),
        Config::new("pk-lf-bench", "sk-lf-bench"),
    )
    .unwrap();
    let session = Uuid::new_v4();

    c.bench_function("record_generation (existing trace)", |b| {
        b.to_async(&rt).iter(|| async {
            provider
                .record_generation(sample_generation(session))
                .await
                .unwrap()
        });
    });
}

fn bench_record_throughput(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    let mut group = c.benchmark_group("record_throughput");
    for count in [10, 100, 1000] {
        group.bench_function(format!("{} spans", count), |b| {
            b.to_async(&rt).iter(|| async {
                let provider = LangfuseProvider::new(
                    Arc::new(MemoryClient::new()),
                    Config::new("pk-lf-bench", "sk-lf-bench"),
                )
                .unwrap();
                let session = Uuid::new_v4();
                for i in 0..count {
                    provider
                        .record_span(SpanObservation::new(format!("span-{}", i), session, "step"))
                        .await
                        .unwrap();
                }
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_mapping,
    bench_record_generation,
    bench_record_throughput,
);
criterion_main!(benches);
