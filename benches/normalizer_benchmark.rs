use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use travel_provider_core::error::Provider;
use travel_provider_core::normalizer::ErrorNormalizer;

// Normalizing every provider error envelope shape
pub fn normalizer_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("error_normalizer");

    let long_detail = "x".repeat(4096);
    let problem_list = format!(
        r#"{{"errors":[{{"status":400,"code":477,"title":"INVALID FORMAT","detail":"{}","source":{{"parameter":"departureDate"}}}}]}}"#,
        long_detail
    );
    let bodies = [
        (
            "problem_list",
            Provider::Amadeus,
            400u16,
            r#"{"errors":[{"status":400,"code":477,"title":"INVALID FORMAT","detail":"departureDate must be in the future"}]}"#.to_string(),
        ),
        ("problem_list_large", Provider::Amadeus, 400, problem_list),
        (
            "coded",
            Provider::Hotelbeds,
            400,
            r#"{"error":{"code":"INVALID_REQUEST","message":"Invalid stay dates"}}"#.to_string(),
        ),
        ("plain", Provider::Hotelbeds, 403, r#"{"error":"Access denied"}"#.to_string()),
        (
            "unrecognized_html",
            Provider::Iata,
            502,
            "<html><body>Bad Gateway</body></html>".to_string(),
        ),
        ("empty", Provider::Amadeus, 503, String::new()),
    ];

    for (name, provider, status, body) in bodies.iter() {
        group.bench_with_input(BenchmarkId::from_parameter(name), body, |b, body| {
            b.iter(|| black_box(ErrorNormalizer::normalize(*provider, *status, black_box(body))))
        });
    }

    group.finish();
}

criterion_group!(benches, normalizer_benchmark);
criterion_main!(benches);
