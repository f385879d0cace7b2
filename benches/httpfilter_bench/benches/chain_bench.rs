//! Filter chain dispatch benchmarks
//!
//! Compares a bare handler with chains that skip logging and chains that log
//! every request into an in-memory sink.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use http::Method;
use httpfilter::{
    default_registry, handler_fn, ChainSettings, FilterHttpServerTransport, FilterSettings,
    IntoResponse, MemoryLogSink, Request, Severity,
};
use serde_json::json;
use std::sync::Arc;

fn transport(logging: Option<serde_json::Value>) -> FilterHttpServerTransport {
    let sink = Arc::new(MemoryLogSink::with_capacity(1 << 20, Severity::Info));
    let mut settings = ChainSettings::new("bench");
    if let Some(serde_json::Value::Object(options)) = logging {
        let mut block = FilterSettings::default();
        block.options = options;
        settings = settings.filter_with("logging", block);
    }
    let handler = handler_fn(|_req: Request| async { "ok".into_response() });
    FilterHttpServerTransport::new(&settings, &default_registry(sink), handler).unwrap()
}

fn bench_dispatch(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let mut group = c.benchmark_group("dispatch");

    let cases = [
        ("no_filters", None),
        ("logging_off", Some(json!({ "level": "off" }))),
        ("below_threshold", Some(json!({ "level": "trace" }))),
        ("logged", Some(json!({ "level": "info" }))),
        ("logged_with_body", Some(json!({ "level": "info", "log_body": true }))),
    ];

    for (name, options) in cases {
        let transport = transport(options);
        group.bench_function(BenchmarkId::from_parameter(name), |b| {
            b.iter(|| {
                runtime.block_on(async {
                    let req = Request::build(Method::POST, "/idx/_search", r#"{"size":0}"#).unwrap();
                    transport.dispatch(req).await
                })
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_dispatch);
criterion_main!(benches);
