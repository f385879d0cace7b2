//! Rule resolution benchmarks
//!
//! Measures how long a logging filter takes to pick the level for a request
//! as the rule table grows.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use http::Method;
use httpfilter::{LoggingFilterSettings, RequestLoggingSettings, RuleSettings, Severity};

fn settings_with(rules: usize) -> RequestLoggingSettings {
    let mut declared = vec![
        RuleSettings::new("GET", "/_bulk").level(Severity::Info),
        RuleSettings::new("POST", "/_search").level(Severity::Info).log_body(true),
        RuleSettings::new("*", "/_cluster/*").level(Severity::Debug),
    ];
    for i in 0..rules {
        declared.push(RuleSettings::new("PUT", format!("/index-{i}/_doc")).level(Severity::Warn));
    }
    let settings = LoggingFilterSettings {
        level: Severity::Trace,
        rules: declared,
        ..LoggingFilterSettings::default()
    };
    RequestLoggingSettings::from_settings(&settings).unwrap()
}

fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("rule_resolution");

    for rules in [0, 16, 256] {
        let settings = settings_with(rules);

        group.bench_with_input(BenchmarkId::new("scoped_bulk", rules), &settings, |b, s| {
            b.iter(|| s.logging_level(black_box(&Method::GET), black_box("/logs-2024/_bulk")))
        });

        group.bench_with_input(BenchmarkId::new("prefix_any_method", rules), &settings, |b, s| {
            b.iter(|| s.logging_level(black_box(&Method::HEAD), black_box("/_cluster/health")))
        });

        group.bench_with_input(BenchmarkId::new("default_rule", rules), &settings, |b, s| {
            b.iter(|| s.logging_level(black_box(&Method::DELETE), black_box("/idx/_doc/1")))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_resolution);
criterion_main!(benches);
