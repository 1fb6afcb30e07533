//! 配置处理基准测试
//!
//! 测试INI/JSON解析、值规范化和快照合并的性能

use confwatch::config::normalizer::normalize;
use confwatch::config::parser::{parse_ini, parse_json, ConfigFormat, ParsedConfig};
use confwatch::config::ConfigStore;
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

/// 生成测试用INI内容
fn ini_content(lines: usize) -> String {
    (0..lines)
        .map(|i| match i % 3 {
            0 => format!("KEY_{i} = {i}"),
            1 => format!("KEY_{i} = \"quoted value {i}\""),
            _ => format!("; comment {i}"),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// 生成测试用JSON内容
fn json_content(keys: usize) -> String {
    let object: serde_json::Map<String, serde_json::Value> = (0..keys)
        .map(|i| (format!("KEY_{i}"), serde_json::json!(format!("'value {i}'"))))
        .collect();
    serde_json::Value::Object(object).to_string()
}

/// 配置处理基准测试
fn config_processing_benchmark(c: &mut Criterion) {
    let ini = ini_content(300);
    let json = json_content(200);

    c.bench_function("ini_parsing", |b| {
        b.iter(|| black_box(parse_ini(black_box(&ini)).unwrap()))
    });

    c.bench_function("json_parsing", |b| {
        b.iter(|| black_box(parse_json(black_box(&json)).unwrap()))
    });

    c.bench_function("ini_normalization", |b| {
        let values = parse_ini(&ini).unwrap();
        b.iter(|| {
            let parsed = ParsedConfig {
                format: ConfigFormat::Ini,
                values: values.clone(),
            };
            black_box(normalize(parsed))
        });
    });

    c.bench_function("snapshot_merge", |b| {
        let values = normalize(ParsedConfig {
            format: ConfigFormat::Ini,
            values: parse_ini(&ini).unwrap(),
        });
        let store = ConfigStore::new();
        b.iter(|| black_box(store.merge(&values)));
    });
}

criterion_group!(benches, config_processing_benchmark);
criterion_main!(benches);
