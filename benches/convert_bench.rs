use criterion::{black_box, criterion_group, criterion_main, Criterion};

use cartograph::{array, dictionary, Decode, Encode, Map, TryEncode};

#[derive(Debug, Decode, TryEncode)]
struct Reading {
    sensor: String,
    at: i64,
    values: Vec<f64>,
    note: Option<String>,
}

fn sample() -> Map {
    let readings: Vec<Map> = (0..64i64)
        .map(|i| {
            dictionary! {
                "sensor" => format!("s{}", i % 8),
                "at" => 1_700_000_000i64 + i,
                "values" => array![0.25, 0.5, 0.75, 1.0],
            }
        })
        .collect();
    Map::Array(readings)
}

fn decode_bench(c: &mut Criterion) {
    let input = sample();
    c.bench_function("decode_readings", |b| {
        b.iter(|| black_box(Vec::<Reading>::decode(&input).unwrap()))
    });
}

fn try_encode_bench(c: &mut Criterion) {
    let readings = Vec::<Reading>::decode(&sample()).unwrap();
    c.bench_function("try_encode_readings", |b| {
        b.iter(|| black_box(readings.try_encode().unwrap()))
    });
}

fn encode_bench(c: &mut Criterion) {
    let values: Vec<Vec<i64>> = (0..64).map(|i| (i..i + 16).collect()).collect();
    c.bench_function("encode_nested_ints", |b| b.iter(|| black_box(values.encode())));
}

criterion_group! {
    name = convert_benches;
    config = Criterion::default();
    targets = decode_bench, try_encode_bench, encode_bench
}

criterion_main!(convert_benches);
