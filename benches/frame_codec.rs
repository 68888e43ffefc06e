//! Frame codec and identifier benchmarks.
//!
//! Run with: cargo bench --bench frame_codec
//! Results saved to: target/criterion/

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

use sockjs_client::Frame;
use sockjs_client::identifiers::{SESSION_CHARSET, generate};
use sockjs_client::protocol::encode_messages;

// ============================================================================
// Benchmark Parameters
// ============================================================================

const BATCH_SIZES: &[usize] = &[1, 16, 256];
const ID_LENGTHS: &[usize] = &[16, 64, 256];

// ============================================================================
// Helpers
// ============================================================================

fn array_frame(count: usize) -> Vec<u8> {
    let messages: Vec<String> = (0..count).map(|i| format!("message {i}")).collect();
    let payload = encode_messages(&messages).expect("encodable");
    format!("a{payload}\n").into_bytes()
}

// ============================================================================
// Benchmark: Frame Decode
// ============================================================================

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_decode");

    group.bench_function("heartbeat", |b| {
        b.iter(|| Frame::decode(black_box(b"h\n")));
    });

    group.bench_function("close", |b| {
        b.iter(|| Frame::decode(black_box(br#"c[3000,"Go away!"]"#)));
    });

    for &count in BATCH_SIZES {
        let raw = array_frame(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("array", count), &raw, |b, raw| {
            b.iter(|| Frame::decode(black_box(raw)));
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Identifier Generation
// ============================================================================

fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");

    for &len in ID_LENGTHS {
        group.throughput(Throughput::Bytes(len as u64));
        group.bench_with_input(BenchmarkId::new("session_charset", len), &len, |b, &len| {
            b.iter(|| generate(black_box(SESSION_CHARSET), len));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_decode, bench_generate);
criterion_main!(benches);
