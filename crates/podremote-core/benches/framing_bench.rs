//! Criterion benchmarks for the line framer and command parser.
//!
//! Run with:
//! ```bash
//! cargo bench --package podremote-core --bench framing_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use podremote_core::{Command, LineFramer};

fn session_bytes(lines: usize) -> Vec<u8> {
    let commands = ["ping\n", "volume up\n", "say hola mundo\n", "left\r\n", "status\n"];
    commands
        .iter()
        .cycle()
        .take(lines)
        .flat_map(|c| c.as_bytes().iter().copied())
        .collect()
}

fn bench_frame_and_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_and_parse");
    for chunk_size in [1usize, 16, 1024] {
        let bytes = session_bytes(1000);
        group.bench_with_input(
            BenchmarkId::from_parameter(chunk_size),
            &chunk_size,
            |b, &chunk_size| {
                b.iter(|| {
                    let mut framer = LineFramer::default();
                    let mut parsed = 0usize;
                    for chunk in bytes.chunks(chunk_size) {
                        framer.push(black_box(chunk));
                        while let Some(frame) = framer.next_frame() {
                            if let podremote_core::Frame::Line { text, .. } = frame {
                                if Command::parse(&text).is_ok() {
                                    parsed += 1;
                                }
                            }
                        }
                    }
                    black_box(parsed)
                });
            },
        );
    }
    group.finish();
}

fn bench_oversized_discard(c: &mut Criterion) {
    let garbage = vec![b'x'; 64 * 1024];
    c.bench_function("discard_64k_without_newline", |b| {
        b.iter(|| {
            let mut framer = LineFramer::default();
            for chunk in garbage.chunks(1024) {
                framer.push(black_box(chunk));
            }
            framer.push(b"\n");
            black_box(framer.next_frame())
        });
    });
}

criterion_group!(benches, bench_frame_and_parse, bench_oversized_discard);
criterion_main!(benches);
