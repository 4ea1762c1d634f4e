use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use mcrc_core::framing::{frame_packet, FrameAccumulator};
use mcrc_core::stream::PacketStream;

fn bench_stream(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream");

    for (label, size) in [("64B", 64usize), ("1KB", 1024), ("60KB", 61_440)] {
        let payload = vec![0xABu8; size];
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("put_get", label), &payload, |b, p| {
            let stream = PacketStream::new();
            b.iter(|| {
                stream.try_put_packet(p).unwrap();
                stream.try_get_packet().unwrap()
            });
        });
    }

    group.finish();
}

fn bench_framing(c: &mut Criterion) {
    let mut group = c.benchmark_group("framing");

    for (label, size) in [("64B", 64usize), ("1KB", 1024)] {
        let payload = vec![0xCDu8; size];
        group.throughput(Throughput::Bytes(size as u64));

        let framed = frame_packet(&payload).unwrap();

        group.bench_with_input(BenchmarkId::new("frame", label), &payload, |b, p| {
            b.iter(|| frame_packet(p).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("accumulate", label), &framed, |b, f| {
            b.iter(|| {
                let mut acc = FrameAccumulator::new();
                acc.feed(f)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_stream, bench_framing);
criterion_main!(benches);
