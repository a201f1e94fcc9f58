//! Wire codec and correlation table benchmarks.

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use muxrpc_client::PendingCallTable;
use muxrpc_protocol::{CallFrame, Decoder, Encoder, IdGenerator, ResultFrame};

fn bench_call_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("call_encode");

    for size in [100, 1000, 10000] {
        let frame = CallFrame::new(42, "bench.operation", Bytes::from("x".repeat(size)));

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &frame, |b, frame| {
            b.iter(|| black_box(frame.encode().unwrap()));
        });
    }

    group.finish();
}

fn bench_call_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("call_decode");

    for size in [100, 1000, 10000] {
        let encoded = CallFrame::new(42, "bench.operation", Bytes::from("x".repeat(size)))
            .encode()
            .unwrap()
            .freeze();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &encoded, |b, encoded| {
            b.iter(|| black_box(CallFrame::decode(encoded).unwrap()));
        });
    }

    group.finish();
}

fn bench_result_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("result_roundtrip");

    let ok = ResultFrame::ok(7, Bytes::from("x".repeat(1000)));
    group.bench_function("ok", |b| {
        b.iter(|| {
            let encoded = ok.encode().unwrap().freeze();
            black_box(ResultFrame::decode(&encoded).unwrap())
        });
    });

    let err = ResultFrame::err(7, "handler not found for operation 'bench'");
    group.bench_function("error", |b| {
        b.iter(|| {
            let encoded = err.encode().unwrap().freeze();
            black_box(ResultFrame::decode(&encoded).unwrap())
        });
    });

    group.finish();
}

fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("envelope");

    for size in [100, 10000] {
        let frame = vec![0x42u8; size];
        let envelope = Encoder::encode_envelope(&frame).unwrap();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("encode", size), &frame, |b, frame| {
            b.iter(|| black_box(Encoder::encode_envelope(frame).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("decode", size), &envelope, |b, envelope| {
            b.iter(|| {
                let mut decoder = Decoder::new();
                decoder.extend(envelope);
                black_box(decoder.decode_envelope().unwrap())
            });
        });
    }

    group.finish();
}

fn bench_pending_table(c: &mut Criterion) {
    let mut group = c.benchmark_group("pending_table");
    let table = PendingCallTable::new();
    let ids = IdGenerator::new();

    group.throughput(Throughput::Elements(1));
    group.bench_function("register_deliver", |b| {
        b.iter(|| {
            let id = ids.next_id();
            let rx = table.register(id).unwrap();
            table.deliver(id, Ok(ResultFrame::ok(id, Bytes::new())));
            black_box(rx)
        });
    });

    group.bench_function("drain_100", |b| {
        b.iter(|| {
            let receivers: Vec<_> = (0..100)
                .map(|_| table.register(ids.next_id()).unwrap())
                .collect();
            let drained = table.drain_all();
            table.reopen();
            black_box((drained, receivers))
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_call_encode,
    bench_call_decode,
    bench_result_roundtrip,
    bench_envelope,
    bench_pending_table,
);

criterion_main!(benches);
