//! End-to-end client-service benchmarks.

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use muxrpc_client::{Client, ClientOptions};
use muxrpc_protocol::{BoxError, CallContext};
use muxrpc_server::{Config, Listener, Service, ServiceOptions};
use muxrpc_transport::{Connection, MemoryConnection, TcpConfig, TcpConnection};
use std::sync::Arc;
use tokio::runtime::Runtime;

fn echo_service() -> Service<Bytes, Bytes> {
    let service = Service::new(
        |_ctx, body: &[u8]| Ok(Bytes::copy_from_slice(body)),
        |_ctx, resp: &Bytes| Ok(resp.clone()),
        ServiceOptions::new(),
    );
    service
        .register("echo", |_ctx: &CallContext, req: Bytes| -> Result<Bytes, BoxError> {
            Ok(req)
        })
        .unwrap();
    service
}

fn bytes_client(conn: Arc<dyn Connection>) -> Client<Bytes, Bytes> {
    Client::new(
        conn,
        |_ctx, req: &Bytes| Ok(req.clone()),
        |_ctx, body: &[u8]| Ok(Bytes::copy_from_slice(body)),
        ClientOptions::new(),
    )
}

fn memory_client(rt: &Runtime) -> Client<Bytes, Bytes> {
    let (client_end, server_end) = MemoryConnection::pair();
    let service = echo_service();
    service.serve(&*server_end);
    let client = bytes_client(client_end.clone());

    rt.block_on(async {
        server_end.connect().unwrap();
        client_end.connect().unwrap();
    });
    client
}

fn tcp_client(rt: &Runtime) -> (Service<Bytes, Bytes>, Client<Bytes, Bytes>) {
    let service = echo_service();
    let client = rt.block_on(async {
        let mut config = Config::default();
        config.network.bind_addr = "127.0.0.1:0".parse().unwrap();
        let listener = Listener::bind(config).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let running = service.clone();
        tokio::spawn(async move {
            let _ = listener.run(&running).await;
        });

        let conn = TcpConnection::new(TcpConfig::new(addr));
        let client = bytes_client(conn.clone());
        conn.connect().await.unwrap();
        client
    });
    (service, client)
}

fn bench_echo_latency(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let memory = memory_client(&rt);
    let (_service, tcp) = tcp_client(&rt);
    let body = Bytes::from("x".repeat(100));

    let mut group = c.benchmark_group("e2e_echo");
    group.throughput(Throughput::Elements(1));

    group.bench_function("memory", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(memory.invoke("echo", &body).await.unwrap()) });
    });

    group.bench_function("tcp", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(tcp.invoke("echo", &body).await.unwrap()) });
    });

    group.finish();
}

fn bench_concurrent_calls(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let (_service, client) = tcp_client(&rt);
    let body = Bytes::from_static(b"ping");

    let mut group = c.benchmark_group("e2e_concurrent");
    group.sample_size(20);

    for concurrency in [1, 10, 50] {
        group.throughput(Throughput::Elements(concurrency as u64));
        group.bench_with_input(
            BenchmarkId::new("echo", concurrency),
            &concurrency,
            |b, &conc| {
                b.to_async(&rt).iter(|| {
                    let client = &client;
                    let body = &body;
                    async move {
                        let calls: Vec<_> = (0..conc).map(|_| client.invoke("echo", body)).collect();
                        black_box(futures::future::join_all(calls).await)
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_echo_latency, bench_concurrent_calls);

criterion_main!(benches);
