//! # Weft Mesh Benchmarks
//!
//! | Group | Measures |
//! |-------|----------|
//! | correlation-table | admit + remove under a partly filled table |
//! | payload-codec | JSON vs MessagePack for a small record |
//! | request-round-trip | emitter -> handler over inproc, direct and via a router |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;
use shared_bus::Context;
use shared_types::{Encoding, NodeConfig};
use std::time::Duration;
use weft_request::{CorrelationTable, PendingRequest};
use weft_router::{Router, RouterConfig};
use weft_tests::fixtures::{echo_handler, emitter_to};

// ============================================================================
// Correlation table
// ============================================================================

fn bench_correlation_table(c: &mut Criterion) {
    let mut group = c.benchmark_group("correlation-table");

    for preload in [0usize, 1_000, 100_000] {
        let table = CorrelationTable::new(200_000, 6, 10);
        for _ in 0..preload {
            let _ = table.admit(|id| PendingRequest::unbound(id, "preload"));
        }
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("admit_remove", preload), &table, |b, table| {
            b.iter(|| {
                if let Ok(id) = table.admit(|id| PendingRequest::unbound(id, "bench")) {
                    black_box(table.remove(&id));
                }
            })
        });
    }

    group.finish();
}

// ============================================================================
// Payload codec
// ============================================================================

fn bench_payload_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("payload-codec");
    let record = json!({
        "key": "inventory",
        "value": {"items": [1, 2, 3, 4, 5], "owner": "weft", "active": true},
    });

    for encoding in [Encoding::Json, Encoding::MsgPack] {
        let Ok(bytes) = encoding.encode(&record) else {
            continue;
        };
        group.bench_function(BenchmarkId::new("encode", encoding), |b| {
            b.iter(|| black_box(encoding.encode(&record)))
        });
        group.bench_function(BenchmarkId::new("decode", encoding), |b| {
            b.iter(|| black_box(encoding.decode::<serde_json::Value>(&bytes)))
        });
    }

    group.finish();
}

// ============================================================================
// Round trips
// ============================================================================

fn bench_round_trips(c: &mut Criterion) {
    let Ok(rt) = tokio::runtime::Runtime::new() else {
        return;
    };
    let _guard = rt.enter();
    let mut group = c.benchmark_group("request-round-trip");
    group.measurement_time(Duration::from_secs(5));
    let payload = json!({"answer": 42});

    let ctx = Context::new();
    let direct = echo_handler(&ctx);
    let _ = direct.listen("inproc://bench-direct");
    let emitter = emitter_to(&ctx, "inproc://bench-direct", NodeConfig::default());
    group.bench_function("direct", |b| {
        b.iter(|| black_box(rt.block_on(emitter.request("echo", &payload))))
    });

    let Ok(router) = Router::new(&ctx, RouterConfig::default()) else {
        return;
    };
    let _ = router.listen_for_consumers("inproc://bench-front");
    let _ = router.listen_for_services("svc", "inproc://bench-svc");
    let backend = echo_handler(&ctx);
    let _ = backend.connect("inproc://bench-svc");
    let routed = emitter_to(&ctx, "inproc://bench-front", NodeConfig::default());
    group.bench_function("via_router", |b| {
        b.iter(|| black_box(rt.block_on(routed.request("svc::echo", &payload))))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_correlation_table,
    bench_payload_codec,
    bench_round_trips,
);

criterion_main!(benches);
