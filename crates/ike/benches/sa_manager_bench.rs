//! IKE_SA manager benchmarks
//!
//! Checkout/checkin round trips, uncontended and with several threads
//! hammering a shared table.
//!
//! Run with: `cargo bench -p fynx-ike --bench sa_manager_bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fynx_ike::ikev2::IkeHeader;
use fynx_ike::{IkeSaId, IkeSaManager, ManagerConfig};
use std::sync::Arc;
use std::thread;

/// Manager pre-filled with `count` checked-in SAs
fn filled_manager(count: usize) -> (Arc<IkeSaManager>, Vec<IkeSaId>) {
    let manager = Arc::new(IkeSaManager::new(ManagerConfig::default()));
    let ids = (0..count)
        .map(|_| {
            let sa = manager.create_and_checkout().unwrap();
            let id = sa.id();
            manager.checkin(sa).unwrap();
            id
        })
        .collect();
    (manager, ids)
}

fn bench_checkout_checkin(c: &mut Criterion) {
    let mut group = c.benchmark_group("checkout_checkin");
    group.throughput(Throughput::Elements(1));

    for size in [1usize, 1_000, 10_000] {
        let (manager, ids) = filled_manager(size);
        let id = ids[size / 2];
        group.bench_with_input(BenchmarkId::from_parameter(size), &id, |b, id| {
            b.iter(|| {
                let sa = manager.checkout(black_box(id)).unwrap().into_inner();
                manager.checkin(sa).unwrap();
            });
        });
    }

    group.finish();
}

fn bench_create_delete(c: &mut Criterion) {
    let (manager, _) = filled_manager(1_000);

    c.bench_function("create_and_delete", |b| {
        b.iter(|| {
            let sa = manager.create_and_checkout().unwrap();
            manager.checkin_and_delete(black_box(sa)).unwrap();
        });
    });
}

fn bench_contended(c: &mut Criterion) {
    const THREADS: usize = 4;
    const ROUNDS: usize = 1_000;

    let mut group = c.benchmark_group("contended");
    group.throughput(Throughput::Elements((THREADS * ROUNDS) as u64));

    group.bench_function("same_sa", |b| {
        let (manager, ids) = filled_manager(1);
        let id = ids[0];
        b.iter(|| {
            thread::scope(|s| {
                for _ in 0..THREADS {
                    s.spawn(|| {
                        for _ in 0..ROUNDS {
                            let sa = manager.checkout(&id).unwrap().into_inner();
                            manager.checkin(sa).unwrap();
                        }
                    });
                }
            });
        });
    });

    group.bench_function("distinct_sas", |b| {
        let (manager, ids) = filled_manager(THREADS);
        b.iter(|| {
            thread::scope(|s| {
                for id in &ids {
                    let manager = &manager;
                    s.spawn(move || {
                        for _ in 0..ROUNDS {
                            let sa = manager.checkout(id).unwrap().into_inner();
                            manager.checkin(sa).unwrap();
                        }
                    });
                }
            });
        });
    });

    group.finish();
}

fn bench_header_lookup(c: &mut Criterion) {
    let (manager, ids) = filled_manager(1_000);
    let header = IkeHeader::new(
        ids[0].initiator_spi(),
        0,
        fynx_ike::ikev2::ExchangeType::IkeSaInit,
        fynx_ike::ikev2::IkeFlags::response(false),
        0,
        28,
    )
    .to_bytes();

    c.bench_function("parse_header_and_checkout", |b| {
        b.iter(|| {
            let header = IkeHeader::from_bytes(black_box(&header)).unwrap();
            let id = IkeSaId::from_header(&header);
            let sa = manager.checkout(&id).unwrap().into_inner();
            manager.checkin(sa).unwrap();
        });
    });
}

criterion_group!(
    benches,
    bench_checkout_checkin,
    bench_create_delete,
    bench_contended,
    bench_header_lookup,
);

criterion_main!(benches);
