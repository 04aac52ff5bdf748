use rand::Rng;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use hrpt::{
    bits::BitSequence,
    framing::{DerandomizationTable, Derandomizer, SyncMarker, Synchronizer, Thresholds, ASM, CADU_LEN},
    manchester,
    unpack::unpack_samples,
};

fn random_bytes(len: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| rng.gen()).collect()
}

fn bench_synchronization(c: &mut Criterion) {
    let mut data = random_bytes(100 * CADU_LEN);
    for frame in data.chunks_mut(CADU_LEN) {
        frame[..4].copy_from_slice(&ASM);
    }
    let bits = BitSequence::from_bytes(data.clone());
    let thresholds = Thresholds {
        unlocked: 0,
        soft_lock: 2,
        resync: 6,
        hard_lock: 12,
    };

    let mut group = c.benchmark_group("synchronize");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("locked", |b| {
        b.iter(|| {
            let sync = Synchronizer::new(SyncMarker::new(&ASM, CADU_LEN), thresholds);
            assert_eq!(sync.run(&bits).len(), 100);
        });
    });
    let noise = BitSequence::from_bytes(random_bytes(16 * CADU_LEN));
    group.throughput(Throughput::Bytes(16 * CADU_LEN as u64));
    group.bench_function("unlocked", |b| {
        b.iter(|| {
            let sync = Synchronizer::new(SyncMarker::new(&ASM, CADU_LEN), thresholds);
            let _ = sync.run(&noise);
        });
    });
    group.finish();
}

// Pn decode a random slice of data.
fn bench_derandomize(c: &mut Criterion) {
    let buf = random_bytes(1020);

    let mut group = c.benchmark_group("derandomize");
    group.throughput(Throughput::Bytes(buf.len() as u64));
    group.bench_function("table", |b| {
        let pn = DerandomizationTable::new();
        b.iter(|| {
            let _ = pn.derandomize(&buf, 4);
        });
    });
    group.finish();
}

fn bench_unpack(c: &mut Criterion) {
    let buf = random_bytes(12800);
    let raw = random_bytes(2 * CADU_LEN);

    let mut group = c.benchmark_group("unpack");
    group.throughput(Throughput::Bytes(buf.len() as u64));
    group.bench_function("samples10", |b| {
        b.iter(|| {
            let _ = unpack_samples(&buf, 10240);
        });
    });
    group.throughput(Throughput::Bytes(raw.len() as u64));
    group.bench_function("manchester", |b| {
        b.iter(|| {
            let _ = manchester::decode(&raw);
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_derandomize,
    bench_synchronization,
    bench_unpack,
);
criterion_main!(benches);
