use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use torpack::compression::{compress, decompress, Algorithm};

const CORPUS_LEN: usize = 1 << 18;

/// Inputs with different redundancy: prose, a smooth greyscale image and noise.
fn corpus() -> Vec<(&'static str, Vec<u8>)> {
    let prose = b"It is a truth universally acknowledged, that a single man in possession \
                  of a good fortune, must be in want of a wife. "
        .iter()
        .copied()
        .cycle()
        .take(CORPUS_LEN)
        .collect();

    let mut rng = StdRng::seed_from_u64(0x5EED);
    let width = 512;
    let gradient = (0..CORPUS_LEN)
        .map(|i| {
            let (x, y) = (i % width, i / width);
            ((x + y) / 4) as u8 ^ (rng.gen::<u8>() & 0x03)
        })
        .collect();

    let mut noise = vec![0u8; CORPUS_LEN];
    rng.fill(&mut noise[..]);

    vec![("prose", prose), ("gradient", gradient), ("noise", noise)]
}

fn bench_compress(c: &mut Criterion) {
    let mut group = c.benchmark_group("compress");
    for (name, data) in corpus() {
        group.throughput(Throughput::Bytes(data.len() as u64));
        for algorithm in Algorithm::ALL {
            let blob = compress(&data, algorithm).expect("compression failed");
            eprintln!(
                "{}/{}: {} -> {} bytes ({:.2}% gain)",
                algorithm,
                name,
                data.len(),
                blob.serialized_len(),
                blob.compression_rate()
            );
            let id = BenchmarkId::new(algorithm.name(), name);
            group.bench_with_input(id, &data, |b, data| {
                b.iter(|| compress(black_box(data), algorithm).expect("compression failed"))
            });
        }
    }
    group.finish();
}

fn bench_decompress(c: &mut Criterion) {
    let mut group = c.benchmark_group("decompress");
    for (name, data) in corpus() {
        group.throughput(Throughput::Bytes(data.len() as u64));
        for algorithm in Algorithm::ALL {
            let blob = compress(&data, algorithm).expect("compression failed");
            let id = BenchmarkId::new(algorithm.name(), name);
            group.bench_with_input(id, &blob, |b, blob| {
                b.iter(|| decompress(black_box(blob)).expect("decompression failed"))
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_compress, bench_decompress);
criterion_main!(benches);
