use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use snapvault::engine::SnapshotEngine;
use snapvault::store::Store;
use snapvault::Technique;

/// Fixture generator for realistic directory trees
mod fixtures {
    use super::*;

    /// Create a tree with `file_count` files of `file_size` bytes spread over
    /// a few subdirectories.
    pub fn create_tree(base: &Path, file_count: usize, file_size: usize) -> std::io::Result<()> {
        let payload: Vec<u8> = (0..file_size).map(|i| (i % 251) as u8).collect();

        for i in 0..file_count {
            let dir = base.join(format!("dir-{}", i % 4));
            fs::create_dir_all(&dir)?;
            fs::write(dir.join(format!("file-{i}.bin")), &payload)?;
        }
        Ok(())
    }
}

fn bench_take_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("take_snapshot");

    for &file_size in &[16 * 1024, 512 * 1024] {
        let source = TempDir::new().unwrap();
        fixtures::create_tree(source.path(), 32, file_size).unwrap();

        group.bench_with_input(
            BenchmarkId::new("whole_file", file_size),
            &file_size,
            |b, _| {
                b.iter(|| {
                    let env = TempDir::new().unwrap();
                    let store = Store::open_at(&env.path().join("bench.db")).unwrap();
                    let engine =
                        SnapshotEngine::new(store, Technique::WholeFile, 1024 * 1024).unwrap();
                    black_box(engine.take_snapshot(source.path()).unwrap());
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("chunked_64k", file_size),
            &file_size,
            |b, _| {
                b.iter(|| {
                    let env = TempDir::new().unwrap();
                    let store = Store::open_at(&env.path().join("bench.db")).unwrap();
                    let engine =
                        SnapshotEngine::new(store, Technique::Chunked, 64 * 1024).unwrap();
                    black_box(engine.take_snapshot(source.path()).unwrap());
                });
            },
        );
    }

    group.finish();
}

fn bench_restore_snapshot(c: &mut Criterion) {
    let source = TempDir::new().unwrap();
    fixtures::create_tree(source.path(), 32, 128 * 1024).unwrap();

    let env = TempDir::new().unwrap();
    let store = Store::open_at(&env.path().join("bench.db")).unwrap();
    let engine = SnapshotEngine::new(store, Technique::Chunked, 64 * 1024).unwrap();
    let id = engine.take_snapshot(source.path()).unwrap();

    c.bench_function("restore_snapshot_chunked", |b| {
        b.iter(|| {
            let out = TempDir::new().unwrap();
            engine.restore_snapshot(id, out.path()).unwrap();
            black_box(out);
        });
    });
}

criterion_group!(benches, bench_take_snapshot, bench_restore_snapshot);
criterion_main!(benches);
