use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion, black_box};
use glam::Vec3;

use terralod::core::{ChunkIndex, TerrainConfig};
use terralod::mesh::{build_mesh, MeshBuffers, Placement};
use terralod::terrain::{
    ChunkGrid, HeightField, SceneSink, TerrainGenerator, TerrainMap, TerrainParams,
};

fn noise_field(size: u32) -> HeightField {
    TerrainGenerator::new(TerrainParams::default())
        .generate(size, size)
        .unwrap()
}

fn bench_build_detail(c: &mut Criterion, name: &str, detail: u32) {
    let field = noise_field(1500);
    let grid = ChunkGrid::new(1500, 1500, 500, Vec3::ZERO).unwrap();
    // Center chunk: padded on all four edges
    let region = *grid.region(4).unwrap();

    c.bench_function(name, |b| {
        b.iter(|| build_mesh(black_box(&region), black_box(detail), black_box(&field)))
    });
}

fn bench_build_detail_0(c: &mut Criterion) {
    bench_build_detail(c, "mesh_build_500_detail_0", 0);
}

fn bench_build_detail_1(c: &mut Criterion) {
    bench_build_detail(c, "mesh_build_500_detail_1", 1);
}

fn bench_build_detail_2(c: &mut Criterion) {
    bench_build_detail(c, "mesh_build_500_detail_2", 2);
}

struct NullSink;

impl SceneSink for NullSink {
    fn attach_mesh(&mut self, _chunk: ChunkIndex, mesh: Arc<MeshBuffers>, _placement: Placement) {
        black_box(mesh);
    }

    fn detach_mesh(&mut self, _chunk: ChunkIndex) {}
}

fn bench_inline_settle(c: &mut Criterion) {
    let field = noise_field(1000);
    let config = TerrainConfig {
        chunk_size: 250,
        use_workers: false,
        ..Default::default()
    };

    c.bench_function("inline_map_settle_1000", |b| {
        b.iter(|| {
            let mut map = TerrainMap::inline(config.clone(), field.clone()).unwrap();
            let viewpoint = Vec3::new(0.0, 800.0, 0.0);
            map.update(&viewpoint, &mut NullSink);
            while !map.is_settled() {
                map.update(&viewpoint, &mut NullSink);
            }
            black_box(map.scheduler_stats().completed)
        });
    });
}

criterion_group!(
    benches,
    bench_build_detail_0,
    bench_build_detail_1,
    bench_build_detail_2,
    bench_inline_settle,
);
criterion_main!(benches);
