use criterion::{Criterion, black_box, criterion_group, criterion_main};
use glam::{Mat4, Vec3};
use strata_lod::*;
use strata_terrain::{
    HeightRaster, HeightmapParams, HeightmapSampler, TerrainDimension, synthesize_raster,
};

fn terrain(size: u32) -> CdlodTree {
    let sampler = HeightmapSampler::new(HeightmapParams::default());
    let raster = synthesize_raster(&sampler, size, size).unwrap();
    let dim = TerrainDimension::new(Vec3::ZERO, Vec3::new(size as f32, 200.0, size as f32));
    CdlodTree::build(raster, dim, CdlodSettings::default()).unwrap()
}

fn camera(position: Vec3, target: Vec3) -> CameraState {
    let view = Mat4::look_at_rh(position, target, Vec3::Y);
    let proj = Mat4::perspective_rh(60f32.to_radians(), 16.0 / 9.0, 1.0, 4000.0);
    CameraState {
        position,
        view_projection: proj * view,
        near: 1.0,
        far: 4000.0,
    }
}

fn bench_build_1k(c: &mut Criterion) {
    let raster = HeightRaster::from_fn(1024, 1024, |x, y| ((x ^ y) & 0xff) as u8).unwrap();
    let dim = TerrainDimension::new(Vec3::ZERO, Vec3::new(1024.0, 200.0, 1024.0));
    c.bench_function("quadtree_build_1024", |bencher| {
        bencher.iter(|| {
            black_box(
                CdlodTree::build(raster.clone(), dim, CdlodSettings::default()).unwrap(),
            )
        })
    });
}

fn bench_select_overview(c: &mut Criterion) {
    let tree = terrain(1024);
    let cam = camera(Vec3::new(-200.0, 600.0, -200.0), Vec3::new(512.0, 0.0, 512.0));
    let mut selection = LodSelection::new(tree.settings());
    c.bench_function("select_overview", |bencher| {
        bencher.iter(|| {
            selection.select(&tree, black_box(&cam), None);
            black_box(selection.selected().len())
        })
    });
}

fn bench_select_ground_level(c: &mut Criterion) {
    let tree = terrain(1024);
    let cam = camera(Vec3::new(512.0, 50.0, 512.0), Vec3::new(900.0, 40.0, 700.0));
    let mut selection = LodSelection::new(tree.settings()).with_sort_by_distance(true);
    c.bench_function("select_ground_level_sorted", |bencher| {
        bencher.iter(|| {
            selection.select(&tree, black_box(&cam), None);
            black_box(selection.selected().len())
        })
    });
}

criterion_group!(
    benches,
    bench_build_1k,
    bench_select_overview,
    bench_select_ground_level
);
criterion_main!(benches);
