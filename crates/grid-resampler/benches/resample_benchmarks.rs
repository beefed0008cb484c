//! Benchmarks for the grid-resampler crate.
//!
//! Run with: cargo bench --package grid-resampler
//! Or: cargo bench --package grid-resampler --bench resample_benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;

use grid_resampler::bbox::window_for_neighbours;
use grid_resampler::{
    discretize, fill_invalid_shift, DepthAxis, GridCoordinates, MaskedArray, ResampleMethod,
    ResampleRequest, Resampler, SpatialIndex, SpatialIndexCache,
};
use ocean_common::LatLon;
use test_utils::fixtures::grid::{ATLANTIC_QUARTER, GLOBAL_1DEG_360};
use test_utils::fixtures::paths;
use test_utils::{
    create_layered_slab, create_rotated_grid, create_temperature_field, regular_axes,
};

fn atlantic() -> (GridCoordinates, MaskedArray<f32>) {
    let (lat, lon) = create_rotated_grid(ATLANTIC_QUARTER, 25.0);
    let field = create_temperature_field(&lat, &lon);
    let shape = (ATLANTIC_QUARTER.ny, ATLANTIC_QUARTER.nx);
    let coords = GridCoordinates::new(lat, lon, shape).unwrap();
    let data = MaskedArray::from_values(field, vec![shape.0, shape.1]).unwrap();
    (coords, data)
}

fn halifax() -> Vec<LatLon> {
    paths::HALIFAX_LINE.iter().copied().map(LatLon::from).collect()
}

// =============================================================================
// SPATIAL INDEX BENCHMARKS
// =============================================================================

fn bench_index_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_build");
    group.sample_size(20);

    let (coords, _) = atlantic();
    group.throughput(Throughput::Elements(coords.len() as u64));
    group.bench_function("atlantic_quarter_rotated", |b| {
        b.iter(|| SpatialIndex::build(black_box(&coords)))
    });

    let (lats, lons) = regular_axes(GLOBAL_1DEG_360);
    let global = GridCoordinates::from_axes(&lats, &lons);
    group.throughput(Throughput::Elements(global.len() as u64));
    group.bench_function("global_1deg", |b| {
        b.iter(|| SpatialIndex::build(black_box(&global)))
    });

    group.finish();
}

fn bench_index_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_query");

    let (coords, _) = atlantic();
    let index = SpatialIndex::build(&coords);
    let path = discretize(&halifax(), 200).unwrap();

    for k in [1usize, 4, 8] {
        group.throughput(Throughput::Elements(path.len() as u64));
        group.bench_with_input(BenchmarkId::new("halifax_200", k), &k, |b, &k| {
            b.iter(|| index.query(black_box(&path.lats), black_box(&path.lons), k))
        });
    }

    let cache = SpatialIndexCache::new(4);
    cache.insert("atlantic", Arc::new(index));
    group.bench_function("cache_hit", |b| b.iter(|| cache.get(black_box("atlantic"))));

    group.finish();
}

// =============================================================================
// RESAMPLING BENCHMARKS
// =============================================================================

fn bench_resample(c: &mut Criterion) {
    let mut group = c.benchmark_group("resample");

    let (coords, data) = atlantic();
    let index = SpatialIndex::build(&coords);
    let path = discretize(&halifax(), 200).unwrap();
    group.throughput(Throughput::Elements(path.len() as u64));

    for method in [
        ResampleMethod::Nearest,
        ResampleMethod::Bilinear,
        ResampleMethod::InverseSquare,
    ] {
        let request = ResampleRequest::new(method, 8, 50_000.0).unwrap();
        let resampler = Resampler::new(&index, &path.lats, &path.lons, request);
        group.bench_function(BenchmarkId::new("apply", method.as_str()), |b| {
            b.iter(|| resampler.resample(black_box(&data)))
        });
    }

    let request = ResampleRequest::default();
    group.bench_function("neighbours_and_window", |b| {
        b.iter(|| {
            let found = index.query(&path.lats, &path.lons, request.candidate_count());
            let window = window_for_neighbours(&found, &index, 0.25);
            Resampler::from_neighbours(&index, &found, &window, request)
        })
    });

    group.finish();
}

fn bench_fill_down(c: &mut Criterion) {
    let mut group = c.benchmark_group("fill_down");

    let (nz, ny, nx) = (40, 60, 60);
    let bottoms: Vec<usize> = (0..ny * nx).map(|i| (i * 7) % (nz + 1)).collect();
    let (values, valid) = create_layered_slab(nz, ny, nx, 4.0, &bottoms);
    let slab = MaskedArray::new(values, valid, vec![nz, ny, nx]).unwrap();

    group.throughput(Throughput::Elements((nz * ny * nx) as u64));
    group.bench_function("slab_40x60x60", |b| {
        b.iter(|| {
            let mut s = slab.clone();
            fill_invalid_shift(black_box(&mut s), DepthAxis::First)
        })
    });

    group.finish();
}

// =============================================================================
// PATH BENCHMARKS
// =============================================================================

fn bench_discretize(c: &mut Criterion) {
    let mut group = c.benchmark_group("discretize");

    let dog_leg: Vec<LatLon> = paths::DOG_LEG.iter().copied().map(LatLon::from).collect();
    for n in [10usize, 100, 1000] {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("dog_leg", n), &n, |b, &n| {
            b.iter(|| discretize(black_box(&dog_leg), n))
        });
    }

    let equator: Vec<LatLon> = paths::EQUATOR_10.iter().copied().map(LatLon::from).collect();
    group.bench_function("equator_constant_lat_100", |b| {
        b.iter(|| discretize(black_box(&equator), 100))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_index_build,
    bench_index_query,
    bench_resample,
    bench_fill_down,
    bench_discretize,
);
criterion_main!(benches);
