//! Test data generators for synthetic ocean-model grids.
//!
//! These generators create predictable, verifiable patterns that can be used
//! across the test suite. All 2D outputs are flattened in row-major order
//! (row 0 first), 3D outputs are `(depth, row, col)`.

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::fixtures::grid::GridSpec;

/// Builds the 1D latitude and longitude axes of a regular grid.
pub fn regular_axes(spec: GridSpec) -> (Vec<f64>, Vec<f64>) {
    let lats = (0..spec.ny)
        .map(|i| spec.lat0 + i as f64 * spec.dlat)
        .collect();
    let lons = (0..spec.nx)
        .map(|j| spec.lon0 + j as f64 * spec.dlon)
        .collect();
    (lats, lons)
}

/// Expands 1D axes into flattened 2D latitude and longitude arrays.
///
/// # Example
///
/// ```
/// use test_utils::mesh_grid;
///
/// let (lat, lon) = mesh_grid(&[0.0, 1.0], &[10.0, 11.0, 12.0]);
/// assert_eq!(lat, vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
/// assert_eq!(lon, vec![10.0, 11.0, 12.0, 10.0, 11.0, 12.0]);
/// ```
pub fn mesh_grid(lats: &[f64], lons: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let mut lat2d = Vec::with_capacity(lats.len() * lons.len());
    let mut lon2d = Vec::with_capacity(lats.len() * lons.len());
    for &lat in lats {
        for &lon in lons {
            lat2d.push(lat);
            lon2d.push(lon);
        }
    }
    (lat2d, lon2d)
}

/// Creates a regular grid as flattened 2D latitude/longitude arrays.
pub fn create_regular_grid(spec: GridSpec) -> (Vec<f64>, Vec<f64>) {
    let (lats, lons) = regular_axes(spec);
    mesh_grid(&lats, &lons)
}

/// Creates a curvilinear grid by rotating a regular grid about its centre.
///
/// The result has no constant-latitude rows, which exercises code paths that
/// must not assume a rectilinear layout.
pub fn create_rotated_grid(spec: GridSpec, rotation_deg: f64) -> (Vec<f64>, Vec<f64>) {
    let (lat, lon) = create_regular_grid(spec);
    let c_lat = spec.lat0 + spec.dlat * (spec.ny as f64 - 1.0) / 2.0;
    let c_lon = spec.lon0 + spec.dlon * (spec.nx as f64 - 1.0) / 2.0;
    let (s, c) = rotation_deg.to_radians().sin_cos();

    lat.iter()
        .zip(lon.iter())
        .map(|(&la, &lo)| {
            let dy = la - c_lat;
            let dx = lo - c_lon;
            (c_lat + dx * s + dy * c, c_lon + dx * c - dy * s)
        })
        .unzip()
}

/// Creates values where each cell equals its flat index: `row * nx + col`.
///
/// # Example
///
/// ```
/// use test_utils::create_indexed_values;
///
/// let values = create_indexed_values(4, 4);
/// assert_eq!(values[1 * 4 + 2], 6.0);
/// ```
pub fn create_indexed_values(ny: usize, nx: usize) -> Vec<f32> {
    (0..ny * nx).map(|i| i as f32).collect()
}

/// Creates a smooth temperature-like field in degrees Celsius.
///
/// Warm in the south, cooling northwards, with a gentle zonal wave.
pub fn create_temperature_field(lat: &[f64], lon: &[f64]) -> Vec<f32> {
    lat.iter()
        .zip(lon.iter())
        .map(|(&la, &lo)| (25.0 - 0.4 * la + 2.0 * lo.to_radians().sin()) as f32)
        .collect()
}

/// Creates a layered `(depth, row, col)` slab with a bathymetry mask.
///
/// Level `k` holds `base + k` at every wet cell. `bottom_levels[row * nx + col]`
/// is the number of wet levels in that column; deeper cells are invalid.
///
/// Returns `(values, valid)` with invalid cells set to NaN.
pub fn create_layered_slab(
    nz: usize,
    ny: usize,
    nx: usize,
    base: f32,
    bottom_levels: &[usize],
) -> (Vec<f32>, Vec<bool>) {
    assert_eq!(bottom_levels.len(), ny * nx, "one bottom level per column");

    let mut values = Vec::with_capacity(nz * ny * nx);
    let mut valid = Vec::with_capacity(nz * ny * nx);
    for k in 0..nz {
        for cell in 0..ny * nx {
            let wet = k < bottom_levels[cell];
            valid.push(wet);
            values.push(if wet { base + k as f32 } else { f32::NAN });
        }
    }
    (values, valid)
}

/// Creates a strictly increasing, evenly spaced time axis.
pub fn create_time_axis(start: DateTime<Utc>, step: Duration, count: usize) -> Vec<DateTime<Utc>> {
    (0..count).map(|i| start + step * i as i32).collect()
}

/// Midnight UTC on 2024-01-01, the default start for generated axes.
pub fn epoch_2024() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}
