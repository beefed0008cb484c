//! Nearest-neighbour index over a model grid on the unit sphere.
//!
//! Each grid cell is projected to a 3D Cartesian point
//! `(cos φ cos λ, cos φ sin λ, sin φ)` and bulk-loaded into an R*-tree.
//! Straight-line (chord) distance in that space is monotonic with
//! great-circle distance, so nearest-neighbour order is exact and the
//! longitude convention of the source grid does not matter.

use ocean_common::geo::{chord_to_meters, to_unit_vector};
use rstar::primitives::GeomWithData;
use rstar::RTree;

use crate::types::GridCoordinates;

type IndexedPoint = GeomWithData<[f64; 3], usize>;

/// A source cell returned from a neighbour query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbour {
    /// Row-major index into the source grid.
    pub flat_index: usize,
    /// Chord distance scaled to meters.
    pub distance_m: f64,
}

/// Immutable spatial index over one grid.
pub struct SpatialIndex {
    tree: RTree<IndexedPoint>,
    shape: (usize, usize),
    periodic_lon: bool,
}

impl SpatialIndex {
    /// Build an index over every cell with finite coordinates.
    pub fn build(coords: &GridCoordinates) -> Self {
        let points: Vec<IndexedPoint> = coords
            .latitudes()
            .iter()
            .zip(coords.longitudes())
            .enumerate()
            .filter(|(_, (lat, lon))| lat.is_finite() && lon.is_finite())
            .map(|(i, (&lat, &lon))| GeomWithData::new(to_unit_vector(lat, lon), i))
            .collect();

        let skipped = coords.len() - points.len();
        if skipped > 0 {
            tracing::debug!(skipped, "Ignoring grid cells with non-finite coordinates");
        }

        Self {
            tree: RTree::bulk_load(points),
            shape: coords.shape(),
            periodic_lon: coords.is_periodic_in_longitude(),
        }
    }

    /// The `k` nearest cells to each target, closest first.
    ///
    /// Returns fewer than `k` neighbours only when the grid itself holds
    /// fewer cells.
    pub fn query(&self, lats: &[f64], lons: &[f64], k: usize) -> Vec<Vec<Neighbour>> {
        lats.iter()
            .zip(lons)
            .map(|(&lat, &lon)| self.nearest_k(lat, lon, k))
            .collect()
    }

    /// The `k` nearest cells to a single point.
    pub fn nearest_k(&self, lat: f64, lon: f64, k: usize) -> Vec<Neighbour> {
        if !lat.is_finite() || !lon.is_finite() {
            return Vec::new();
        }
        let target = to_unit_vector(lat, lon);
        self.tree
            .nearest_neighbor_iter(&target)
            .take(k)
            .map(|p| Neighbour {
                flat_index: p.data,
                distance_m: chord_to_meters(chord(p.geom(), &target)),
            })
            .collect()
    }

    /// The single nearest cell to a point.
    pub fn nearest(&self, lat: f64, lon: f64) -> Option<Neighbour> {
        self.nearest_k(lat, lon, 1).into_iter().next()
    }

    /// Convert a flat index into `(row, col)`.
    pub fn unravel(&self, flat: usize) -> (usize, usize) {
        let nx = self.shape.1.max(1);
        (flat / nx, flat % nx)
    }

    /// Source grid shape as `(ny, nx)`.
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    /// Whether the source grid wraps around in longitude.
    pub fn is_periodic_in_longitude(&self) -> bool {
        self.periodic_lon
    }

    /// Number of indexed cells.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

impl std::fmt::Debug for SpatialIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialIndex")
            .field("shape", &self.shape)
            .field("cells", &self.len())
            .field("periodic_lon", &self.periodic_lon)
            .finish()
    }
}

fn chord(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    (dx * dx + dy * dy + dz * dz).sqrt()
}
