//! Distance-weighted resampling of source cells onto target points.
//!
//! A [`Resampler`] resolves neighbours once and can then be applied to any
//! number of levels or timesteps sharing the same source window. Weights are
//! computed in `f64` whatever the native element type.

mod fill;

pub use fill::fill_invalid_shift;

use num_traits::Float;
use ocean_common::query::InterpolationParams;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::bbox::IndexWindow;
use crate::error::{ResampleError, Result};
use crate::spatial_index::{Neighbour, SpatialIndex};
use crate::types::{GridCoordinates, MaskedArray};

/// Distances below this (meters) are clamped so coincident points keep a finite weight.
const MIN_DISTANCE_M: f64 = 1e-3;

/// Extra candidates looked up per target beyond the contributing count.
pub const SPARE_CANDIDATES: usize = 8;

/// Resampling method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResampleMethod {
    /// Weights `1 / d²` over the k nearest cells.
    #[default]
    InverseSquare,
    /// Weights `1 / d` over the 4 nearest cells.
    Bilinear,
    /// Value of the single nearest cell.
    Nearest,
}

impl ResampleMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InverseSquare => "inverse_square",
            Self::Bilinear => "bilinear",
            Self::Nearest => "nearest",
        }
    }
}

impl FromStr for ResampleMethod {
    type Err = ResampleError;

    /// Parse from string (case-insensitive).
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "inverse_square" | "inverse-square" | "inversesquare" => Ok(Self::InverseSquare),
            "bilinear" => Ok(Self::Bilinear),
            "nearest" | "nearest_neighbour" | "nearest_neighbor" => Ok(Self::Nearest),
            _ => Err(ResampleError::UnknownMethod(s.to_string())),
        }
    }
}

impl std::fmt::Display for ResampleMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How to resample: method, neighbour count and radius of influence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResampleRequest {
    pub method: ResampleMethod,
    pub neighbours: usize,
    /// Cells further than this (meters) never contribute.
    pub radius_of_influence: f64,
}

impl ResampleRequest {
    pub fn new(method: ResampleMethod, neighbours: usize, radius_of_influence: f64) -> Result<Self> {
        if !(radius_of_influence > 0.0) || !radius_of_influence.is_finite() {
            return Err(ResampleError::InvalidRequest(format!(
                "radius of influence must be positive, got {}",
                radius_of_influence
            )));
        }
        Ok(Self {
            method,
            neighbours,
            radius_of_influence,
        })
    }

    /// Neighbour count actually used by the method.
    pub fn effective_neighbours(&self) -> usize {
        match self.method {
            ResampleMethod::Bilinear => 4,
            ResampleMethod::Nearest => 1,
            ResampleMethod::InverseSquare => self.neighbours.max(1),
        }
    }

    /// Cells to look up per target: the contributing count plus spares that
    /// stand in for masked cells.
    pub fn candidate_count(&self) -> usize {
        self.effective_neighbours() + SPARE_CANDIDATES
    }
}

impl Default for ResampleRequest {
    fn default() -> Self {
        Self {
            method: ResampleMethod::InverseSquare,
            neighbours: ocean_common::query::DEFAULT_NEIGHBOURS,
            radius_of_influence: ocean_common::query::DEFAULT_RADIUS_M,
        }
    }
}

impl TryFrom<&InterpolationParams> for ResampleRequest {
    type Error = ResampleError;

    fn try_from(params: &InterpolationParams) -> Result<Self> {
        Self::new(params.method.parse()?, params.neighbours, params.radius_m)
    }
}

/// Precomputed neighbour weights from a source window onto target points.
#[derive(Debug, Clone)]
pub struct Resampler {
    request: ResampleRequest,
    /// Per target: `(window-local index, distance)` of contributing cells, closest first.
    neighbours: Vec<Vec<(usize, f64)>>,
    source_shape: (usize, usize),
}

impl Resampler {
    /// Resampler over the whole source grid.
    pub fn new(index: &SpatialIndex, lats: &[f64], lons: &[f64], request: ResampleRequest) -> Self {
        let neighbours = index.query(lats, lons, request.candidate_count());
        Self::from_neighbours(index, &neighbours, &IndexWindow::full(index.shape()), request)
    }

    /// Resampler over a window, from an existing neighbour query.
    ///
    /// Neighbours outside the window or the radius of influence are dropped.
    /// Query with [`ResampleRequest::candidate_count`] so masked cells can be
    /// skipped in favour of the next closest valid ones.
    pub fn from_neighbours(
        index: &SpatialIndex,
        neighbours: &[Vec<Neighbour>],
        window: &IndexWindow,
        request: ResampleRequest,
    ) -> Self {
        let neighbours = neighbours
            .iter()
            .map(|found| {
                found
                    .iter()
                    .filter(|n| n.distance_m <= request.radius_of_influence)
                    .filter_map(|n| {
                        let (row, col) = index.unravel(n.flat_index);
                        window.local_index(row, col).map(|local| (local, n.distance_m))
                    })
                    .collect()
            })
            .collect();

        Self {
            request,
            neighbours,
            source_shape: window.shape(),
        }
    }

    /// Number of target points.
    pub fn len(&self) -> usize {
        self.neighbours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbours.is_empty()
    }

    /// Shape `(rows, cols)` the source data must have.
    pub fn source_shape(&self) -> (usize, usize) {
        self.source_shape
    }

    pub fn request(&self) -> &ResampleRequest {
        &self.request
    }

    /// Resample one 2D field onto the targets. Output shape is `[targets]`.
    pub fn resample<T: Float>(&self, data: &MaskedArray<T>) -> Result<MaskedArray<T>> {
        let expected = self.source_shape.0 * self.source_shape.1;
        if data.len() != expected {
            return Err(ResampleError::shape_mismatch(self.source_shape, data.shape()));
        }

        let mut out = MaskedArray::masked(vec![self.len()]);
        for (i, found) in self.neighbours.iter().enumerate() {
            out.set(i, self.resample_point(data, found));
        }
        Ok(out)
    }

    /// Resample every level of a `(depth, rows, cols)` slab. Output shape is `[depth, targets]`.
    pub fn resample_levels<T: Float>(&self, slab: &MaskedArray<T>) -> Result<MaskedArray<T>> {
        if slab.ndim() != 3 {
            return Err(ResampleError::shape_mismatch("(depth, rows, cols)", slab.shape()));
        }
        let levels = (0..slab.shape()[0])
            .map(|k| self.resample(&slab.level(k)?))
            .collect::<Result<Vec<_>>>()?;
        if levels.is_empty() {
            return Ok(MaskedArray::masked(vec![0, self.len()]));
        }
        MaskedArray::stack(&levels)
    }

    fn resample_point<T: Float>(&self, data: &MaskedArray<T>, found: &[(usize, f64)]) -> Option<T> {
        // closest valid cells first; masked cells never count towards k
        let mut valid = found
            .iter()
            .filter_map(|&(cell, d)| data.get(cell).map(|v| (v, d)))
            .take(self.request.effective_neighbours());

        if self.request.method == ResampleMethod::Nearest {
            return valid.next().map(|(v, _)| v);
        }

        let max = self.request.radius_of_influence;
        let mut weighted = 0.0;
        let mut total = 0.0;
        for (value, d) in valid {
            let Some(value) = value.to_f64() else {
                continue;
            };
            let d = d.clamp(MIN_DISTANCE_M, max.max(MIN_DISTANCE_M));
            let w = match self.request.method {
                ResampleMethod::Bilinear => 1.0 / d,
                _ => 1.0 / (d * d),
            };
            weighted += w * value;
            total += w;
        }

        if total > 0.0 {
            T::from(weighted / total)
        } else {
            None
        }
    }
}

/// Resample a field from source coordinates onto target points.
///
/// Builds a throwaway spatial index; use [`Resampler`] with a cached index
/// when sampling the same grid repeatedly.
pub fn resample<T: Float>(
    source: &GridCoordinates,
    target_lats: &[f64],
    target_lons: &[f64],
    data: &MaskedArray<T>,
    request: ResampleRequest,
) -> Result<MaskedArray<T>> {
    let (ny, nx) = source.shape();
    if data.shape() != [ny, nx] {
        return Err(ResampleError::shape_mismatch((ny, nx), data.shape()));
    }
    if target_lats.len() != target_lons.len() {
        return Err(ResampleError::shape_mismatch(target_lats.len(), target_lons.len()));
    }
    let index = SpatialIndex::build(source);
    Resampler::new(&index, target_lats, target_lons, request).resample(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_grid() -> (GridCoordinates, MaskedArray<f32>) {
        let coords = GridCoordinates::from_axes(&[0.0, 1.0, 2.0, 3.0], &[0.0, 1.0, 2.0, 3.0]);
        let data = MaskedArray::from_values((0..16).map(|i| i as f32).collect(), vec![4, 4]).unwrap();
        (coords, data)
    }

    fn request(method: ResampleMethod, neighbours: usize, radius: f64) -> ResampleRequest {
        ResampleRequest::new(method, neighbours, radius).unwrap()
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("nearest".parse::<ResampleMethod>().unwrap(), ResampleMethod::Nearest);
        assert_eq!("BILINEAR".parse::<ResampleMethod>().unwrap(), ResampleMethod::Bilinear);
        assert_eq!(
            "inverse_square".parse::<ResampleMethod>().unwrap(),
            ResampleMethod::InverseSquare
        );
        assert!(matches!(
            "cubic".parse::<ResampleMethod>(),
            Err(ResampleError::UnknownMethod(_))
        ));
        assert_eq!(ResampleMethod::Bilinear.to_string(), "bilinear");
    }

    #[test]
    fn test_effective_neighbours() {
        assert_eq!(request(ResampleMethod::Bilinear, 9, 1.0).effective_neighbours(), 4);
        assert_eq!(request(ResampleMethod::Nearest, 9, 1.0).effective_neighbours(), 1);
        assert_eq!(request(ResampleMethod::InverseSquare, 0, 1.0).effective_neighbours(), 1);
        assert_eq!(
            request(ResampleMethod::Nearest, 9, 1.0).candidate_count(),
            1 + SPARE_CANDIDATES
        );
        assert!(ResampleRequest::new(ResampleMethod::Nearest, 1, 0.0).is_err());
        assert!(ResampleRequest::new(ResampleMethod::Nearest, 1, f64::NAN).is_err());
    }

    #[test]
    fn test_request_from_params() {
        let params = InterpolationParams {
            method: "bilinear".to_string(),
            neighbours: 3,
            radius_m: 1000.0,
        };
        let req = ResampleRequest::try_from(&params).unwrap();
        assert_eq!(req.method, ResampleMethod::Bilinear);

        let bad = InterpolationParams {
            method: "spline".to_string(),
            ..params
        };
        assert!(ResampleRequest::try_from(&bad).is_err());
    }

    #[test]
    fn test_nearest_on_exact_points_is_identity() {
        let (coords, data) = unit_grid();
        let out = resample(
            &coords,
            coords.latitudes(),
            coords.longitudes(),
            &data,
            request(ResampleMethod::Nearest, 1, 1e6),
        )
        .unwrap();
        assert_eq!(out.to_options(), data.to_options());
    }

    #[test]
    fn test_inverse_square_at_cell_centre() {
        let (coords, data) = unit_grid();
        let out = resample(
            &coords,
            &[1.5],
            &[1.5],
            &data,
            request(ResampleMethod::InverseSquare, 4, 1e6),
        )
        .unwrap();
        let v = out.get(0).unwrap();
        assert!(v > 5.0 && v < 10.0, "got {}", v);
    }

    #[test]
    fn test_beyond_radius_is_masked() {
        let (coords, data) = unit_grid();
        let out = resample(
            &coords,
            &[20.0],
            &[20.0],
            &data,
            request(ResampleMethod::InverseSquare, 8, 25_000.0),
        )
        .unwrap();
        assert_eq!(out.get(0), None);
    }

    #[test]
    fn test_masked_sources_are_skipped() {
        let (coords, data) = unit_grid();
        let mut data = data;
        data.set(5, None);
        let near = resample(
            &coords,
            &[1.0],
            &[1.0],
            &data,
            request(ResampleMethod::Nearest, 1, 1e6),
        )
        .unwrap();
        // the next closest valid cell stands in
        assert!([1.0, 4.0, 6.0, 9.0].contains(&near.get(0).unwrap()));

        let weighted = resample(
            &coords,
            &[1.0],
            &[1.0],
            &data,
            request(ResampleMethod::InverseSquare, 4, 1e6),
        )
        .unwrap();
        assert!(weighted.get(0).is_some());
    }

    #[test]
    fn test_masked_nearest_falls_back_to_next_valid_cell() {
        let (coords, mut data) = unit_grid();
        data.set(5, None);
        // (1.0, 1.1) sits on cell 5; cell 6 is ~100 km east
        for method in [ResampleMethod::Nearest, ResampleMethod::InverseSquare] {
            let out = resample(&coords, &[1.0], &[1.1], &data, request(method, 1, 500_000.0))
                .unwrap();
            assert_eq!(out.get(0), Some(6.0), "{}", method);
        }

        // nothing valid within the radius still masks
        let out = resample(
            &coords,
            &[1.0],
            &[1.1],
            &data,
            request(ResampleMethod::Nearest, 1, 50_000.0),
        )
        .unwrap();
        assert_eq!(out.get(0), None);
    }

    #[test]
    fn test_shape_mismatch() {
        let (coords, _) = unit_grid();
        let data = MaskedArray::from_values(vec![0.0f32; 12], vec![3, 4]).unwrap();
        let err = resample(&coords, &[0.0], &[0.0], &data, ResampleRequest::default());
        assert!(matches!(err, Err(ResampleError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_windowed_matches_full() {
        let (coords, data) = unit_grid();
        let index = SpatialIndex::build(&coords);
        let req = request(ResampleMethod::InverseSquare, 4, 1e6);
        let (lats, lons) = ([1.2, 1.7], [1.4, 2.1]);

        let full = Resampler::new(&index, &lats, &lons, req).resample(&data).unwrap();

        let found = index.query(&lats, &lons, req.candidate_count());
        let window = crate::bbox::window_for_neighbours(&found, &index, 0.0);
        let resampler = Resampler::from_neighbours(&index, &found, &window, req);
        let sub = data_window(&data, &window);
        let windowed = resampler.resample(&sub).unwrap();

        for i in 0..2 {
            let (a, b) = (full.get(i).unwrap(), windowed.get(i).unwrap());
            assert!((a - b).abs() < 1e-6);
        }
    }

    fn data_window(data: &MaskedArray<f32>, window: &IndexWindow) -> MaskedArray<f32> {
        let cols = window.column_indices();
        let cells: Vec<Option<f32>> = window
            .rows()
            .flat_map(|r| cols.iter().map(move |&c| (r, c)))
            .map(|(r, c)| data.get_nd(&[r, c]))
            .collect();
        let (nr, nc) = window.shape();
        MaskedArray::from_options(&cells, vec![nr, nc]).unwrap()
    }

    #[test]
    fn test_resample_levels() {
        let (coords, _) = unit_grid();
        let index = SpatialIndex::build(&coords);
        let slab: Vec<f32> = (0..32).map(|i| (i / 16) as f32).collect();
        let slab = MaskedArray::from_values(slab, vec![2, 4, 4]).unwrap();
        let resampler = Resampler::new(
            &index,
            &[0.5, 2.5],
            &[0.5, 2.5],
            request(ResampleMethod::Bilinear, 4, 1e6),
        );
        let out = resampler.resample_levels(&slab).unwrap();
        assert_eq!(out.shape(), &[2, 2]);
        assert!((out.get_nd(&[1, 1]).unwrap() - 1.0).abs() < 1e-6);
    }
}
