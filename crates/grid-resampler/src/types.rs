//! Core types for grid resampling.

use num_traits::Float;
use ocean_common::geo::normalize_longitude;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::bbox::IndexWindow;
use crate::error::{ResampleError, Result};

/// A flat row-major array with an explicit validity bitmap.
///
/// Invalid ("masked") cells carry no meaningful value; every accessor that
/// reads a value returns `None` for them. Arithmetic helpers propagate
/// invalidity explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedArray<T> {
    values: Vec<T>,
    valid: Vec<bool>,
    shape: Vec<usize>,
}

impl<T: Float> MaskedArray<T> {
    /// Create an array from values, validity and shape.
    ///
    /// Cells flagged valid but holding a non-finite value are masked.
    pub fn new(values: Vec<T>, valid: Vec<bool>, shape: Vec<usize>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if values.len() != expected || valid.len() != expected {
            return Err(ResampleError::shape_mismatch(
                &shape,
                (values.len(), valid.len()),
            ));
        }
        let valid = values
            .iter()
            .zip(valid)
            .map(|(v, ok)| ok && v.is_finite())
            .collect();
        Ok(Self {
            values,
            valid,
            shape,
        })
    }

    /// Create an array treating non-finite values as masked.
    pub fn from_values(values: Vec<T>, shape: Vec<usize>) -> Result<Self> {
        let valid = vec![true; values.len()];
        Self::new(values, valid, shape)
    }

    /// Create an array from optional cells (`None` is masked).
    pub fn from_options(cells: &[Option<T>], shape: Vec<usize>) -> Result<Self> {
        let values = cells.iter().map(|c| c.unwrap_or_else(T::nan)).collect();
        let valid = cells.iter().map(Option::is_some).collect();
        Self::new(values, valid, shape)
    }

    /// An array of the given shape with every cell masked.
    pub fn masked(shape: Vec<usize>) -> Self {
        let len = shape.iter().product();
        Self {
            values: vec![T::nan(); len],
            valid: vec![false; len],
            shape,
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw values, including whatever sits under masked cells.
    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn validity(&self) -> &[bool] {
        &self.valid
    }

    /// Value at a flat index, `None` when masked or out of range.
    pub fn get(&self, flat: usize) -> Option<T> {
        match self.valid.get(flat) {
            Some(true) => Some(self.values[flat]),
            _ => None,
        }
    }

    /// Value at a multi-dimensional index.
    pub fn get_nd(&self, index: &[usize]) -> Option<T> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut flat = 0;
        for (&i, &n) in index.iter().zip(&self.shape) {
            if i >= n {
                return None;
            }
            flat = flat * n + i;
        }
        self.get(flat)
    }

    pub fn is_valid(&self, flat: usize) -> bool {
        self.valid.get(flat).copied().unwrap_or(false)
    }

    /// Set or mask a cell. Non-finite values are stored as masked.
    pub fn set(&mut self, flat: usize, value: Option<T>) {
        match value {
            Some(v) if v.is_finite() => {
                self.values[flat] = v;
                self.valid[flat] = true;
            }
            _ => {
                self.values[flat] = T::nan();
                self.valid[flat] = false;
            }
        }
    }

    pub fn count_valid(&self) -> usize {
        self.valid.iter().filter(|&&v| v).count()
    }

    /// Cells as options, `None` where masked.
    pub fn to_options(&self) -> Vec<Option<T>> {
        (0..self.len()).map(|i| self.get(i)).collect()
    }

    /// Apply a function to every valid cell.
    pub fn map<F: Fn(T) -> T>(&self, f: F) -> Self {
        let cells: Vec<Option<T>> = self.to_options().into_iter().map(|c| c.map(&f)).collect();
        let mut out = Self::masked(self.shape.clone());
        for (i, c) in cells.into_iter().enumerate() {
            out.set(i, c);
        }
        out
    }

    /// Combine two same-shaped arrays cell by cell; masked if either side is.
    pub fn zip_with<F: Fn(T, T) -> T>(&self, other: &Self, f: F) -> Result<Self> {
        if self.shape != other.shape {
            return Err(ResampleError::shape_mismatch(&self.shape, &other.shape));
        }
        let mut out = Self::masked(self.shape.clone());
        for i in 0..self.len() {
            if let (Some(a), Some(b)) = (self.get(i), other.get(i)) {
                out.set(i, Some(f(a, b)));
            }
        }
        Ok(out)
    }

    /// Reinterpret with a new shape of the same size.
    pub fn reshape(mut self, shape: Vec<usize>) -> Result<Self> {
        let len: usize = shape.iter().product();
        if len != self.len() {
            return Err(ResampleError::shape_mismatch(&shape, &self.shape));
        }
        self.shape = shape;
        Ok(self)
    }

    /// Slice along the leading axis, dropping it.
    pub fn level(&self, k: usize) -> Result<Self> {
        let (&nz, rest) = self
            .shape
            .split_first()
            .ok_or_else(|| ResampleError::shape_mismatch("at least 1 dimension", &self.shape))?;
        if k >= nz {
            return Err(ResampleError::DepthOutOfRange { index: k, len: nz });
        }
        let stride: usize = rest.iter().product();
        let range = k * stride..(k + 1) * stride;
        Ok(Self {
            values: self.values[range.clone()].to_vec(),
            valid: self.valid[range].to_vec(),
            shape: rest.to_vec(),
        })
    }

    /// Stack same-shaped arrays along a new leading axis.
    pub fn stack(parts: &[Self]) -> Result<Self> {
        let first = parts
            .first()
            .ok_or_else(|| ResampleError::shape_mismatch("at least one array", 0))?;
        let mut shape = vec![parts.len()];
        shape.extend_from_slice(&first.shape);

        let mut values = Vec::with_capacity(first.len() * parts.len());
        let mut valid = Vec::with_capacity(first.len() * parts.len());
        for part in parts {
            if part.shape != first.shape {
                return Err(ResampleError::shape_mismatch(&first.shape, &part.shape));
            }
            values.extend_from_slice(&part.values);
            valid.extend_from_slice(&part.valid);
        }
        Ok(Self {
            values,
            valid,
            shape,
        })
    }

    /// For a `(depth, rows, cols)` slab, the deepest valid value of each column.
    pub fn deepest_valid(&self) -> Result<Self> {
        if self.ndim() != 3 {
            return Err(ResampleError::shape_mismatch("(depth, rows, cols)", &self.shape));
        }
        let nz = self.shape[0];
        let columns = self.shape[1] * self.shape[2];
        let mut out = Self::masked(self.shape[1..].to_vec());
        for c in 0..columns {
            let bottom = (0..nz).rev().find_map(|k| self.get(k * columns + c));
            out.set(c, bottom);
        }
        Ok(out)
    }

    /// Convert the element type, keeping the mask.
    pub fn cast<U: Float>(&self) -> MaskedArray<U> {
        let values = self
            .values
            .iter()
            .map(|v| U::from(*v).unwrap_or_else(U::nan))
            .collect();
        MaskedArray {
            values,
            valid: self.valid.clone(),
            shape: self.shape.clone(),
        }
    }
}

impl<T: Float + Serialize> Serialize for MaskedArray<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("MaskedArray", 2)?;
        s.serialize_field("shape", &self.shape)?;
        s.serialize_field("values", &self.to_options())?;
        s.end()
    }
}

/// Which axis of a 3D slab is the vertical one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthAxis {
    /// `(depth, y, x)`
    First,
    /// `(y, x, depth)`
    Last,
}

/// Latitude/longitude of every cell of a model grid.
///
/// Stored as flattened 2D arrays of shape `(ny, nx)`; regular grids given as
/// 1D axes are expanded on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct GridCoordinates {
    lat: Vec<f64>,
    lon: Vec<f64>,
    shape: (usize, usize),
}

impl GridCoordinates {
    /// Create from flattened 2D arrays.
    pub fn new(lat: Vec<f64>, lon: Vec<f64>, shape: (usize, usize)) -> Result<Self> {
        let expected = shape.0 * shape.1;
        if lat.len() != expected || lon.len() != expected {
            return Err(ResampleError::shape_mismatch(
                shape,
                (lat.len(), lon.len()),
            ));
        }
        Ok(Self { lat, lon, shape })
    }

    /// Create from 1D latitude and longitude axes.
    pub fn from_axes(lats: &[f64], lons: &[f64]) -> Self {
        let mut lat = Vec::with_capacity(lats.len() * lons.len());
        let mut lon = Vec::with_capacity(lats.len() * lons.len());
        for &la in lats {
            for &lo in lons {
                lat.push(la);
                lon.push(lo);
            }
        }
        Self {
            lat,
            lon,
            shape: (lats.len(), lons.len()),
        }
    }

    /// Grid shape as `(ny, nx)`.
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    pub fn len(&self) -> usize {
        self.lat.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lat.is_empty()
    }

    pub fn latitudes(&self) -> &[f64] {
        &self.lat
    }

    pub fn longitudes(&self) -> &[f64] {
        &self.lon
    }

    /// Coordinates of a cell as `(lat, lon)`.
    pub fn at(&self, row: usize, col: usize) -> (f64, f64) {
        let i = row * self.shape.1 + col;
        (self.lat[i], self.lon[i])
    }

    /// Sub-grid covered by a window, in window row/column order.
    pub fn window(&self, window: &IndexWindow) -> Self {
        let cols = window.column_indices();
        let mut lat = Vec::with_capacity(window.len());
        let mut lon = Vec::with_capacity(window.len());
        for row in window.rows() {
            for &col in &cols {
                let (la, lo) = self.at(row, col);
                lat.push(la);
                lon.push(lo);
            }
        }
        Self {
            lat,
            lon,
            shape: window.shape(),
        }
    }

    /// Whether rows wrap all the way around the globe.
    ///
    /// Checks the middle row: the grid is periodic when no gap between
    /// neighbouring longitudes (taken circularly) exceeds twice the mean
    /// spacing.
    pub fn is_periodic_in_longitude(&self) -> bool {
        let (ny, nx) = self.shape;
        if ny == 0 || nx < 3 {
            return false;
        }
        let row = ny / 2;
        let mut lons: Vec<f64> = (0..nx)
            .map(|c| self.at(row, c).1)
            .filter(|l| l.is_finite())
            .map(|l| normalize_longitude(l) + 180.0)
            .collect();
        if lons.len() < 3 {
            return false;
        }
        lons.sort_by(|a, b| a.total_cmp(b));

        let mut max_gap = lons[0] + 360.0 - lons[lons.len() - 1];
        for pair in lons.windows(2) {
            max_gap = max_gap.max(pair[1] - pair[0]);
        }
        max_gap <= 2.0 * 360.0 / lons.len() as f64
    }
}

/// Statistics about the spatial index cache.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub capacity: usize,
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 - 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
