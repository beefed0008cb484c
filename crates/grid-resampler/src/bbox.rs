//! Index-space bounding boxes covering a set of query points.
//!
//! Reading a whole global grid to sample a short transect is wasteful, so
//! operations first resolve the smallest row/column window that holds every
//! source cell the resampler will touch, then read only that window.

use serde::Serialize;
use std::ops::RangeInclusive;

use crate::spatial_index::{Neighbour, SpatialIndex};

/// Default fraction of the covered span added on each side of a window.
pub const DEFAULT_MARGIN_FRACTION: f64 = 0.25;

/// Columns covered by a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnSpan {
    /// Columns `start..=end`.
    Contiguous { start: usize, end: usize },
    /// Columns `start..nx` followed by `0..=end`, for windows crossing the
    /// longitude seam of a periodic grid.
    Wrapped { start: usize, end: usize, nx: usize },
}

/// A rectangular window in grid index space. Bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexWindow {
    pub min_row: usize,
    pub max_row: usize,
    pub cols: ColumnSpan,
}

impl IndexWindow {
    /// A window covering the whole grid.
    pub fn full(shape: (usize, usize)) -> Self {
        Self {
            min_row: 0,
            max_row: shape.0.saturating_sub(1),
            cols: ColumnSpan::Contiguous {
                start: 0,
                end: shape.1.saturating_sub(1),
            },
        }
    }

    pub fn rows(&self) -> RangeInclusive<usize> {
        self.min_row..=self.max_row
    }

    pub fn n_rows(&self) -> usize {
        self.max_row - self.min_row + 1
    }

    pub fn n_cols(&self) -> usize {
        match self.cols {
            ColumnSpan::Contiguous { start, end } => end - start + 1,
            ColumnSpan::Wrapped { start, end, nx } => (nx - start) + end + 1,
        }
    }

    /// Window shape as `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows(), self.n_cols())
    }

    pub fn len(&self) -> usize {
        self.n_rows() * self.n_cols()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_wrapped(&self) -> bool {
        matches!(self.cols, ColumnSpan::Wrapped { .. })
    }

    /// Source column indices in window order.
    pub fn column_indices(&self) -> Vec<usize> {
        match self.cols {
            ColumnSpan::Contiguous { start, end } => (start..=end).collect(),
            ColumnSpan::Wrapped { start, end, nx } => (start..nx).chain(0..=end).collect(),
        }
    }

    /// Whether a source cell lies inside the window.
    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.local_index(row, col).is_some()
    }

    /// Row-major position of a source cell within the window.
    pub fn local_index(&self, row: usize, col: usize) -> Option<usize> {
        if row < self.min_row || row > self.max_row {
            return None;
        }
        let local_col = match self.cols {
            ColumnSpan::Contiguous { start, end } if (start..=end).contains(&col) => col - start,
            ColumnSpan::Wrapped { start, nx, .. } if col >= start && col < nx => col - start,
            ColumnSpan::Wrapped { start, end, nx } if col <= end => (nx - start) + col,
            _ => return None,
        };
        Some((row - self.min_row) * self.n_cols() + local_col)
    }
}

/// Resolve the window covering the nearest source cell of every target.
///
/// Never fails: an empty index or an empty target list yields the full grid.
pub fn resolve(lats: &[f64], lons: &[f64], index: &SpatialIndex, margin_fraction: f64) -> IndexWindow {
    let neighbours = index.query(lats, lons, 1);
    window_for_neighbours(&neighbours, index, margin_fraction)
}

/// Resolve the window covering every cell in a neighbour query result.
pub fn window_for_neighbours(
    neighbours: &[Vec<Neighbour>],
    index: &SpatialIndex,
    margin_fraction: f64,
) -> IndexWindow {
    let cells: Vec<(usize, usize)> = neighbours
        .iter()
        .flatten()
        .map(|n| index.unravel(n.flat_index))
        .collect();
    window_for_cells(
        &cells,
        index.shape(),
        index.is_periodic_in_longitude(),
        margin_fraction,
    )
}

/// Smallest window holding all `cells`, expanded by the margin.
pub fn window_for_cells(
    cells: &[(usize, usize)],
    shape: (usize, usize),
    periodic_lon: bool,
    margin_fraction: f64,
) -> IndexWindow {
    let (ny, nx) = shape;
    if cells.is_empty() || ny == 0 || nx == 0 {
        return IndexWindow::full(shape);
    }
    let margin = if margin_fraction.is_finite() {
        margin_fraction.max(0.0)
    } else {
        0.0
    };

    let min_row = cells.iter().map(|c| c.0).min().unwrap_or(0);
    let max_row = cells.iter().map(|c| c.0).max().unwrap_or(0);
    let (min_row, max_row) = expand_clamped(min_row, max_row, ny, margin);

    let mut cols: Vec<usize> = cells.iter().map(|c| c.1).collect();
    cols.sort_unstable();
    cols.dedup();

    let cols = if periodic_lon {
        periodic_span(&cols, nx, margin)
    } else {
        let (start, end) = expand_clamped(cols[0], cols[cols.len() - 1], nx, margin);
        ColumnSpan::Contiguous { start, end }
    };

    IndexWindow {
        min_row,
        max_row,
        cols,
    }
}

fn pad_for(span: usize, margin: f64) -> usize {
    (margin * span as f64).ceil() as usize
}

/// Expand `[lo, hi]` by the margin, clamp to `[0, n-1]` and force a span of
/// at least 2 cells when the axis allows it.
fn expand_clamped(lo: usize, hi: usize, n: usize, margin: f64) -> (usize, usize) {
    let pad = pad_for(hi - lo, margin);
    let mut lo = lo.saturating_sub(pad);
    let mut hi = (hi + pad).min(n - 1);
    if hi == lo && n >= 2 {
        if hi + 1 < n {
            hi += 1;
        } else {
            lo -= 1;
        }
    }
    (lo, hi)
}

/// Column span on a grid whose columns wrap around.
///
/// The occupied columns are treated as points on a circle; the window is the
/// complement of the largest empty gap between them.
fn periodic_span(cols: &[usize], nx: usize, margin: f64) -> ColumnSpan {
    let first = cols[0];
    let last = cols[cols.len() - 1];

    // gap across the seam, from the last occupied column round to the first
    let mut best_gap = first + nx - last - 1;
    let mut start = first;
    let mut end = last;
    for pair in cols.windows(2) {
        let gap = pair[1] - pair[0] - 1;
        if gap > best_gap {
            best_gap = gap;
            start = pair[1];
            end = pair[0];
        }
    }

    let len = (end + nx - start) % nx + 1;
    let pad = pad_for(len - 1, margin);
    let mut len = len + 2 * pad;
    if len >= nx {
        return ColumnSpan::Contiguous {
            start: 0,
            end: nx - 1,
        };
    }
    if len < 2 && nx >= 2 {
        len = 2;
    }
    let start = (start + nx - pad % nx) % nx;
    let end = start + len - 1;
    if end < nx {
        ColumnSpan::Contiguous { start, end }
    } else {
        ColumnSpan::Wrapped {
            start,
            end: end - nx,
            nx,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GridCoordinates;

    #[test]
    fn test_full_window() {
        let w = IndexWindow::full((3, 5));
        assert_eq!(w.shape(), (3, 5));
        assert!(w.contains(2, 4));
        assert!(!w.contains(3, 0));
        assert_eq!(w.local_index(1, 2), Some(7));
    }

    #[test]
    fn test_margin_and_clamp() {
        let w = window_for_cells(&[(10, 10), (14, 18)], (100, 100), false, 0.25);
        assert_eq!((w.min_row, w.max_row), (9, 15));
        assert_eq!(w.cols, ColumnSpan::Contiguous { start: 8, end: 20 });

        let edge = window_for_cells(&[(0, 0), (4, 4)], (5, 5), false, 0.25);
        assert_eq!(edge, IndexWindow::full((5, 5)));
    }

    #[test]
    fn test_degenerate_span_widened() {
        let w = window_for_cells(&[(3, 7)], (10, 10), false, 0.25);
        assert_eq!(w.shape(), (2, 2));
        assert!(w.contains(3, 7));

        let corner = window_for_cells(&[(9, 9)], (10, 10), false, 0.0);
        assert_eq!((corner.min_row, corner.max_row), (8, 9));
        assert_eq!(corner.cols, ColumnSpan::Contiguous { start: 8, end: 9 });

        let single_row = window_for_cells(&[(0, 2)], (1, 5), false, 0.0);
        assert_eq!(single_row.shape(), (1, 2));
    }

    #[test]
    fn test_wrapped_span_across_seam() {
        let w = window_for_cells(&[(5, 358), (5, 359), (5, 0), (5, 2)], (10, 360), true, 0.0);
        assert_eq!(
            w.cols,
            ColumnSpan::Wrapped {
                start: 358,
                end: 2,
                nx: 360
            }
        );
        assert_eq!(w.n_cols(), 5);
        assert_eq!(w.column_indices(), vec![358, 359, 0, 1, 2]);
        assert!(w.contains(5, 1));
        assert!(!w.contains(5, 100));
        assert_eq!(w.local_index(5, 0), Some(2));
    }

    #[test]
    fn test_periodic_contiguous_when_seam_gap_is_largest() {
        let w = window_for_cells(&[(0, 100), (0, 120)], (4, 360), true, 0.25);
        assert_eq!(w.cols, ColumnSpan::Contiguous { start: 95, end: 125 });
    }

    #[test]
    fn test_periodic_margin_covering_globe() {
        let w = window_for_cells(&[(0, 0), (0, 180)], (2, 360), true, 0.5);
        assert_eq!(w.cols, ColumnSpan::Contiguous { start: 0, end: 359 });
    }

    #[test]
    fn test_resolve_contains_nearest_cells() {
        let lats: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let lons: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let coords = GridCoordinates::from_axes(&lats, &lons);
        let index = SpatialIndex::build(&coords);

        let targets_lat = [3.2, 5.7, 8.1];
        let targets_lon = [4.4, 6.0, 9.9];
        let w = resolve(&targets_lat, &targets_lon, &index, 0.25);
        for (la, lo) in targets_lat.iter().zip(&targets_lon) {
            let n = index.nearest(*la, *lo).unwrap();
            let (r, c) = index.unravel(n.flat_index);
            assert!(w.contains(r, c));
        }
    }

    #[test]
    fn test_resolve_empty_targets_is_full() {
        let coords = GridCoordinates::from_axes(&[0.0, 1.0], &[0.0, 1.0, 2.0]);
        let index = SpatialIndex::build(&coords);
        assert_eq!(resolve(&[], &[], &index, 0.25), IndexWindow::full((2, 3)));
    }
}
