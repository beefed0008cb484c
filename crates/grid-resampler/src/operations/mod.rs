//! Variable-level operations: transects, hovmöller sections and track sampling.
//!
//! Every operation follows the same steps:
//!
//! 1. discretize the requested path,
//! 2. fetch (or build) the cached spatial index for the source grid,
//! 3. query neighbours and resolve the index window they fall in,
//! 4. read only that window from the dataset,
//! 5. resample each level or timestep with one shared [`Resampler`].

mod hovmoller;
mod track;
mod transect;

pub use hovmoller::HovmollerResult;
pub use track::PathResult;
pub use transect::{SurfaceTransectResult, TransectResult, VelocityTransectResult};

use ocean_common::query::DepthSelector;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::bbox::{window_for_neighbours, IndexWindow};
use crate::cache::SpatialIndexCache;
use crate::config::ResamplerConfig;
use crate::error::{ResampleError, Result};
use crate::reader::{BathymetryProvider, DatasetReader, DepthSlice};
use crate::resample::{fill_invalid_shift, ResampleRequest, Resampler};
use crate::spatial_index::SpatialIndex;
use crate::types::{DepthAxis, MaskedArray};

/// Cooperative cancellation shared between a caller and a running operation.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Runs resampling operations against one dataset.
pub struct TransectEngine<'a, R: DatasetReader + ?Sized> {
    reader: &'a R,
    cache: &'a SpatialIndexCache,
    request: ResampleRequest,
    margin_fraction: f64,
    bathymetry: Option<&'a dyn BathymetryProvider>,
    cancel: Option<CancelFlag>,
}

/// Neighbours resolved for one set of targets.
struct Prepared {
    resampler: Resampler,
    window: IndexWindow,
}

impl<'a, R: DatasetReader + ?Sized> TransectEngine<'a, R> {
    pub fn new(reader: &'a R, cache: &'a SpatialIndexCache, request: ResampleRequest) -> Self {
        Self {
            reader,
            cache,
            request,
            margin_fraction: crate::bbox::DEFAULT_MARGIN_FRACTION,
            bathymetry: None,
            cancel: None,
        }
    }

    /// Engine using the method, neighbours, radius and margin from `config`.
    pub fn from_config(
        reader: &'a R,
        cache: &'a SpatialIndexCache,
        config: &ResamplerConfig,
    ) -> Result<Self> {
        Ok(Self::new(reader, cache, config.request()?).with_margin(config.bbox_margin_fraction))
    }

    pub fn with_margin(mut self, margin_fraction: f64) -> Self {
        self.margin_fraction = margin_fraction;
        self
    }

    /// Blank transect cells deeper than the sea floor reported by `provider`.
    pub fn with_bathymetry(mut self, provider: &'a dyn BathymetryProvider) -> Self {
        self.bathymetry = Some(provider);
        self
    }

    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn request(&self) -> &ResampleRequest {
        &self.request
    }

    fn check_cancelled(&self) -> Result<()> {
        match &self.cancel {
            Some(flag) if flag.is_cancelled() => Err(ResampleError::Cancelled),
            _ => Ok(()),
        }
    }

    fn spatial_index(&self) -> Result<Arc<SpatialIndex>> {
        let reader = self.reader;
        self.cache.get_or_build(reader.source_id(), || {
            Ok(SpatialIndex::build(&reader.coordinates()?))
        })
    }

    fn prepare(&self, lats: &[f64], lons: &[f64]) -> Result<Prepared> {
        let index = self.spatial_index()?;
        let neighbours = index.query(lats, lons, self.request.candidate_count());
        let window = window_for_neighbours(&neighbours, &index, self.margin_fraction);
        tracing::debug!(
            source = self.reader.source_id(),
            targets = lats.len(),
            rows = window.n_rows(),
            cols = window.n_cols(),
            wrapped = window.is_wrapped(),
            "Resolved read window"
        );
        let resampler = Resampler::from_neighbours(&index, &neighbours, &window, self.request);
        Ok(Prepared { resampler, window })
    }

    /// Read one horizontal field `(rows, cols)` at the selected depth.
    fn read_level(
        &self,
        variable: &str,
        time_index: usize,
        depth: DepthSelector,
        window: &IndexWindow,
    ) -> Result<MaskedArray<f32>> {
        let depths = self.reader.depths(variable)?;
        if depths.is_empty() {
            return self
                .reader
                .read_window(variable, time_index, DepthSlice::Level(0), window)?
                .level(0);
        }
        match depth {
            DepthSelector::Index(k) if k >= depths.len() => Err(ResampleError::DepthOutOfRange {
                index: k,
                len: depths.len(),
            }),
            DepthSelector::Index(k) => self
                .reader
                .read_window(variable, time_index, DepthSlice::Level(k), window)?
                .level(0),
            DepthSelector::Bottom => self
                .reader
                .read_window(variable, time_index, DepthSlice::All, window)?
                .deepest_valid(),
        }
    }

    /// Like [`read_level`](Self::read_level), but level `k` is taken after
    /// filling masked cells down from the levels above it.
    fn read_level_filled(
        &self,
        variable: &str,
        time_index: usize,
        depth: DepthSelector,
        window: &IndexWindow,
    ) -> Result<MaskedArray<f32>> {
        let depths = self.reader.depths(variable)?;
        match depth {
            DepthSelector::Index(k) if k > 0 && k < depths.len() => {
                let mut slab =
                    self.reader
                        .read_window(variable, time_index, DepthSlice::All, window)?;
                fill_invalid_shift(&mut slab, DepthAxis::First)?;
                slab.level(k)
            }
            _ => self.read_level(variable, time_index, depth, window),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_flag_shared_between_clones() {
        let flag = CancelFlag::new();
        let other = flag.clone();
        assert!(!other.is_cancelled());
        flag.cancel();
        assert!(other.is_cancelled());
    }
}
