//! Hovmöller sections: one depth along a path, through time.

use chrono::{DateTime, Utc};
use ocean_common::geo::LatLon;
use ocean_common::query::{DepthSelector, TimeSelector};
use serde::Serialize;
use std::time::Instant;

use super::TransectEngine;
use crate::error::Result;
use crate::path::{discretize, DiscretizedPath};
use crate::reader::DatasetReader;
use crate::types::MaskedArray;

/// Values shaped `[time, distance]`.
#[derive(Debug, Clone, Serialize)]
pub struct HovmollerResult {
    pub variable: String,
    pub depth: DepthSelector,
    pub times: Vec<DateTime<Utc>>,
    pub path: DiscretizedPath,
    pub values: MaskedArray<f32>,
}

impl<'a, R: DatasetReader + ?Sized> TransectEngine<'a, R> {
    /// Sample `variable` along the path at every timestep from `start` to `end` inclusive.
    ///
    /// Masked cells at a depth index are filled from the levels above first.
    pub fn hovmoller(
        &self,
        points: &[LatLon],
        variable: &str,
        depth: DepthSelector,
        start: TimeSelector,
        end: TimeSelector,
        n_points: usize,
    ) -> Result<HovmollerResult> {
        let started = Instant::now();
        let path = discretize(points, n_points)?;
        let axis = self.reader.time_axis()?;
        let indices = axis.resolve_range(start, end)?;

        let prepared = self.prepare(&path.lats, &path.lons)?;
        let mut rows = Vec::with_capacity(indices.len());
        for &t in &indices {
            self.check_cancelled()?;
            let field = self.read_level_filled(variable, t, depth, &prepared.window)?;
            rows.push(prepared.resampler.resample(&field)?);
        }
        let values = MaskedArray::stack(&rows)?;

        tracing::info!(
            variable,
            points = path.len(),
            timesteps = indices.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Hovmoller complete"
        );

        Ok(HovmollerResult {
            variable: variable.to_string(),
            depth,
            times: indices.iter().map(|&t| axis.times()[t]).collect(),
            path,
            values,
        })
    }
}
