//! Sampling along a timed track, each point at its own time.

use chrono::{DateTime, Utc};
use ocean_common::geo::{haversine_distance, LatLon};
use ocean_common::query::DepthSelector;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;

use super::TransectEngine;
use crate::error::{ResampleError, Result};
use crate::path::discretize_with_time;
use crate::reader::DatasetReader;
use crate::types::MaskedArray;

/// Values along a track, shaped `[point]`.
#[derive(Debug, Clone, Serialize)]
pub struct PathResult {
    pub variable: String,
    pub depth: DepthSelector,
    pub lats: Vec<f64>,
    pub lons: Vec<f64>,
    pub times: Vec<DateTime<Utc>>,
    /// Cumulative distance along the track, meters.
    pub distances: Vec<f64>,
    pub values: MaskedArray<f32>,
}

impl<'a, R: DatasetReader + ?Sized> TransectEngine<'a, R> {
    /// Sample `variable` at every track point, at that point's own time.
    ///
    /// Times between axis steps are blended linearly; times more than half a
    /// step outside the axis are masked.
    pub fn path(
        &self,
        track: &[LatLon],
        times: &[DateTime<Utc>],
        variable: &str,
        depth: DepthSelector,
    ) -> Result<PathResult> {
        if track.is_empty() {
            return Err(ResampleError::TooFewWaypoints(0));
        }
        if times.len() != track.len() {
            return Err(ResampleError::TimeCountMismatch {
                waypoints: track.len(),
                times: times.len(),
            });
        }

        let mut distances = Vec::with_capacity(track.len());
        let mut total = 0.0;
        distances.push(0.0);
        for pair in track.windows(2) {
            total += haversine_distance(pair[0], pair[1]);
            distances.push(total);
        }

        let lats: Vec<f64> = track.iter().map(|p| p.lat).collect();
        let lons: Vec<f64> = track.iter().map(|p| p.lon).collect();
        self.sample_track(lats, lons, times.to_vec(), distances, variable, depth)
    }

    /// Discretize a timed path between waypoints, then sample it like [`Self::path`].
    pub fn timed_path(
        &self,
        waypoints: &[LatLon],
        times: &[DateTime<Utc>],
        variable: &str,
        depth: DepthSelector,
        n_points: usize,
    ) -> Result<PathResult> {
        let path = discretize_with_time(waypoints, times, n_points)?;
        let point_times = path.times.clone().unwrap_or_default();
        self.sample_track(path.lats, path.lons, point_times, path.distances, variable, depth)
    }

    fn sample_track(
        &self,
        lats: Vec<f64>,
        lons: Vec<f64>,
        times: Vec<DateTime<Utc>>,
        distances: Vec<f64>,
        variable: &str,
        depth: DepthSelector,
    ) -> Result<PathResult> {
        let start = Instant::now();
        let axis = self.reader.time_axis()?;
        let brackets = axis.align(&times);

        let mut needed: BTreeMap<usize, Option<MaskedArray<f32>>> = BTreeMap::new();
        for bracket in brackets.iter().flatten() {
            needed.insert(bracket.lower, None);
            if !bracket.is_exact() {
                needed.insert(bracket.upper, None);
            }
        }

        let prepared = self.prepare(&lats, &lons)?;
        for (&t, slot) in needed.iter_mut() {
            self.check_cancelled()?;
            let field = self.read_level(variable, t, depth, &prepared.window)?;
            *slot = Some(prepared.resampler.resample(&field)?);
        }

        let mut values = MaskedArray::masked(vec![lats.len()]);
        for (i, bracket) in brackets.iter().enumerate() {
            let Some(bracket) = bracket else {
                continue;
            };
            let at = |t: usize| {
                needed
                    .get(&t)
                    .and_then(|v| v.as_ref())
                    .and_then(|v| v.get(i))
            };
            values.set(i, bracket.interpolate(at(bracket.lower), at(bracket.upper)));
        }

        tracing::info!(
            variable,
            points = lats.len(),
            timesteps = needed.len(),
            valid = values.count_valid(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Path sampling complete"
        );

        Ok(PathResult {
            variable: variable.to_string(),
            depth,
            lats,
            lons,
            times,
            distances,
            values,
        })
    }
}
