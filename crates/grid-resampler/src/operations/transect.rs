//! Vertical, surface and velocity transects along a path.

use chrono::{DateTime, Utc};
use ocean_common::geo::LatLon;
use ocean_common::query::{DepthSelector, TimeSelector};
use serde::Serialize;
use std::time::Instant;

use super::{Prepared, TransectEngine};
use crate::error::{ResampleError, Result};
use crate::path::{discretize, DiscretizedPath};
use crate::reader::{DatasetReader, DepthSlice};
use crate::resample::fill_invalid_shift;
use crate::types::{DepthAxis, MaskedArray};

/// A vertical section: values shaped `[depth, distance]`.
#[derive(Debug, Clone, Serialize)]
pub struct TransectResult {
    pub variable: String,
    pub time: DateTime<Utc>,
    pub depths: Vec<f64>,
    pub path: DiscretizedPath,
    pub values: MaskedArray<f32>,
}

/// A single-level section: values shaped `[distance]`.
#[derive(Debug, Clone, Serialize)]
pub struct SurfaceTransectResult {
    pub variable: String,
    pub time: DateTime<Utc>,
    pub depth: DepthSelector,
    pub path: DiscretizedPath,
    pub values: MaskedArray<f32>,
}

/// Velocity section decomposed relative to the path direction.
///
/// `parallel` is positive along the direction of travel, `perpendicular`
/// positive to its left. All arrays are shaped `[depth, distance]`.
#[derive(Debug, Clone, Serialize)]
pub struct VelocityTransectResult {
    pub variables: (String, String),
    pub time: DateTime<Utc>,
    pub depths: Vec<f64>,
    pub path: DiscretizedPath,
    pub parallel: MaskedArray<f32>,
    pub perpendicular: MaskedArray<f32>,
    pub magnitude: MaskedArray<f32>,
}

impl<'a, R: DatasetReader + ?Sized> TransectEngine<'a, R> {
    /// Full-depth section of `variable` along the path through `points`.
    ///
    /// Masked cells are filled down from above before resampling so targets
    /// near a sloping bottom still see their deep neighbours; targets with no
    /// wet neighbour at a level stay masked.
    pub fn transect(
        &self,
        points: &[LatLon],
        variable: &str,
        time: TimeSelector,
        n_points: usize,
    ) -> Result<TransectResult> {
        let start = Instant::now();
        let path = discretize(points, n_points)?;
        let axis = self.reader.time_axis()?;
        let time_index = axis.resolve(time)?;
        let depths = self.reader.depths(variable)?;

        let prepared = self.prepare(&path.lats, &path.lons)?;
        let values = self.section(&prepared, variable, time_index, &depths)?;

        tracing::info!(
            variable,
            points = path.len(),
            levels = depths.len(),
            valid = values.count_valid(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Transect complete"
        );

        Ok(TransectResult {
            variable: variable.to_string(),
            time: axis.times()[time_index],
            depths,
            path,
            values,
        })
    }

    /// Section of `variable` at a single depth along the path.
    pub fn surface_transect(
        &self,
        points: &[LatLon],
        variable: &str,
        time: TimeSelector,
        depth: DepthSelector,
        n_points: usize,
    ) -> Result<SurfaceTransectResult> {
        let start = Instant::now();
        let path = discretize(points, n_points)?;
        let axis = self.reader.time_axis()?;
        let time_index = axis.resolve(time)?;

        let prepared = self.prepare(&path.lats, &path.lons)?;
        let field = self.read_level(variable, time_index, depth, &prepared.window)?;
        let values = prepared.resampler.resample(&field)?;

        tracing::info!(
            variable,
            points = path.len(),
            valid = values.count_valid(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Surface transect complete"
        );

        Ok(SurfaceTransectResult {
            variable: variable.to_string(),
            time: axis.times()[time_index],
            depth,
            path,
            values,
        })
    }

    /// Velocity section split into along-path and cross-path components.
    ///
    /// Components are resampled first and rotated afterwards, using the path
    /// bearing at each target: `θ = atan2(v, u) - (90° - bearing)`.
    pub fn velocity_transect(
        &self,
        points: &[LatLon],
        components: (&str, &str),
        time: TimeSelector,
        n_points: usize,
    ) -> Result<VelocityTransectResult> {
        let start = Instant::now();
        let (u_name, v_name) = components;
        let path = discretize(points, n_points)?;
        let axis = self.reader.time_axis()?;
        let time_index = axis.resolve(time)?;

        let depths = self.reader.depths(u_name)?;
        let v_depths = self.reader.depths(v_name)?;
        if depths.len() != v_depths.len() {
            return Err(ResampleError::shape_mismatch(depths.len(), v_depths.len()));
        }

        let prepared = self.prepare(&path.lats, &path.lons)?;
        let u = self.section(&prepared, u_name, time_index, &depths)?;
        let v = self.section(&prepared, v_name, time_index, &depths)?;

        let magnitude = u.zip_with(&v, |a, b| a.hypot(b))?;
        let mut parallel = MaskedArray::masked(u.shape().to_vec());
        let mut perpendicular = MaskedArray::masked(u.shape().to_vec());
        let n = path.len();
        for flat in 0..u.len() {
            let (Some(a), Some(b)) = (u.get(flat), v.get(flat)) else {
                continue;
            };
            let bearing = path.bearings[flat % n];
            let speed = (a as f64).hypot(b as f64);
            let theta = (b as f64).atan2(a as f64) - (90.0 - bearing).to_radians();
            parallel.set(flat, Some((speed * theta.cos()) as f32));
            perpendicular.set(flat, Some((speed * theta.sin()) as f32));
        }

        tracing::info!(
            u = u_name,
            v = v_name,
            points = n,
            levels = depths.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Velocity transect complete"
        );

        Ok(VelocityTransectResult {
            variables: (u_name.to_string(), v_name.to_string()),
            time: axis.times()[time_index],
            depths,
            path,
            parallel,
            perpendicular,
            magnitude,
        })
    }

    /// Resample every level of one timestep, `[depth, targets]`.
    fn section(
        &self,
        prepared: &Prepared,
        variable: &str,
        time_index: usize,
        depths: &[f64],
    ) -> Result<MaskedArray<f32>> {
        // Cells below the floor are masked by bathymetry, not by the source mask.
        let mut slab = self
            .reader
            .read_window(variable, time_index, DepthSlice::All, &prepared.window)?;
        let count = fill_invalid_shift(&mut slab, DepthAxis::First)?;
        tracing::debug!(variable, filled = count, "Filled masked cells below valid levels");

        let nz = slab.shape()[0];
        let mut levels = Vec::with_capacity(nz);
        for k in 0..nz {
            self.check_cancelled()?;
            levels.push(prepared.resampler.resample(&slab.level(k)?)?);
        }
        let mut section = if levels.is_empty() {
            MaskedArray::masked(vec![0, prepared.resampler.len()])
        } else {
            MaskedArray::stack(&levels)?
        };

        if let Some(provider) = self.bathymetry {
            let floor = prepared
                .resampler
                .resample(&provider.floor_depth(&prepared.window)?)?;
            mask_below_floor(&mut section, depths, &floor);
        }
        Ok(section)
    }
}

/// Mask cells deeper than the floor; land (masked floor) masks the whole column.
fn mask_below_floor(section: &mut MaskedArray<f32>, depths: &[f64], floor: &MaskedArray<f32>) {
    let n = floor.len();
    for (k, &depth) in depths.iter().enumerate() {
        for j in 0..n {
            let dry = match floor.get(j) {
                Some(bottom) => depth > bottom as f64,
                None => true,
            };
            if dry && k * n + j < section.len() {
                section.set(k * n + j, None);
            }
        }
    }
}
