//! Query parameter types shared between the API layer and the resampling core.
//!
//! Values arrive as loosely typed strings (URL query or CLI flags) and are
//! parsed here into strongly typed selectors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

use crate::error::{QueryError, QueryResult};
use crate::geo::LatLon;
use crate::time::parse_iso8601;

/// Default interpolation method name.
pub const DEFAULT_METHOD: &str = "inverse_square";

/// Default neighbour count for weighted methods.
pub const DEFAULT_NEIGHBOURS: usize = 8;

/// Default radius of influence in meters.
pub const DEFAULT_RADIUS_M: f64 = 25_000.0;

/// Vertical level selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepthSelector {
    /// A specific vertical level index.
    Index(usize),
    /// The deepest valid level in each water column.
    Bottom,
}

impl Default for DepthSelector {
    fn default() -> Self {
        Self::Index(0)
    }
}

impl FromStr for DepthSelector {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("bottom") {
            return Ok(Self::Bottom);
        }
        s.parse::<usize>()
            .map(Self::Index)
            .map_err(|_| QueryError::InvalidDepth(s.to_string()))
    }
}

/// Time selection: either a discrete axis index or a raw timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeSelector {
    Index(usize),
    Timestamp(DateTime<Utc>),
}

impl FromStr for TimeSelector {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(index) = s.parse::<usize>() {
            return Ok(Self::Index(index));
        }
        Ok(Self::Timestamp(parse_iso8601(s)?))
    }
}

/// Interpolation settings as supplied by the caller.
///
/// The method name is validated by the resampler, which owns the closed set
/// of supported methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpolationParams {
    pub method: String,
    pub neighbours: usize,
    pub radius_m: f64,
}

impl Default for InterpolationParams {
    fn default() -> Self {
        Self {
            method: DEFAULT_METHOD.to_string(),
            neighbours: DEFAULT_NEIGHBOURS,
            radius_m: DEFAULT_RADIUS_M,
        }
    }
}

/// Parse a list of waypoints.
///
/// Accepts either `"lat,lon;lat,lon;..."` or a JSON array of `[lat, lon]` pairs.
pub fn parse_points(s: &str) -> QueryResult<Vec<LatLon>> {
    let s = s.trim();

    let points: Vec<LatLon> = if s.starts_with('[') {
        let pairs: Vec<(f64, f64)> = serde_json::from_str(s)
            .map_err(|e| QueryError::invalid_parameter("points", e.to_string()))?;
        pairs.into_iter().map(LatLon::from).collect()
    } else {
        s.split(';')
            .filter(|p| !p.trim().is_empty())
            .map(parse_point)
            .collect::<QueryResult<_>>()?
    };

    for p in &points {
        if !(-90.0..=90.0).contains(&p.lat) {
            return Err(QueryError::LatitudeOutOfRange(p.lat));
        }
    }

    Ok(points)
}

fn parse_point(s: &str) -> QueryResult<LatLon> {
    let (lat, lon) = s
        .split_once(',')
        .ok_or_else(|| QueryError::InvalidPoint(s.to_string()))?;
    let lat = lat
        .trim()
        .parse()
        .map_err(|_| QueryError::InvalidPoint(s.to_string()))?;
    let lon = lon
        .trim()
        .parse()
        .map_err(|_| QueryError::InvalidPoint(s.to_string()))?;
    Ok(LatLon::new(lat, lon))
}

/// A fully parsed path/transect query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathQuery {
    /// Ordered waypoints.
    pub points: Vec<LatLon>,
    /// Depth selection.
    pub depth: DepthSelector,
    /// Single time selection (transects).
    pub time: Option<TimeSelector>,
    /// Range start (hovmöller).
    pub starttime: Option<TimeSelector>,
    /// Range end (hovmöller).
    pub endtime: Option<TimeSelector>,
    /// One key for scalar fields, two for vector components.
    pub variables: Vec<String>,
    /// Interpolation settings.
    pub interpolation: InterpolationParams,
}

impl PathQuery {
    /// Build a query from a flat key/value parameter map.
    ///
    /// Recognized keys: `points`, `depth`, `time`, `starttime`, `endtime`,
    /// `variable`, `interp`, `neighbours`, `radius`.
    pub fn from_params(params: &HashMap<String, String>) -> QueryResult<Self> {
        let points = params
            .get("points")
            .ok_or_else(|| QueryError::MissingParameter("points".to_string()))
            .and_then(|s| parse_points(s))?;

        let variables: Vec<String> = params
            .get("variable")
            .ok_or_else(|| QueryError::MissingParameter("variable".to_string()))?
            .split(',')
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();
        if variables.is_empty() || variables.len() > 2 {
            return Err(QueryError::invalid_parameter(
                "variable",
                format!("expected one or two variables, got {}", variables.len()),
            ));
        }

        let depth = params
            .get("depth")
            .map(|s| s.parse::<DepthSelector>())
            .transpose()?
            .unwrap_or_default();

        let time = params
            .get("time")
            .map(|s| s.parse::<TimeSelector>())
            .transpose()?;
        let starttime = params
            .get("starttime")
            .map(|s| s.parse::<TimeSelector>())
            .transpose()?;
        let endtime = params
            .get("endtime")
            .map(|s| s.parse::<TimeSelector>())
            .transpose()?;

        let mut interpolation = InterpolationParams::default();
        if let Some(method) = params.get("interp") {
            interpolation.method = method.trim().to_string();
        }
        if let Some(n) = params.get("neighbours") {
            interpolation.neighbours = n
                .trim()
                .parse()
                .map_err(|_| QueryError::invalid_parameter("neighbours", n.clone()))?;
        }
        if let Some(r) = params.get("radius") {
            let radius: f64 = r
                .trim()
                .parse()
                .map_err(|_| QueryError::invalid_parameter("radius", r.clone()))?;
            if !(radius > 0.0) {
                return Err(QueryError::invalid_parameter("radius", "must be > 0"));
            }
            interpolation.radius_m = radius;
        }

        Ok(Self {
            points,
            depth,
            time,
            starttime,
            endtime,
            variables,
            interpolation,
        })
    }

    /// Whether this query names a vector field (two components).
    pub fn is_vector(&self) -> bool {
        self.variables.len() == 2
    }
}
