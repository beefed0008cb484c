//! Executes one parsed query against a dataset.

use std::collections::HashMap;

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use grid_resampler::{
    CancelFlag, DatasetReader, MemoryDataset, ResampleMethod, ResampleRequest, ResamplerConfig,
    SpatialIndexCache, TransectEngine,
};
use ocean_common::query::{PathQuery, TimeSelector};
use ocean_common::time::parse_iso8601;
use serde::{Deserialize, Serialize};

/// Operations the runner can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Full-depth section at one time.
    Transect,
    /// Single-depth section at one time.
    Surface,
    /// Velocity section from two components.
    Velocity,
    /// Single depth along the path through a time range.
    Hovmoller,
    /// One value per track point at that point's time.
    Path,
    /// Discretized track between timed waypoints.
    TimedPath,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transect => "transect",
            Self::Surface => "surface",
            Self::Velocity => "velocity",
            Self::Hovmoller => "hovmoller",
            Self::Path => "path",
            Self::TimedPath => "timed_path",
        }
    }
}

/// One named query in a batch file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItem {
    pub name: String,
    pub operation: Operation,
    pub params: HashMap<String, String>,
}

/// Runs queries against one dataset, sharing the index cache between them.
pub struct Runner<'a> {
    dataset: &'a MemoryDataset,
    cache: &'a SpatialIndexCache,
    config: &'a ResamplerConfig,
    cancel: CancelFlag,
}

impl<'a> Runner<'a> {
    pub fn new(
        dataset: &'a MemoryDataset,
        cache: &'a SpatialIndexCache,
        config: &'a ResamplerConfig,
    ) -> Self {
        Self {
            dataset,
            cache,
            config,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = flag;
        self
    }

    /// Run `operation` with string parameters and return the JSON result.
    pub fn run(
        &self,
        operation: Operation,
        params: &HashMap<String, String>,
    ) -> anyhow::Result<serde_json::Value> {
        let query = PathQuery::from_params(params).context("invalid query")?;
        let request = self.request(params, &query)?;
        let n_points = match params.get("n") {
            Some(n) => n.trim().parse().context("invalid 'n'")?,
            None => self.config.transect_points,
        };

        let mut engine = TransectEngine::new(self.dataset, self.cache, request)
            .with_margin(self.config.bbox_margin_fraction)
            .with_cancel_flag(self.cancel.clone());
        if self.dataset.bathymetry.is_some() {
            engine = engine.with_bathymetry(self.dataset);
        }

        let variable = query.variables[0].as_str();
        let time = query.time.unwrap_or(TimeSelector::Index(0));

        tracing::info!(
            operation = operation.as_str(),
            variable,
            waypoints = query.points.len(),
            method = request.method.as_str(),
            "Running query"
        );

        let value = match operation {
            Operation::Transect => {
                serde_json::to_value(engine.transect(&query.points, variable, time, n_points)?)?
            }
            Operation::Surface => serde_json::to_value(engine.surface_transect(
                &query.points,
                variable,
                time,
                query.depth,
                n_points,
            )?)?,
            Operation::Velocity => {
                if !query.is_vector() {
                    bail!("velocity needs two variables, e.g. 'u,v'");
                }
                let components = (query.variables[0].as_str(), query.variables[1].as_str());
                serde_json::to_value(engine.velocity_transect(
                    &query.points,
                    components,
                    time,
                    n_points,
                )?)?
            }
            Operation::Hovmoller => {
                let last = self.dataset.timestamps()?.len().saturating_sub(1);
                let start = query.starttime.unwrap_or(TimeSelector::Index(0));
                let end = query.endtime.unwrap_or(TimeSelector::Index(last));
                serde_json::to_value(engine.hovmoller(
                    &query.points,
                    variable,
                    query.depth,
                    start,
                    end,
                    n_points,
                )?)?
            }
            Operation::Path => {
                let times = parse_times(params)?;
                serde_json::to_value(engine.path(&query.points, &times, variable, query.depth)?)?
            }
            Operation::TimedPath => {
                let times = parse_times(params)?;
                serde_json::to_value(engine.timed_path(
                    &query.points,
                    &times,
                    variable,
                    query.depth,
                    n_points,
                )?)?
            }
        };
        Ok(value)
    }

    /// Configured interpolation, with each setting the query names replacing
    /// only its own field.
    fn request(
        &self,
        params: &HashMap<String, String>,
        query: &PathQuery,
    ) -> anyhow::Result<ResampleRequest> {
        let base = self.config.request()?;
        let method = if params.contains_key("interp") {
            query.interpolation.method.parse::<ResampleMethod>()?
        } else {
            base.method
        };
        let neighbours = if params.contains_key("neighbours") {
            query.interpolation.neighbours
        } else {
            base.neighbours
        };
        let radius = if params.contains_key("radius") {
            query.interpolation.radius_m
        } else {
            base.radius_of_influence
        };
        Ok(ResampleRequest::new(method, neighbours, radius)?)
    }
}

/// Comma separated ISO 8601 timestamps from the `times` parameter.
fn parse_times(params: &HashMap<String, String>) -> anyhow::Result<Vec<DateTime<Utc>>> {
    let raw = params
        .get("times")
        .context("missing required parameter: times")?;
    raw.split(',')
        .map(|t| parse_iso8601(t.trim()).with_context(|| format!("invalid time '{}'", t)))
        .collect()
}

/// Load a batch file (`.yaml`/`.yml`, otherwise JSON).
pub fn load_batch(path: &std::path::Path) -> anyhow::Result<Vec<BatchItem>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading batch file {}", path.display()))?;
    let items: Vec<BatchItem> = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&text)?,
        _ => serde_json::from_str(&text)?,
    };
    for item in &items {
        // fail before any work rather than halfway through the batch
        PathQuery::from_params(&item.params)
            .with_context(|| format!("batch item '{}'", item.name))?;
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::fixtures::grid::UNIT_4X4;
    use test_utils::{create_indexed_values, create_regular_grid, epoch_2024};

    fn dataset() -> MemoryDataset {
        let (lat, lon) = create_regular_grid(UNIT_4X4);
        MemoryDataset::curvilinear("cli", lat, lon, (4, 4), vec![epoch_2024()])
            .with_variable("temp", vec![], create_indexed_values(4, 4))
            .with_variable("u", vec![0.0], vec![1.0; 16])
            .with_variable("v", vec![0.0], vec![0.0; 16])
    }

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_surface_with_query_interpolation() {
        let ds = dataset();
        let cache = SpatialIndexCache::new(2);
        let config = ResamplerConfig::default();
        let runner = Runner::new(&ds, &cache, &config);

        let value = runner
            .run(
                Operation::Surface,
                &params(&[
                    ("points", "0,0;0,3"),
                    ("variable", "temp"),
                    ("interp", "nearest"),
                    ("radius", "200000"),
                    ("n", "4"),
                ]),
            )
            .unwrap();
        let values = value["values"]["values"].as_array().unwrap();
        assert_eq!(values.len(), 4);
        assert_eq!(values[3], 3.0);
    }

    #[test]
    fn test_partial_override_keeps_configured_settings() {
        let ds = dataset();
        let cache = SpatialIndexCache::new(2);
        let config = ResamplerConfig {
            method: ResampleMethod::Nearest,
            neighbours: 3,
            ..ResamplerConfig::default()
        };
        let runner = Runner::new(&ds, &cache, &config);

        let radius_only = params(&[
            ("points", "0,0;0,3"),
            ("variable", "temp"),
            ("radius", "90000"),
        ]);
        let query = PathQuery::from_params(&radius_only).unwrap();
        let request = runner.request(&radius_only, &query).unwrap();
        assert_eq!(request.method, ResampleMethod::Nearest);
        assert_eq!(request.neighbours, 3);
        assert_eq!(request.radius_of_influence, 90_000.0);

        let method_only = params(&[
            ("points", "0,0;0,3"),
            ("variable", "temp"),
            ("interp", "bilinear"),
        ]);
        let query = PathQuery::from_params(&method_only).unwrap();
        let request = runner.request(&method_only, &query).unwrap();
        assert_eq!(request.method, ResampleMethod::Bilinear);
        assert_eq!(request.neighbours, 3);
        assert_eq!(request.radius_of_influence, config.radius_of_influence_m);
    }

    #[test]
    fn test_velocity_requires_two_variables() {
        let ds = dataset();
        let cache = SpatialIndexCache::new(2);
        let config = ResamplerConfig::default();
        let runner = Runner::new(&ds, &cache, &config);
        let err = runner
            .run(
                Operation::Velocity,
                &params(&[("points", "1,0;1,3"), ("variable", "u")]),
            )
            .unwrap_err();
        assert!(err.to_string().contains("two variables"));
    }

    #[test]
    fn test_path_requires_times() {
        let ds = dataset();
        let cache = SpatialIndexCache::new(2);
        let config = ResamplerConfig::default();
        let runner = Runner::new(&ds, &cache, &config);
        let err = runner
            .run(Operation::Path, &params(&[("points", "1,1"), ("variable", "temp")]))
            .unwrap_err();
        assert!(err.to_string().contains("times"));
    }

    #[test]
    fn test_unknown_method_rejected() {
        let ds = dataset();
        let cache = SpatialIndexCache::new(2);
        let config = ResamplerConfig::default();
        let runner = Runner::new(&ds, &cache, &config);
        assert!(runner
            .run(
                Operation::Surface,
                &params(&[("points", "0,0;0,3"), ("variable", "temp"), ("interp", "cubic")]),
            )
            .is_err());
    }

    #[test]
    fn test_operation_names() {
        assert_eq!(Operation::TimedPath.as_str(), "timed_path");
        let op: Operation = serde_json::from_str("\"hovmoller\"").unwrap();
        assert_eq!(op, Operation::Hovmoller);
    }
}
