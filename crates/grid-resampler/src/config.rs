//! Configuration for the grid resampler.

use serde::{Deserialize, Serialize};

use crate::bbox::DEFAULT_MARGIN_FRACTION;
use crate::error::Result;
use crate::resample::{ResampleMethod, ResampleRequest};

/// Default number of spatial indices kept in memory.
pub const DEFAULT_INDEX_CACHE_CAPACITY: usize = 16;

/// Default number of points along a discretized transect.
pub const DEFAULT_TRANSECT_POINTS: usize = 100;

/// Configuration for the grid resampler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResamplerConfig {
    /// Maximum number of cached spatial indices.
    pub index_cache_capacity: usize,

    /// Resampling method.
    pub method: ResampleMethod,

    /// Neighbour count for inverse-square weighting.
    pub neighbours: usize,

    /// Radius of influence in meters.
    pub radius_of_influence_m: f64,

    /// Fraction of the covered span added around read windows.
    pub bbox_margin_fraction: f64,

    /// Points along a discretized transect.
    pub transect_points: usize,
}

impl Default for ResamplerConfig {
    fn default() -> Self {
        let request = ResampleRequest::default();
        Self {
            index_cache_capacity: DEFAULT_INDEX_CACHE_CAPACITY,
            method: request.method,
            neighbours: request.neighbours,
            radius_of_influence_m: request.radius_of_influence,
            bbox_margin_fraction: DEFAULT_MARGIN_FRACTION,
            transect_points: DEFAULT_TRANSECT_POINTS,
        }
    }
}

impl ResamplerConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables keep their defaults; an unknown
    /// `RESAMPLE_METHOD` is logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("INDEX_CACHE_CAPACITY") {
            if let Ok(capacity) = val.parse() {
                config.index_cache_capacity = capacity;
            }
        }

        if let Ok(val) = std::env::var("RESAMPLE_METHOD") {
            match val.parse() {
                Ok(method) => config.method = method,
                Err(e) => tracing::warn!(error = %e, "Ignoring RESAMPLE_METHOD"),
            }
        }

        if let Ok(val) = std::env::var("RESAMPLE_NEIGHBOURS") {
            if let Ok(n) = val.parse() {
                config.neighbours = n;
            }
        }

        if let Ok(val) = std::env::var("RESAMPLE_RADIUS_M") {
            if let Ok(radius) = val.parse() {
                config.radius_of_influence_m = radius;
            }
        }

        if let Ok(val) = std::env::var("BBOX_MARGIN_FRACTION") {
            if let Ok(margin) = val.parse() {
                config.bbox_margin_fraction = margin;
            }
        }

        if let Ok(val) = std::env::var("TRANSECT_POINTS") {
            if let Ok(n) = val.parse() {
                config.transect_points = n;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.index_cache_capacity == 0 {
            return Err("index_cache_capacity must be > 0".to_string());
        }

        if self.neighbours == 0 {
            return Err("neighbours must be > 0".to_string());
        }

        if !(self.radius_of_influence_m > 0.0) || !self.radius_of_influence_m.is_finite() {
            return Err("radius_of_influence_m must be a positive number".to_string());
        }

        if !(0.0..=10.0).contains(&self.bbox_margin_fraction) {
            return Err("bbox_margin_fraction must be between 0 and 10".to_string());
        }

        if self.transect_points < 2 {
            return Err("transect_points must be >= 2".to_string());
        }

        Ok(())
    }

    /// The resample request described by this configuration.
    pub fn request(&self) -> Result<ResampleRequest> {
        ResampleRequest::new(self.method, self.neighbours, self.radius_of_influence_m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = ResamplerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.method, ResampleMethod::InverseSquare);
        assert_eq!(config.request().unwrap().effective_neighbours(), 8);
    }

    #[test]
    fn test_validate_rejects() {
        let mut config = ResamplerConfig::default();
        config.radius_of_influence_m = 0.0;
        assert!(config.validate().is_err());

        let mut config = ResamplerConfig::default();
        config.transect_points = 1;
        assert!(config.validate().is_err());

        let mut config = ResamplerConfig::default();
        config.index_cache_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_roundtrip_yaml() {
        let yaml = "index_cache_capacity: 4\nmethod: bilinear\nneighbours: 4\nradius_of_influence_m: 5000.0\nbbox_margin_fraction: 0.5\ntransect_points: 20\n";
        let config: ResamplerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.method, ResampleMethod::Bilinear);
        assert_eq!(config.transect_points, 20);
        assert!(config.validate().is_ok());
    }
}
