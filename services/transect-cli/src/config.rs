//! Runtime configuration for the CLI.

use grid_resampler::ResamplerConfig;
use serde::{Deserialize, Serialize};

/// Default number of concurrent result writers.
pub const DEFAULT_PERSIST_WORKERS: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Resampling defaults, overridable per query.
    #[serde(default)]
    pub resampler: ResamplerConfig,

    /// Maximum number of results written concurrently.
    pub persist_workers: usize,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            resampler: ResamplerConfig::default(),
            persist_workers: DEFAULT_PERSIST_WORKERS,
        }
    }
}

impl CliConfig {
    /// Load from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self {
            resampler: ResamplerConfig::from_env(),
            ..Self::default()
        };

        if let Ok(val) = std::env::var("PERSIST_WORKERS") {
            if let Ok(workers) = val.parse() {
                config.persist_workers = workers;
            }
        }

        config
    }

    pub fn validate(&self) -> Result<(), String> {
        self.resampler.validate()?;
        if self.persist_workers == 0 {
            return Err("persist_workers must be > 0".to_string());
        }
        Ok(())
    }
}
