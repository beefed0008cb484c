//! Nearest-Neighbour Resampling for Curvilinear Ocean-Model Grids
//!
//! This crate turns values on a model's native grid (regular, rotated or
//! fully curvilinear) into values at arbitrary target points. It enables:
//!
//! - **Grid-agnostic lookup**: neighbours are found on the unit sphere, so
//!   grid layout and longitude convention do not matter
//! - **Windowed reads**: only the index-space window around a query is read
//! - **Index reuse**: built spatial indices live in a shared LRU cache
//!
//! # Architecture
//!
//! ```text
//! Transect / hovmöller / path query
//!      │
//!      ▼
//! TransectEngine
//!      │
//!      ├─► discretize(waypoints, n)          great-circle sampling
//!      │
//!      ├─► SpatialIndexCache::get_or_build   keyed by source id
//!      │         │
//!      │         ├─► Cache hit: shared Arc<SpatialIndex>
//!      │         │
//!      │         └─► Cache miss: build R*-tree over unit vectors
//!      │
//!      ├─► neighbour query ─► IndexWindow (wraps at the seam)
//!      │
//!      ├─► DatasetReader::read_window
//!      │
//!      ├─► fill_invalid_shift ─► Resampler (per level / timestep)
//!      │
//!      └─► TimeAxis::align ─► temporal blend
//!               │
//!               ▼
//!          serializable result
//! ```
//!
//! # Example
//!
//! ```ignore
//! use grid_resampler::{MemoryDataset, ResamplerConfig, SpatialIndexCache, TransectEngine};
//! use ocean_common::{LatLon, TimeSelector};
//!
//! let dataset = MemoryDataset::from_path("model.json")?;
//! let config = ResamplerConfig::from_env();
//! let cache = SpatialIndexCache::new(config.index_cache_capacity);
//!
//! let engine = TransectEngine::from_config(&dataset, &cache, &config)?;
//! let section = engine.transect(
//!     &[LatLon::new(44.4, -63.3), LatLon::new(42.5, -61.4)],
//!     "temperature",
//!     TimeSelector::Index(0),
//!     config.transect_points,
//! )?;
//! ```

pub mod bbox;
pub mod cache;
pub mod config;
pub mod error;
pub mod operations;
pub mod path;
pub mod reader;
pub mod resample;
pub mod spatial_index;
pub mod temporal;
pub mod types;

// Re-export commonly used types at crate root
pub use bbox::{ColumnSpan, IndexWindow};
pub use cache::SpatialIndexCache;
pub use config::ResamplerConfig;
pub use error::{ResampleError, Result};
pub use operations::{
    CancelFlag, HovmollerResult, PathResult, SurfaceTransectResult, TransectEngine,
    TransectResult, VelocityTransectResult,
};
pub use path::{discretize, discretize_with_time, DiscretizedPath};
pub use reader::{BathymetryProvider, DatasetReader, DepthSlice, MemoryDataset, MemoryVariable};
pub use resample::{fill_invalid_shift, resample, ResampleMethod, ResampleRequest, Resampler};
pub use spatial_index::{Neighbour, SpatialIndex};
pub use temporal::{TimeAxis, TimeBracket};
pub use types::{CacheStats, DepthAxis, GridCoordinates, MaskedArray};
