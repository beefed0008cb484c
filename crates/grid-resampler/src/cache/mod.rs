//! Cache implementations for grid resampling.

mod index_cache;

pub use index_cache::SpatialIndexCache;
