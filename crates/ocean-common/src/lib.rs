//! Common types and utilities shared across the ocean resampling crates.

pub mod error;
pub mod geo;
pub mod query;
pub mod time;

pub use error::{QueryError, QueryResult};
pub use geo::{LatLon, EARTH_RADIUS_M};
pub use query::{DepthSelector, InterpolationParams, PathQuery, TimeSelector};
pub use time::{Quantum, TimeParseError, TimeRange};
