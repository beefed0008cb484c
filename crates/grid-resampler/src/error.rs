//! Error types for grid resampling.

use thiserror::Error;

/// Errors that can occur while indexing, discretizing or resampling.
///
/// Data sparsity (no neighbours within the radius, query times far outside
/// the axis) is never an error; it shows up as masked output instead.
#[derive(Error, Debug)]
pub enum ResampleError {
    /// A path needs at least two waypoints.
    #[error("a path needs at least 2 waypoints, got {0}")]
    TooFewWaypoints(usize),

    /// Two consecutive waypoints are the same point.
    #[error("waypoints {index} and {} coincide", .index + 1)]
    CoincidentWaypoints { index: usize },

    /// Waypoints and timestamps must pair up one to one.
    #[error("{waypoints} waypoints but {times} timestamps")]
    TimeCountMismatch { waypoints: usize, times: usize },

    /// Unrecognized resampling method name.
    #[error("unknown resampling method: {0}")]
    UnknownMethod(String),

    /// Resample parameters out of range.
    #[error("invalid resample request: {0}")]
    InvalidRequest(String),

    /// Time axis is empty.
    #[error("time axis is empty")]
    EmptyTimeAxis,

    /// Time axis is not strictly increasing.
    #[error("time axis is not strictly increasing at index {index}")]
    NonMonotonicTimeAxis { index: usize },

    /// Discrete time index past the end of the axis.
    #[error("time index {index} out of range for axis of length {len}")]
    TimeIndexOutOfRange { index: usize, len: usize },

    /// Timestamp more than half a step outside the axis.
    #[error("time {0} is outside the dataset time axis")]
    TimeOutOfRange(String),

    /// Depth index past the deepest level.
    #[error("depth index {index} out of range for {len} levels")]
    DepthOutOfRange { index: usize, len: usize },

    /// Array shapes disagree.
    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// The dataset has no such variable.
    #[error("variable not found: {0}")]
    VariableNotFound(String),

    /// Failure reported by the dataset reader.
    #[error("dataset error: {0}")]
    Dataset(String),

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,
}

impl ResampleError {
    /// Create a ShapeMismatch error.
    pub fn shape_mismatch(expected: impl std::fmt::Debug, actual: impl std::fmt::Debug) -> Self {
        Self::ShapeMismatch {
            expected: format!("{:?}", expected),
            actual: format!("{:?}", actual),
        }
    }

    /// Create a Dataset error.
    pub fn dataset(msg: impl Into<String>) -> Self {
        Self::Dataset(msg.into())
    }

    /// Whether the error stems from caller input rather than data or I/O.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::TooFewWaypoints(_)
                | Self::CoincidentWaypoints { .. }
                | Self::TimeCountMismatch { .. }
                | Self::UnknownMethod(_)
                | Self::InvalidRequest(_)
                | Self::TimeIndexOutOfRange { .. }
                | Self::TimeOutOfRange(_)
                | Self::DepthOutOfRange { .. }
                | Self::VariableNotFound(_)
        )
    }
}

impl From<std::io::Error> for ResampleError {
    fn from(err: std::io::Error) -> Self {
        Self::Dataset(err.to_string())
    }
}

impl From<serde_json::Error> for ResampleError {
    fn from(err: serde_json::Error) -> Self {
        Self::Dataset(err.to_string())
    }
}

impl From<serde_yaml::Error> for ResampleError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Dataset(err.to_string())
    }
}

/// Result type for resampling operations.
pub type Result<T> = std::result::Result<T, ResampleError>;
