//! Dataset access used by the transect operations.
//!
//! File-format readers live outside this crate; they plug in by implementing
//! [`DatasetReader`]. [`MemoryDataset`] is a complete in-memory
//! implementation loadable from JSON or YAML.

mod memory;

pub use memory::{MemoryDataset, MemoryVariable};

use chrono::{DateTime, Utc};
use ocean_common::time::Quantum;

use crate::bbox::IndexWindow;
use crate::error::Result;
use crate::temporal::TimeAxis;
use crate::types::{GridCoordinates, MaskedArray};

/// Which vertical levels to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthSlice {
    All,
    Level(usize),
}

/// Read access to one gridded dataset.
pub trait DatasetReader {
    /// Stable identity of the source grid, used as the spatial index cache key.
    fn source_id(&self) -> &str;

    /// Latitude/longitude of every grid cell.
    fn coordinates(&self) -> Result<GridCoordinates>;

    /// The dataset's time axis, strictly increasing.
    fn timestamps(&self) -> Result<Vec<DateTime<Utc>>>;

    /// Granularity of the time axis.
    fn quantum(&self) -> Quantum {
        Quantum::Hour
    }

    fn time_axis(&self) -> Result<TimeAxis> {
        TimeAxis::new(self.timestamps()?, self.quantum())
    }

    /// Depth levels (meters, positive down) of a variable; empty for 2D fields.
    fn depths(&self, variable: &str) -> Result<Vec<f64>>;

    /// Read one timestep of a variable over a window.
    ///
    /// The result is shaped `(levels, rows, cols)`; 2D variables have a
    /// single level.
    fn read_window(
        &self,
        variable: &str,
        time_index: usize,
        depth: DepthSlice,
        window: &IndexWindow,
    ) -> Result<MaskedArray<f32>>;
}

/// Sea-floor depth source used to blank transect cells below the bottom.
pub trait BathymetryProvider {
    /// Floor depth (meters, positive down) over a window, shaped `(rows, cols)`.
    fn floor_depth(&self, window: &IndexWindow) -> Result<MaskedArray<f32>>;
}
