//! In-memory dataset, loadable from JSON or YAML.

use chrono::{DateTime, Utc};
use ocean_common::time::Quantum;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use super::{BathymetryProvider, DatasetReader, DepthSlice};
use crate::bbox::IndexWindow;
use crate::error::{ResampleError, Result};
use crate::types::{GridCoordinates, MaskedArray};

/// One variable's values, laid out `(time, depth, y, x)` in row-major order.
///
/// `null` entries are masked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryVariable {
    #[serde(default)]
    pub depths: Vec<f64>,
    pub data: Vec<Option<f32>>,
}

impl MemoryVariable {
    fn levels(&self) -> usize {
        self.depths.len().max(1)
    }
}

/// A complete dataset held in memory.
///
/// With `shape` unset, `latitude` and `longitude` are 1D axes of a regular
/// grid; with `shape` set they are flattened 2D arrays of that shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryDataset {
    pub id: String,
    pub latitude: Vec<f64>,
    pub longitude: Vec<f64>,
    #[serde(default)]
    pub shape: Option<(usize, usize)>,
    pub timestamps: Vec<DateTime<Utc>>,
    #[serde(default)]
    pub quantum: Quantum,
    #[serde(default)]
    pub variables: HashMap<String, MemoryVariable>,
    /// Sea-floor depth per grid cell, meters positive down.
    #[serde(default)]
    pub bathymetry: Option<Vec<Option<f32>>>,
}

impl MemoryDataset {
    /// Dataset on a regular grid described by 1D axes.
    pub fn regular(
        id: impl Into<String>,
        lat_axis: Vec<f64>,
        lon_axis: Vec<f64>,
        timestamps: Vec<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: id.into(),
            latitude: lat_axis,
            longitude: lon_axis,
            shape: None,
            timestamps,
            quantum: Quantum::default(),
            variables: HashMap::new(),
            bathymetry: None,
        }
    }

    /// Dataset on a curvilinear grid given as flattened 2D arrays.
    pub fn curvilinear(
        id: impl Into<String>,
        lat: Vec<f64>,
        lon: Vec<f64>,
        shape: (usize, usize),
        timestamps: Vec<DateTime<Utc>>,
    ) -> Self {
        Self {
            shape: Some(shape),
            ..Self::regular(id, lat, lon, timestamps)
        }
    }

    pub fn with_quantum(mut self, quantum: Quantum) -> Self {
        self.quantum = quantum;
        self
    }

    /// Add a variable. `values` is `(time, depth, y, x)`; NaN is masked.
    pub fn with_variable(mut self, name: impl Into<String>, depths: Vec<f64>, values: Vec<f32>) -> Self {
        let data = values
            .into_iter()
            .map(|v| if v.is_finite() { Some(v) } else { None })
            .collect();
        self.variables
            .insert(name.into(), MemoryVariable { depths, data });
        self
    }

    pub fn with_bathymetry(mut self, floor: Vec<f32>) -> Self {
        self.bathymetry = Some(
            floor
                .into_iter()
                .map(|v| if v.is_finite() { Some(v) } else { None })
                .collect(),
        );
        self
    }

    /// Horizontal grid shape `(ny, nx)`.
    pub fn grid_shape(&self) -> (usize, usize) {
        self.shape
            .unwrap_or((self.latitude.len(), self.longitude.len()))
    }

    /// Load from a `.json`, `.yaml` or `.yml` file and validate.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let dataset: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&text)?,
            _ => serde_json::from_str(&text)?,
        };
        dataset.validate()?;
        tracing::debug!(
            path = %path.display(),
            id = %dataset.id,
            variables = dataset.variables.len(),
            "Loaded dataset"
        );
        Ok(dataset)
    }

    /// Check that every array matches the grid and time axis.
    pub fn validate(&self) -> Result<()> {
        let (ny, nx) = self.grid_shape();
        if self.shape.is_some()
            && (self.latitude.len() != ny * nx || self.longitude.len() != ny * nx)
        {
            return Err(ResampleError::shape_mismatch(
                (ny, nx),
                (self.latitude.len(), self.longitude.len()),
            ));
        }
        self.time_axis()?;

        let nt = self.timestamps.len();
        for (name, var) in &self.variables {
            let expected = nt * var.levels() * ny * nx;
            if var.data.len() != expected {
                return Err(ResampleError::dataset(format!(
                    "variable {} has {} values, expected {} (time={}, depth={}, y={}, x={})",
                    name,
                    var.data.len(),
                    expected,
                    nt,
                    var.levels(),
                    ny,
                    nx
                )));
            }
        }

        if let Some(floor) = &self.bathymetry {
            if floor.len() != ny * nx {
                return Err(ResampleError::shape_mismatch((ny, nx), floor.len()));
            }
        }
        Ok(())
    }

    fn variable(&self, name: &str) -> Result<&MemoryVariable> {
        self.variables
            .get(name)
            .ok_or_else(|| ResampleError::VariableNotFound(name.to_string()))
    }

    fn check_window(&self, window: &IndexWindow) -> Result<()> {
        let (ny, nx) = self.grid_shape();
        let max_col = window.column_indices().into_iter().max().unwrap_or(0);
        if window.max_row >= ny || max_col >= nx {
            return Err(ResampleError::dataset(format!(
                "window rows {}..={} / max column {} outside grid {}x{}",
                window.min_row, window.max_row, max_col, ny, nx
            )));
        }
        Ok(())
    }

    /// Append the window cells of the 2D plane starting at offset `base`.
    fn gather(&self, cells: &[Option<f32>], base: usize, window: &IndexWindow, out: &mut Vec<Option<f32>>) {
        let nx = self.grid_shape().1;
        let cols = window.column_indices();
        for row in window.rows() {
            for &col in &cols {
                out.push(cells[base + row * nx + col]);
            }
        }
    }
}

impl DatasetReader for MemoryDataset {
    fn source_id(&self) -> &str {
        &self.id
    }

    fn coordinates(&self) -> Result<GridCoordinates> {
        match self.shape {
            Some(shape) => GridCoordinates::new(self.latitude.clone(), self.longitude.clone(), shape),
            None => Ok(GridCoordinates::from_axes(&self.latitude, &self.longitude)),
        }
    }

    fn timestamps(&self) -> Result<Vec<DateTime<Utc>>> {
        Ok(self.timestamps.clone())
    }

    fn quantum(&self) -> Quantum {
        self.quantum
    }

    fn depths(&self, variable: &str) -> Result<Vec<f64>> {
        Ok(self.variable(variable)?.depths.clone())
    }

    fn read_window(
        &self,
        variable: &str,
        time_index: usize,
        depth: DepthSlice,
        window: &IndexWindow,
    ) -> Result<MaskedArray<f32>> {
        let var = self.variable(variable)?;
        let nt = self.timestamps.len();
        if time_index >= nt {
            return Err(ResampleError::TimeIndexOutOfRange {
                index: time_index,
                len: nt,
            });
        }
        self.check_window(window)?;

        let nz = var.levels();
        let levels: Vec<usize> = match depth {
            DepthSlice::All => (0..nz).collect(),
            DepthSlice::Level(k) if k < nz => vec![k],
            DepthSlice::Level(k) => return Err(ResampleError::DepthOutOfRange { index: k, len: nz }),
        };

        let (ny, nx) = self.grid_shape();
        let plane = ny * nx;
        let mut cells = Vec::with_capacity(levels.len() * window.len());
        for &k in &levels {
            self.gather(&var.data, (time_index * nz + k) * plane, window, &mut cells);
        }

        let (rows, cols) = window.shape();
        MaskedArray::from_options(&cells, vec![levels.len(), rows, cols])
    }
}

impl BathymetryProvider for MemoryDataset {
    fn floor_depth(&self, window: &IndexWindow) -> Result<MaskedArray<f32>> {
        let floor = self
            .bathymetry
            .as_ref()
            .ok_or_else(|| ResampleError::dataset(format!("dataset {} has no bathymetry", self.id)))?;
        self.check_window(window)?;

        let mut cells = Vec::with_capacity(window.len());
        self.gather(floor, 0, window, &mut cells);
        let (rows, cols) = window.shape();
        MaskedArray::from_options(&cells, vec![rows, cols])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::ColumnSpan;
    use chrono::TimeZone;

    fn dataset() -> MemoryDataset {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        // 2 times x 2 depths x 2 rows x 3 cols, value = flat index
        let values: Vec<f32> = (0..24).map(|i| i as f32).collect();
        MemoryDataset::regular(
            "mem",
            vec![0.0, 1.0],
            vec![0.0, 1.0, 2.0],
            vec![t0, t0 + chrono::Duration::hours(1)],
        )
        .with_variable("temp", vec![0.0, 10.0], values)
        .with_variable("ssh", vec![], vec![0.5; 12])
    }

    #[test]
    fn test_read_full_window() {
        let ds = dataset();
        let w = IndexWindow::full(ds.grid_shape());
        let slab = ds.read_window("temp", 1, DepthSlice::All, &w).unwrap();
        assert_eq!(slab.shape(), &[2, 2, 3]);
        assert_eq!(slab.get(0), Some(12.0));
        assert_eq!(slab.get_nd(&[1, 1, 2]), Some(23.0));
    }

    #[test]
    fn test_read_wrapped_window() {
        let ds = dataset();
        let w = IndexWindow {
            min_row: 1,
            max_row: 1,
            cols: ColumnSpan::Wrapped {
                start: 2,
                end: 0,
                nx: 3,
            },
        };
        let slab = ds.read_window("temp", 0, DepthSlice::Level(0), &w).unwrap();
        assert_eq!(slab.shape(), &[1, 1, 2]);
        assert_eq!(slab.to_options(), vec![Some(5.0), Some(3.0)]);
    }

    #[test]
    fn test_surface_variable_has_one_level() {
        let ds = dataset();
        assert!(ds.depths("ssh").unwrap().is_empty());
        let w = IndexWindow::full(ds.grid_shape());
        let slab = ds.read_window("ssh", 0, DepthSlice::All, &w).unwrap();
        assert_eq!(slab.shape(), &[1, 2, 3]);
    }

    #[test]
    fn test_read_errors() {
        let ds = dataset();
        let w = IndexWindow::full(ds.grid_shape());
        assert!(matches!(
            ds.read_window("salt", 0, DepthSlice::All, &w),
            Err(ResampleError::VariableNotFound(_))
        ));
        assert!(matches!(
            ds.read_window("temp", 2, DepthSlice::All, &w),
            Err(ResampleError::TimeIndexOutOfRange { .. })
        ));
        assert!(matches!(
            ds.read_window("temp", 0, DepthSlice::Level(2), &w),
            Err(ResampleError::DepthOutOfRange { index: 2, len: 2 })
        ));
        assert!(ds.floor_depth(&w).is_err());
    }

    #[test]
    fn test_validate_catches_bad_lengths() {
        let mut ds = dataset();
        assert!(ds.validate().is_ok());
        ds.variables.get_mut("ssh").unwrap().data.pop();
        assert!(ds.validate().is_err());
    }

    #[test]
    fn test_load_json_and_yaml() {
        let ds = dataset().with_bathymetry(vec![100.0; 6]);
        let dir = tempfile::tempdir().unwrap();

        let json_path = dir.path().join("ds.json");
        std::fs::write(&json_path, serde_json::to_string(&ds).unwrap()).unwrap();
        assert_eq!(MemoryDataset::from_path(&json_path).unwrap(), ds);

        let yaml_path = dir.path().join("ds.yaml");
        std::fs::write(&yaml_path, serde_yaml::to_string(&ds).unwrap()).unwrap();
        assert_eq!(MemoryDataset::from_path(&yaml_path).unwrap(), ds);
    }
}
