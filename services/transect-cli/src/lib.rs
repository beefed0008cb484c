//! Transect CLI Library
//!
//! Runs transect, hovmöller and track queries against a dataset file and
//! writes the results as JSON through a bounded writer pool.

pub mod config;
pub mod persist;
pub mod run;

pub use config::CliConfig;
pub use persist::{PersistPool, PersistSummary};
pub use run::{load_batch, BatchItem, Operation, Runner};
