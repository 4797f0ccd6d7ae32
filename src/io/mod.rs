//! Input/output helpers.
//!
//! - population CSV ingest (`population`)
//! - detector configuration TOML (`detectors`)
//! - report exports (CSV/JSON) (`export`)

pub mod detectors;
pub mod export;
pub mod population;

pub use detectors::*;
pub use export::*;
pub use population::*;
