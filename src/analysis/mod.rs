//! Network-combination analysis.
//!
//! Runs strictly after the pipeline: it only reads the network's completed
//! result buffers and re-aggregates them for each requested detector subset.
//! Nothing is recomputed and nothing is mutated, so repeated calls give
//! identical reports.

pub mod combinations;
pub mod detections;
pub mod errors;

pub use combinations::*;
pub use detections::*;
pub use errors::*;
