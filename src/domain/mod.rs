//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - source parameters (`Event`, `Parameter`, `Population`)
//! - the Fisher parameter set shared by every matrix in a run
//! - run-level settings (`Thresholds`, `FailurePolicy`, `RunConfig`)

pub mod types;

pub use types::*;
