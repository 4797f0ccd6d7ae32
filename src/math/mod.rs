//! Mathematical utilities: log-log interpolation and summary statistics.

pub mod interp;
pub mod stats;

pub use interp::*;
pub use stats::*;
