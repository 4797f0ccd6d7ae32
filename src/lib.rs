//! `cbc-sim` library crate.
//!
//! The binary (`cbc-sim`) is a thin wrapper around this library so that:
//!
//! - the physics is testable without spawning processes
//! - the pipeline and the subset analysis can be driven from other tools
//!
//! Data flows one way: `io` loads a population and a detector network,
//! `pipeline` fills per-detector SNR and Fisher buffers (using `waveform`,
//! `signal`, `fisher`), and `analysis` re-aggregates those buffers for each
//! requested detector subset.

pub mod analysis;
pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod fisher;
pub mod io;
pub mod math;
pub mod network;
pub mod pipeline;
pub mod report;
pub mod signal;
pub mod waveform;
