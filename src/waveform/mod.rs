//! Frequency-domain waveform generation.
//!
//! Models form a closed set: [`WaveformModel`] is resolved from its id once at
//! startup, so an unknown id fails before any event is processed.

use std::fmt;
use std::str::FromStr;

use num_complex::Complex64;
use serde::Serialize;

use crate::domain::Event;
use crate::error::CbcError;

pub mod taylorf2;

use taylorf2::PhaseOrder;

/// An event outside a model's valid parameter domain.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{0}")]
pub struct InvalidEvent(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WaveformModel {
    /// Leading-order (quadrupole) phase.
    Newtonian,
    /// Non-spinning phase through second post-Newtonian order.
    TaylorF2,
}

impl WaveformModel {
    pub fn name(self) -> &'static str {
        match self {
            WaveformModel::Newtonian => "newtonian",
            WaveformModel::TaylorF2 => "taylorf2",
        }
    }

    pub fn generate(self, event: &Event, ctx: &GenerationContext<'_>) -> Result<Waveform, InvalidEvent> {
        match self {
            WaveformModel::Newtonian => taylorf2::generate(event, ctx, PhaseOrder::Newtonian),
            WaveformModel::TaylorF2 => taylorf2::generate(event, ctx, PhaseOrder::TwoPn),
        }
    }
}

impl fmt::Display for WaveformModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WaveformModel {
    type Err = CbcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "newtonian" => Ok(WaveformModel::Newtonian),
            "taylorf2" => Ok(WaveformModel::TaylorF2),
            _ => Err(CbcError::UnknownWaveformModel(s.to_string())),
        }
    }
}

/// Per-detector inputs to waveform generation.
#[derive(Debug, Clone, Copy)]
pub struct GenerationContext<'a> {
    pub frequencies: &'a [f64],
    /// Frequency (Hz) at which the event's `phase` is defined.
    pub f_ref: f64,
    /// Time the `2πf t_c` phase term is measured from.
    ///
    /// Kept fixed while an event's parameters are perturbed so the linear
    /// phase stays small and differentiable.
    pub time_origin: f64,
}

/// Polarizations on the context's frequency grid plus the time-frequency
/// track `t(f)` (GPS seconds) of the inspiral.
#[derive(Debug, Clone)]
pub struct Waveform {
    pub plus: Vec<Complex64>,
    pub cross: Vec<Complex64>,
    pub t_of_f: Vec<f64>,
}

impl Waveform {
    pub fn len(&self) -> usize {
        self.plus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plus.is_empty()
    }
}
