//! Shared domain types.
//!
//! These types are kept small and serializable so they can be:
//!
//! - loaded from the population file
//! - perturbed during Fisher-matrix differentiation
//! - echoed back into the JSON run summary

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::CbcError;

/// `G * M_sun / c^3` in seconds.
pub const MSUN_SECONDS: f64 = 4.925_490_947_641_267e-6;

/// One megaparsec expressed in light-seconds.
pub const MPC_SECONDS: f64 = 1.029_271_250_815_609e14;

/// Reference frequency (Hz) at which the orbital phase parameter is defined.
pub const DEFAULT_F_REF: f64 = 50.0;

/// One simulated compact-binary coalescence.
///
/// Masses are source-frame solar masses; the detector sees `m * (1 + z)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub mass_1: f64,
    pub mass_2: f64,
    #[serde(default)]
    pub redshift: f64,
    /// Mpc.
    pub luminosity_distance: f64,
    pub ra: f64,
    pub dec: f64,
    pub psi: f64,
    pub theta_jn: f64,
    /// GPS seconds.
    pub geocent_time: f64,
    pub phase: f64,
}

impl Event {
    pub fn detector_frame_masses(&self) -> (f64, f64) {
        let zf = 1.0 + self.redshift;
        (self.mass_1 * zf, self.mass_2 * zf)
    }

    pub fn total_mass(&self) -> f64 {
        self.mass_1 + self.mass_2
    }
}

/// A named event parameter.
///
/// Names match the population file's column headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parameter {
    Mass1,
    Mass2,
    Redshift,
    LuminosityDistance,
    Ra,
    Dec,
    Psi,
    ThetaJn,
    GeocentTime,
    Phase,
}

impl Parameter {
    pub const ALL: [Parameter; 10] = [
        Parameter::Mass1,
        Parameter::Mass2,
        Parameter::Redshift,
        Parameter::LuminosityDistance,
        Parameter::Ra,
        Parameter::Dec,
        Parameter::Psi,
        Parameter::ThetaJn,
        Parameter::GeocentTime,
        Parameter::Phase,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Parameter::Mass1 => "mass_1",
            Parameter::Mass2 => "mass_2",
            Parameter::Redshift => "redshift",
            Parameter::LuminosityDistance => "luminosity_distance",
            Parameter::Ra => "ra",
            Parameter::Dec => "dec",
            Parameter::Psi => "psi",
            Parameter::ThetaJn => "theta_jn",
            Parameter::GeocentTime => "geocent_time",
            Parameter::Phase => "phase",
        }
    }

    /// Columns that may be absent from the population file.
    pub fn is_optional(self) -> bool {
        matches!(self, Parameter::Redshift)
    }

    pub fn get(self, event: &Event) -> f64 {
        match self {
            Parameter::Mass1 => event.mass_1,
            Parameter::Mass2 => event.mass_2,
            Parameter::Redshift => event.redshift,
            Parameter::LuminosityDistance => event.luminosity_distance,
            Parameter::Ra => event.ra,
            Parameter::Dec => event.dec,
            Parameter::Psi => event.psi,
            Parameter::ThetaJn => event.theta_jn,
            Parameter::GeocentTime => event.geocent_time,
            Parameter::Phase => event.phase,
        }
    }

    /// Return a copy of `event` with this parameter replaced by `value`.
    pub fn with(self, event: &Event, value: f64) -> Event {
        let mut out = *event;
        match self {
            Parameter::Mass1 => out.mass_1 = value,
            Parameter::Mass2 => out.mass_2 = value,
            Parameter::Redshift => out.redshift = value,
            Parameter::LuminosityDistance => out.luminosity_distance = value,
            Parameter::Ra => out.ra = value,
            Parameter::Dec => out.dec = value,
            Parameter::Psi => out.psi = value,
            Parameter::ThetaJn => out.theta_jn = value,
            Parameter::GeocentTime => out.geocent_time = value,
            Parameter::Phase => out.phase = value,
        }
        out
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Parameter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Parameter::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown parameter '{s}'"))
    }
}

/// The ordered parameters every Fisher matrix in a run is computed over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FisherParameterSet(Vec<Parameter>);

impl FisherParameterSet {
    pub fn new(params: Vec<Parameter>) -> Result<Self, CbcError> {
        if params.is_empty() {
            return Err(CbcError::Config("Fisher parameter list is empty.".to_string()));
        }
        for (i, p) in params.iter().enumerate() {
            if params[..i].contains(p) {
                return Err(CbcError::Config(format!("Fisher parameter '{p}' listed twice.")));
            }
        }
        Ok(Self(params))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Parameter> + '_ {
        self.0.iter().copied()
    }

    pub fn as_slice(&self) -> &[Parameter] {
        &self.0
    }

    pub fn position(&self, param: Parameter) -> Option<usize> {
        self.0.iter().position(|p| *p == param)
    }
}

impl Default for FisherParameterSet {
    fn default() -> Self {
        Self(vec![
            Parameter::Ra,
            Parameter::Dec,
            Parameter::Psi,
            Parameter::ThetaJn,
            Parameter::LuminosityDistance,
            Parameter::Mass1,
            Parameter::Mass2,
        ])
    }
}

impl FromStr for FisherParameterSet {
    type Err = CbcError;

    /// Parse a comma-separated list such as `ra,dec,luminosity_distance`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let params = s
            .split(',')
            .filter(|t| !t.trim().is_empty())
            .map(|t| t.parse::<Parameter>().map_err(CbcError::Config))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(params)
    }
}

/// The simulated event table, indexed by row.
#[derive(Debug, Clone, Default)]
pub struct Population {
    pub events: Vec<Event>,
}

impl Population {
    pub fn new(events: Vec<Event>) -> Self {
        Self { events }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, k: usize) -> Option<&Event> {
        self.events.get(k)
    }
}

/// SNR thresholds.
///
/// `individual` gates whether a detector's Fisher information is used for an
/// event; `network` decides whether the (sub)network detected the event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub individual: f64,
    pub network: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            individual: 0.0,
            network: 9.0,
        }
    }
}

/// What the pipeline does when an event cannot be processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop the whole run at the first failing event.
    #[default]
    Abort,
    /// Mark the event as failed, leave its result slots empty, and continue.
    Skip,
}

/// A full run's configuration as understood by the application layer.
///
/// Derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub pop_file: PathBuf,
    pub pop_id: String,
    pub detector_ids: Vec<String>,
    pub networks: String,
    pub config_path: PathBuf,
    pub waveform_model: String,
    pub fisher_parameters: FisherParameterSet,
    pub thresholds: Thresholds,
    pub calculate_errors: bool,
    pub duty_cycle: bool,
    pub failure_policy: FailurePolicy,
    pub f_ref: f64,
    pub threads: Option<usize>,
    pub output_dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> Event {
        Event {
            mass_1: 30.0,
            mass_2: 25.0,
            redshift: 0.5,
            luminosity_distance: 2900.0,
            ra: 1.0,
            dec: -0.3,
            psi: 0.7,
            theta_jn: 0.4,
            geocent_time: 1_187_008_882.4,
            phase: 0.2,
        }
    }

    #[test]
    fn parameter_names_round_trip_through_from_str() {
        for p in Parameter::ALL {
            assert_eq!(p.name().parse::<Parameter>().unwrap(), p);
        }
        assert!("chirp_mass".parse::<Parameter>().is_err());
    }

    #[test]
    fn with_replaces_only_the_named_field() {
        let e = event();
        let shifted = Parameter::Dec.with(&e, 0.1);
        assert_eq!(shifted.dec, 0.1);
        assert_eq!(shifted.ra, e.ra);
        assert_eq!(Parameter::Dec.get(&shifted), 0.1);
    }

    #[test]
    fn detector_frame_masses_are_redshifted() {
        let (m1, m2) = event().detector_frame_masses();
        assert!((m1 - 45.0).abs() < 1e-12);
        assert!((m2 - 37.5).abs() < 1e-12);
    }

    #[test]
    fn fisher_parameter_set_rejects_duplicates_and_unknowns() {
        let set: FisherParameterSet = "ra, dec,luminosity_distance".parse().unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.position(Parameter::Dec), Some(1));

        assert!("ra,ra".parse::<FisherParameterSet>().is_err());
        assert!("ra,spin".parse::<FisherParameterSet>().is_err());
        assert!("".parse::<FisherParameterSet>().is_err());
    }
}
