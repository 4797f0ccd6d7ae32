//! Detector configuration file (TOML).
//!
//! ```toml
//! [detectors.ET]
//! latitude = 40.5        # degrees
//! longitude = 9.4        # degrees
//! arm_azimuth = 70.6     # degrees from north towards east
//! opening_angle = 60.0   # degrees, default 90
//! f_min = 2.0
//! f_max = 1024.0
//! n_frequencies = 1000   # default 1000
//! duty_factor = 0.85     # default 1.0
//! duty_segment_s = 3600  # default 3600
//! psd_file = "psd/et.txt"          # relative to this file
//! # or inline: psd = [[2.0, 1e-42], [1024.0, 1e-49]]
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::CbcError;
use crate::math::geomspace;
use crate::network::{Detector, DetectorGeometry, DutyCycle, Network, NoiseCurve};

#[derive(Debug, Clone, Deserialize)]
pub struct DetectorFile {
    pub detectors: BTreeMap<String, DetectorConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DetectorConfig {
    pub latitude: f64,
    pub longitude: f64,
    pub arm_azimuth: f64,
    #[serde(default = "default_opening_angle")]
    pub opening_angle: f64,
    pub f_min: f64,
    pub f_max: f64,
    #[serde(default = "default_n_frequencies")]
    pub n_frequencies: usize,
    #[serde(default = "default_duty_factor")]
    pub duty_factor: f64,
    #[serde(default = "default_duty_segment")]
    pub duty_segment_s: f64,
    #[serde(default)]
    pub psd_file: Option<PathBuf>,
    #[serde(default)]
    pub psd: Option<Vec<[f64; 2]>>,
}

fn default_opening_angle() -> f64 {
    90.0
}

fn default_n_frequencies() -> usize {
    1000
}

fn default_duty_factor() -> f64 {
    1.0
}

fn default_duty_segment() -> f64 {
    3600.0
}

impl DetectorFile {
    pub fn load(path: &Path) -> Result<Self, CbcError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CbcError::Config(format!("unable to open config file '{}': {e}", path.display()))
        })?;
        let mut file = Self::parse(&content)?;

        // PSD files are resolved against the config file's directory.
        let base = path.parent().unwrap_or(Path::new("."));
        for det in file.detectors.values_mut() {
            if let Some(psd) = det.psd_file.as_mut() {
                if psd.is_relative() {
                    *psd = base.join(&*psd);
                }
            }
        }
        Ok(file)
    }

    pub fn parse(content: &str) -> Result<Self, CbcError> {
        toml::from_str(content).map_err(|e| CbcError::Config(format!("failed to parse config file: {e}")))
    }

    /// Build the network for `ids`, in the given order.
    pub fn build_network(&self, ids: &[String]) -> Result<Network, CbcError> {
        let detectors = ids
            .iter()
            .map(|id| {
                let config = self.detectors.get(id).ok_or_else(|| {
                    let known: Vec<&str> = self.detectors.keys().map(String::as_str).collect();
                    CbcError::Config(format!("unknown detector '{id}' (configured: {})", known.join(", ")))
                })?;
                config.build(id)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let network = Network::new(detectors)?;
        info!(detectors = ?network.ids(), "network built");
        Ok(network)
    }
}

impl DetectorConfig {
    pub fn build(&self, id: &str) -> Result<Detector, CbcError> {
        if !(self.f_min.is_finite() && self.f_min > 0.0 && self.f_max > self.f_min) {
            return Err(CbcError::Config(format!(
                "Detector {id}: invalid frequency range {}..{} Hz",
                self.f_min, self.f_max
            )));
        }

        let noise = match (&self.psd_file, &self.psd) {
            (Some(path), None) => NoiseCurve::read_file(path)?,
            (None, Some(pairs)) => NoiseCurve::from_pairs(pairs.clone())?,
            _ => {
                return Err(CbcError::Config(format!(
                    "Detector {id}: exactly one of `psd_file` or `psd` must be set"
                )));
            }
        };
        if noise.min_frequency() > self.f_min || noise.max_frequency() < self.f_max {
            debug!(
                detector = id,
                "noise curve does not cover the frequency grid; end values are extended"
            );
        }

        let geometry = DetectorGeometry {
            latitude: self.latitude.to_radians(),
            longitude: self.longitude.to_radians(),
            arm_azimuth: self.arm_azimuth.to_radians(),
            opening_angle: self.opening_angle.to_radians(),
        };
        let duty_cycle = DutyCycle {
            factor: self.duty_factor,
            segment_s: self.duty_segment_s,
            seed: detector_seed(id),
        };
        let frequencies = geomspace(self.f_min, self.f_max, self.n_frequencies);
        Detector::new(id, geometry, frequencies, &noise, duty_cycle)
    }
}

/// Duty-cycle seed derived from the detector id (64-bit FNV-1a), stable
/// across builds and platforms.
fn detector_seed(id: &str) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;
    id.bytes()
        .fold(FNV_OFFSET, |hash, b| (hash ^ u64::from(b)).wrapping_mul(FNV_PRIME))
}
