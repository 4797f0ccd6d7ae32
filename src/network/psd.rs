//! Detector noise curves.
//!
//! A noise curve is a table of one-sided power spectral density values. It is
//! sampled onto a detector's frequency grid once, at network construction.

use std::fs;
use std::path::Path;

use crate::error::CbcError;
use crate::math::interp_loglog;

/// Tabulated one-sided PSD (1/Hz) against frequency (Hz).
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseCurve {
    frequencies: Vec<f64>,
    psd: Vec<f64>,
}

impl NoiseCurve {
    /// Build from `(frequency, psd)` pairs; they are sorted by frequency.
    pub fn from_pairs(mut pairs: Vec<[f64; 2]>) -> Result<Self, CbcError> {
        if pairs.len() < 2 {
            return Err(CbcError::Config("Noise curve needs at least two points.".to_string()));
        }
        if pairs
            .iter()
            .any(|[f, s]| !(f.is_finite() && s.is_finite() && *f > 0.0 && *s > 0.0))
        {
            return Err(CbcError::Config(
                "Noise curve frequencies and PSD values must be finite and > 0.".to_string(),
            ));
        }
        pairs.sort_by(|a, b| a[0].partial_cmp(&b[0]).unwrap_or(std::cmp::Ordering::Equal));
        if pairs.windows(2).any(|w| w[0][0] == w[1][0]) {
            return Err(CbcError::Config("Noise curve has duplicate frequencies.".to_string()));
        }

        let (frequencies, psd) = pairs.into_iter().map(|[f, s]| (f, s)).unzip();
        Ok(Self { frequencies, psd })
    }

    /// Read a whitespace-separated two-column text file. `#` starts a comment.
    pub fn read_file(path: &Path) -> Result<Self, CbcError> {
        let content = fs::read_to_string(path).map_err(|e| {
            CbcError::Config(format!("Failed to read noise curve '{}': {e}", path.display()))
        })?;

        let mut pairs = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let mut cols = line.split_whitespace().map(str::parse::<f64>);
            match (cols.next(), cols.next()) {
                (Some(Ok(f)), Some(Ok(s))) => pairs.push([f, s]),
                _ => {
                    return Err(CbcError::Config(format!(
                        "{}:{}: expected two numeric columns",
                        path.display(),
                        idx + 1
                    )));
                }
            }
        }
        Self::from_pairs(pairs)
    }

    pub fn min_frequency(&self) -> f64 {
        self.frequencies[0]
    }

    pub fn max_frequency(&self) -> f64 {
        self.frequencies[self.frequencies.len() - 1]
    }

    /// PSD at a single frequency (log-log interpolation, clamped at the ends).
    pub fn psd_at(&self, frequency: f64) -> f64 {
        interp_loglog(&self.frequencies, &self.psd, frequency)
    }

    pub fn sample(&self, grid: &[f64]) -> Vec<f64> {
        grid.iter().map(|&f| self.psd_at(f)).collect()
    }
}
