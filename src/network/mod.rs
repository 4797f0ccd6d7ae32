//! Detector network model.
//!
//! A [`Network`] owns its [`Detector`]s and every per-event result buffer. The
//! buffers are sized once with [`Network::allocate`] before the main loop and
//! each `(detector, event)` slot is written at most once, by
//! [`Network::commit`].

use std::collections::HashSet;

use nalgebra::{DMatrix, Matrix3, Vector3};
use serde::Serialize;
use tracing::warn;

use crate::error::CbcError;

pub mod geometry;
pub mod psd;

pub use geometry::*;
pub use psd::*;

/// Detector availability model used when duty-cycle SNR is requested.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DutyCycle {
    /// Probability that the detector is observing in any given segment.
    pub factor: f64,
    /// Segment length (s).
    pub segment_s: f64,
    /// Seed for the on/off draws of this detector.
    pub seed: u64,
}

impl Default for DutyCycle {
    fn default() -> Self {
        Self {
            factor: 1.0,
            segment_s: 3600.0,
            seed: 0,
        }
    }
}

/// One interferometer: geometry, noise, frequency grid, and result buffers.
#[derive(Debug, Clone)]
pub struct Detector {
    pub id: String,
    pub geometry: DetectorGeometry,
    pub duty_cycle: DutyCycle,
    tensor: Matrix3<f64>,
    position: Vector3<f64>,
    frequencies: Vec<f64>,
    df: Vec<f64>,
    psd: Vec<f64>,

    /// Detector SNR per event.
    pub snr: Vec<f64>,
    /// Fisher matrix per event; `None` when error estimation is disabled.
    pub fisher_matrix: Option<Vec<DMatrix<f64>>>,
}

impl Detector {
    /// Build a detector on `frequencies` (strictly increasing, Hz) with the
    /// noise curve sampled onto that grid.
    pub fn new(
        id: impl Into<String>,
        geometry: DetectorGeometry,
        frequencies: Vec<f64>,
        noise: &NoiseCurve,
        duty_cycle: DutyCycle,
    ) -> Result<Self, CbcError> {
        let id = id.into();
        if frequencies.len() < 2 {
            return Err(CbcError::Config(format!(
                "Detector {id}: frequency grid needs at least two points."
            )));
        }
        if frequencies.iter().any(|f| !(f.is_finite() && *f > 0.0))
            || frequencies.windows(2).any(|w| w[1] <= w[0])
        {
            return Err(CbcError::Config(format!(
                "Detector {id}: frequency grid must be positive and strictly increasing."
            )));
        }
        if !(0.0..=1.0).contains(&duty_cycle.factor) {
            return Err(CbcError::Config(format!(
                "Detector {id}: duty factor must lie in [0, 1]."
            )));
        }
        if !(duty_cycle.segment_s.is_finite() && duty_cycle.segment_s > 0.0) {
            return Err(CbcError::Config(format!(
                "Detector {id}: duty-cycle segment length must be > 0."
            )));
        }

        let df = bin_widths(&frequencies);
        let psd = noise.sample(&frequencies);
        Ok(Self {
            id,
            tensor: geometry.tensor(),
            position: geometry.position(),
            geometry,
            duty_cycle,
            frequencies,
            df,
            psd,
            snr: Vec::new(),
            fisher_matrix: None,
        })
    }

    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    /// Width of each frequency bin (Hz).
    pub fn df(&self) -> &[f64] {
        &self.df
    }

    /// PSD sampled on the frequency grid.
    pub fn psd(&self) -> &[f64] {
        &self.psd
    }

    pub fn tensor(&self) -> &Matrix3<f64> {
        &self.tensor
    }

    pub fn position(&self) -> &Vector3<f64> {
        &self.position
    }

    fn allocate(&mut self, n_events: usize, fisher_dim: Option<usize>) {
        self.snr = vec![0.0; n_events];
        self.fisher_matrix = fisher_dim.map(|p| vec![DMatrix::zeros(p, p); n_events]);
    }
}

/// Bin widths from forward differences; the last bin reuses the previous width.
fn bin_widths(frequencies: &[f64]) -> Vec<f64> {
    let mut df: Vec<f64> = frequencies.windows(2).map(|w| w[1] - w[0]).collect();
    if let Some(&last) = df.last() {
        df.push(last);
    }
    df
}

/// Processing state of one event slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "lowercase")]
pub enum EventStatus {
    Pending,
    Complete,
    Failed(String),
}

/// Everything the pipeline computed for one event, ready to commit.
#[derive(Debug, Clone)]
pub struct EventOutcome {
    /// Per-detector SNR, in network order.
    pub snr: Vec<f64>,
    /// Per-detector Fisher matrix, in network order, when errors are enabled.
    pub fisher: Option<Vec<DMatrix<f64>>>,
}

impl EventOutcome {
    /// Quadrature sum of the detector SNRs.
    pub fn network_snr(&self) -> f64 {
        self.snr.iter().map(|s| s * s).sum::<f64>().sqrt()
    }
}

/// Ordered, deduplicated set of detectors analyzed jointly.
#[derive(Debug, Clone, Default)]
pub struct Network {
    pub detectors: Vec<Detector>,
    /// Network SNR per event.
    pub snr: Vec<f64>,
    pub status: Vec<EventStatus>,
}

impl Network {
    /// Build a network, dropping repeated detector ids (first one wins).
    pub fn new(detectors: Vec<Detector>) -> Result<Self, CbcError> {
        if detectors.is_empty() {
            return Err(CbcError::Config("Network has no detectors.".to_string()));
        }
        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(detectors.len());
        for det in detectors {
            if seen.insert(det.id.clone()) {
                unique.push(det);
            } else {
                warn!(detector = %det.id, "duplicate detector id ignored");
            }
        }
        Ok(Self {
            detectors: unique,
            snr: Vec::new(),
            status: Vec::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.detectors.iter().map(|d| d.id.as_str()).collect()
    }

    pub fn num_events(&self) -> usize {
        self.snr.len()
    }

    /// Size every result buffer for `n_events`; resets previous results.
    ///
    /// `fisher_dim` is the Fisher parameter count, or `None` to skip the
    /// matrix buffers entirely.
    pub fn allocate(&mut self, n_events: usize, fisher_dim: Option<usize>) {
        for det in &mut self.detectors {
            det.allocate(n_events, fisher_dim);
        }
        self.snr = vec![0.0; n_events];
        self.status = vec![EventStatus::Pending; n_events];
    }

    /// Write all results for event `k` at once.
    pub fn commit(&mut self, k: usize, outcome: EventOutcome) -> Result<(), CbcError> {
        self.ensure_pending(k)?;
        if outcome.snr.len() != self.detectors.len() {
            return Err(CbcError::Numerical(format!(
                "Event {k}: expected {} detector results, got {}.",
                self.detectors.len(),
                outcome.snr.len()
            )));
        }

        self.snr[k] = outcome.network_snr();
        for (det, snr) in self.detectors.iter_mut().zip(&outcome.snr) {
            det.snr[k] = *snr;
        }
        if let Some(matrices) = outcome.fisher {
            for (det, fm) in self.detectors.iter_mut().zip(matrices) {
                if let Some(slots) = det.fisher_matrix.as_mut() {
                    slots[k] = fm;
                }
            }
        }
        self.status[k] = EventStatus::Complete;
        Ok(())
    }

    /// Mark event `k` as failed; its result slots keep their zero values.
    pub fn mark_failed(&mut self, k: usize, reason: impl Into<String>) -> Result<(), CbcError> {
        self.ensure_pending(k)?;
        self.status[k] = EventStatus::Failed(reason.into());
        Ok(())
    }

    fn ensure_pending(&self, k: usize) -> Result<(), CbcError> {
        match self.status.get(k) {
            Some(EventStatus::Pending) => Ok(()),
            Some(_) => Err(CbcError::Numerical(format!("Event {k} was already written."))),
            None => Err(CbcError::Numerical(format!(
                "Event {k} is outside the allocated range ({}).",
                self.status.len()
            ))),
        }
    }

    /// True once every event slot is either complete or failed.
    pub fn is_populated(&self) -> bool {
        !self.status.iter().any(|s| *s == EventStatus::Pending)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::f64::consts::FRAC_PI_2;

    use super::*;

    /// A small detector for tests elsewhere in the crate.
    pub(crate) fn test_detector(id: &str) -> Detector {
        let geometry = DetectorGeometry {
            latitude: 0.8,
            longitude: 0.2,
            arm_azimuth: 0.3,
            opening_angle: FRAC_PI_2,
        };
        let noise = NoiseCurve::from_pairs(vec![[1.0, 1e-40], [10.0, 1e-46], [1000.0, 1e-47]]).unwrap();
        let frequencies = crate::math::geomspace(5.0, 1024.0, 200);
        Detector::new(id, geometry, frequencies, &noise, DutyCycle::default()).unwrap()
    }

    #[test]
    fn duplicate_ids_are_dropped() {
        let net = Network::new(vec![test_detector("A"), test_detector("B"), test_detector("A")]).unwrap();
        assert_eq!(net.ids(), vec!["A", "B"]);
    }

    #[test]
    fn commit_writes_each_slot_once() {
        let mut net = Network::new(vec![test_detector("A"), test_detector("B")]).unwrap();
        net.allocate(2, Some(3));
        assert!(!net.is_populated());

        let outcome = EventOutcome {
            snr: vec![12.0, 5.0],
            fisher: Some(vec![DMatrix::identity(3, 3), DMatrix::identity(3, 3) * 2.0]),
        };
        net.commit(1, outcome.clone()).unwrap();
        assert_eq!(net.snr[1], 13.0);
        assert_eq!(net.detectors[1].snr[1], 5.0);
        assert_eq!(net.detectors[1].fisher_matrix.as_ref().unwrap()[1][(2, 2)], 2.0);

        assert!(net.commit(1, outcome).is_err());
        net.mark_failed(0, "bad masses").unwrap();
        assert!(net.is_populated());
        assert_eq!(net.snr[0], 0.0);
    }

    #[test]
    fn fisher_buffers_are_skipped_without_errors() {
        let mut net = Network::new(vec![test_detector("A")]).unwrap();
        net.allocate(4, None);
        assert!(net.detectors[0].fisher_matrix.is_none());
        assert_eq!(net.detectors[0].snr.len(), 4);
    }

    #[test]
    fn invalid_grids_are_rejected() {
        let noise = NoiseCurve::from_pairs(vec![[1.0, 1e-40], [1000.0, 1e-47]]).unwrap();
        let geometry = test_detector("A").geometry;
        let res = Detector::new("X", geometry, vec![10.0, 5.0], &noise, DutyCycle::default());
        assert!(res.is_err());
        let df = bin_widths(&[1.0, 2.0, 4.0]);
        assert_eq!(df, vec![1.0, 2.0, 2.0]);
    }
}
