//! Detection and parameter-estimation pipeline.
//!
//! For every event and every detector:
//!
//! waveform -> projection -> per-bin SNR -> (optional) Fisher matrix
//!
//! Events are independent and run in parallel on the current rayon pool. Each
//! event is computed into a private [`EventOutcome`] and committed to the
//! network's pre-sized buffers only once all of its detectors succeeded, so a
//! failing event never leaves half-written slots behind.

use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::{DEFAULT_F_REF, Event, FailurePolicy, FisherParameterSet, Population};
use crate::error::CbcError;
use crate::fisher::fisher_matrix;
use crate::network::{Detector, EventOutcome, Network};
use crate::signal::{DetectorSignal, project, snr};
use crate::waveform::{GenerationContext, InvalidEvent, WaveformModel};

/// Switches that shape a pipeline run.
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    /// Model detector on/off segments in the SNR integral.
    pub duty_cycle: bool,
    /// Compute per-detector Fisher matrices.
    pub calculate_errors: bool,
    pub failure_policy: FailurePolicy,
    /// Reference frequency (Hz) for the waveform phase.
    pub f_ref: f64,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            duty_cycle: false,
            calculate_errors: true,
            failure_policy: FailurePolicy::Abort,
            f_ref: DEFAULT_F_REF,
        }
    }
}

/// An event that could not be processed under [`FailurePolicy::Skip`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventFailure {
    pub event: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub events: usize,
    pub completed: usize,
    pub failures: Vec<EventFailure>,
}

/// Populate `network`'s SNR (and Fisher) buffers for every event.
///
/// Buffers are (re)allocated for `population.len()` events first. Under
/// [`FailurePolicy::Abort`] the first invalid event ends the run with
/// [`CbcError::InvalidParameters`]; nothing is committed in that case.
pub fn run(
    population: &Population,
    network: &mut Network,
    model: WaveformModel,
    fisher_parameters: &FisherParameterSet,
    options: &PipelineOptions,
) -> Result<RunSummary, CbcError> {
    let n = population.len();
    let fisher_dim = options.calculate_errors.then(|| fisher_parameters.len());
    network.allocate(n, fisher_dim);

    info!(
        events = n,
        detectors = network.len(),
        model = %model,
        errors = options.calculate_errors,
        duty_cycle = options.duty_cycle,
        "processing population"
    );

    let progress = Progress::new(n);
    let detectors = &network.detectors;
    let compute = |k: usize| {
        let outcome = process_event(&population.events[k], detectors, model, fisher_parameters, options);
        progress.tick();
        outcome
    };

    let mut summary = RunSummary {
        events: n,
        ..RunSummary::default()
    };

    match options.failure_policy {
        FailurePolicy::Abort => {
            let outcomes = (0..n)
                .into_par_iter()
                .map(|k| {
                    compute(k).map_err(|e| CbcError::InvalidParameters {
                        event: k,
                        reason: e.0,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            for (k, outcome) in outcomes.into_iter().enumerate() {
                network.commit(k, outcome)?;
            }
            summary.completed = n;
        }
        FailurePolicy::Skip => {
            let outcomes: Vec<Result<EventOutcome, InvalidEvent>> =
                (0..n).into_par_iter().map(compute).collect();

            for (k, outcome) in outcomes.into_iter().enumerate() {
                match outcome {
                    Ok(outcome) => {
                        network.commit(k, outcome)?;
                        summary.completed += 1;
                    }
                    Err(e) => {
                        warn!(event = k, reason = %e, "skipping event");
                        network.mark_failed(k, e.0.clone())?;
                        summary.failures.push(EventFailure { event: k, reason: e.0 });
                    }
                }
            }
        }
    }

    info!(
        completed = summary.completed,
        failed = summary.failures.len(),
        "population processed"
    );
    Ok(summary)
}

/// Run every detector on one event.
pub fn process_event(
    event: &Event,
    detectors: &[Detector],
    model: WaveformModel,
    fisher_parameters: &FisherParameterSet,
    options: &PipelineOptions,
) -> Result<EventOutcome, InvalidEvent> {
    let mut snrs = Vec::with_capacity(detectors.len());
    let mut matrices = options
        .calculate_errors
        .then(|| Vec::with_capacity(detectors.len()));

    for det in detectors {
        let ctx = GenerationContext {
            frequencies: det.frequencies(),
            f_ref: options.f_ref,
            time_origin: event.geocent_time,
        };
        let waveform = model.generate(event, &ctx)?;
        let signal = project(event, det, &waveform);

        let contributions = snr(det, &signal, options.duty_cycle);
        let det_snr = contributions.iter().map(|s| s * s).sum::<f64>().sqrt();
        debug!(detector = %det.id, snr = det_snr, "detector snr");
        snrs.push(det_snr);

        if let Some(matrices) = matrices.as_mut() {
            let regenerate = |e: &Event| -> Result<DetectorSignal, InvalidEvent> {
                let wf = model.generate(e, &ctx)?;
                Ok(project(e, det, &wf))
            };
            matrices.push(fisher_matrix(regenerate, event, fisher_parameters, det)?);
        }
    }

    Ok(EventOutcome {
        snr: snrs,
        fisher: matrices,
    })
}

/// Logs roughly every 10% of processed events.
struct Progress {
    total: usize,
    every: usize,
    done: AtomicUsize,
}

impl Progress {
    fn new(total: usize) -> Self {
        Self {
            total,
            every: (total / 10).max(1),
            done: AtomicUsize::new(0),
        }
    }

    fn tick(&self) {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        if done % self.every == 0 || done == self.total {
            info!(done, total = self.total, "progress");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::tests::test_detector;
    use crate::network::{DetectorGeometry, DutyCycle, EventStatus, NoiseCurve};

    fn event(distance: f64) -> Event {
        Event {
            mass_1: 30.0,
            mass_2: 20.0,
            redshift: 0.1,
            luminosity_distance: distance,
            ra: 1.2,
            dec: -0.4,
            psi: 0.9,
            theta_jn: 0.5,
            geocent_time: 1_300_000_000.0,
            phase: 0.0,
        }
    }

    fn network() -> Network {
        let a = test_detector("A");
        let noise = NoiseCurve::from_pairs(vec![[1.0, 1e-40], [10.0, 1e-46], [1000.0, 1e-47]]).unwrap();
        let geometry = DetectorGeometry {
            longitude: 1.5,
            ..a.geometry
        };
        let b = Detector::new("B", geometry, a.frequencies().to_vec(), &noise, DutyCycle::default()).unwrap();
        Network::new(vec![a, b]).unwrap()
    }

    #[test]
    fn network_snr_is_the_quadrature_sum() {
        let pop = Population::new(vec![event(400.0), event(1600.0), event(6400.0)]);
        let mut net = network();
        let params: FisherParameterSet = "luminosity_distance,mass_1".parse().unwrap();
        let summary = run(&pop, &mut net, WaveformModel::TaylorF2, &params, &PipelineOptions::default()).unwrap();

        assert_eq!(summary.completed, 3);
        assert!(net.is_populated());
        for k in 0..3 {
            let expected = net
                .detectors
                .iter()
                .map(|d| d.snr[k] * d.snr[k])
                .sum::<f64>()
                .sqrt();
            assert!((net.snr[k] - expected).abs() <= 1e-12 * expected);
            assert!(net.snr[k] > 0.0);
            let fm = &net.detectors[0].fisher_matrix.as_ref().unwrap()[k];
            assert_eq!(fm.shape(), (2, 2));
        }
        // SNR falls as 1/D.
        assert!((net.snr[0] / net.snr[1] - 4.0).abs() < 1e-9);
    }

    #[test]
    fn abort_policy_stops_at_invalid_events() {
        let mut bad = event(400.0);
        bad.mass_1 = -5.0;
        let pop = Population::new(vec![event(400.0), bad]);
        let mut net = network();
        let err = run(
            &pop,
            &mut net,
            WaveformModel::Newtonian,
            &FisherParameterSet::default(),
            &PipelineOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CbcError::InvalidParameters { event: 1, .. }));
        assert!(!net.is_populated());
    }

    #[test]
    fn skip_policy_records_failures() {
        let mut bad = event(400.0);
        bad.luminosity_distance = 0.0;
        let pop = Population::new(vec![bad, event(400.0)]);
        let mut net = network();
        let options = PipelineOptions {
            calculate_errors: false,
            failure_policy: FailurePolicy::Skip,
            ..PipelineOptions::default()
        };
        let summary = run(&pop, &mut net, WaveformModel::TaylorF2, &FisherParameterSet::default(), &options).unwrap();

        assert_eq!(summary.completed, 1);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].event, 0);
        assert!(matches!(net.status[0], EventStatus::Failed(_)));
        assert_eq!(net.snr[0], 0.0);
        assert!(net.snr[1] > 0.0);
        assert!(net.detectors[0].fisher_matrix.is_none());
    }

    #[test]
    fn duty_cycle_gates_snr_but_not_fisher_information() {
        let pop = Population::new(vec![event(400.0)]);
        let params: FisherParameterSet = "luminosity_distance,mass_1,dec".parse().unwrap();
        let run_with = |duty_cycle: bool| {
            let mut det = test_detector("A");
            det.duty_cycle.factor = 0.0;
            let mut net = Network::new(vec![det]).unwrap();
            let options = PipelineOptions {
                duty_cycle,
                ..PipelineOptions::default()
            };
            run(&pop, &mut net, WaveformModel::TaylorF2, &params, &options).unwrap();
            net
        };

        let gated = run_with(true);
        let full = run_with(false);

        assert_eq!(gated.detectors[0].snr[0], 0.0);
        assert_eq!(gated.snr[0], 0.0);
        assert!(full.detectors[0].snr[0] > 0.0);

        let fm_gated = &gated.detectors[0].fisher_matrix.as_ref().unwrap()[0];
        let fm_full = &full.detectors[0].fisher_matrix.as_ref().unwrap()[0];
        assert_eq!(fm_gated, fm_full);
        assert!(fm_full[(0, 0)] > 0.0);
    }
}
