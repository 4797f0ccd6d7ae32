//! Parameter-estimation errors per detector subset.
//!
//! Fisher information from independent detectors adds, so the subset matrix is
//! the sum over the subset's detectors. Only detectors whose own SNR reaches
//! the individual threshold contribute. The inverse of the sum approximates
//! the parameter covariance; a matrix that cannot be inverted marks the event
//! as unconstrained for that subset.

use std::f64::consts::{PI, TAU};

use nalgebra::DMatrix;
use serde::Serialize;

use crate::analysis::{NetworkSubset, check_subsets, subset_snr};
use crate::domain::{FisherParameterSet, Parameter, Population, Thresholds};
use crate::error::CbcError;
use crate::fisher::invert_fisher;
use crate::math::quantile;
use crate::network::{EventStatus, Network};

/// Credible level of the reported sky area.
const SKY_AREA_LEVEL: f64 = 0.9;

/// Square degrees per steradian.
const DEG2_PER_SR: f64 = (180.0 / PI) * (180.0 / PI);

/// Error estimate for one (event, subset) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ErrorEstimate {
    /// Below the network threshold (or the event failed); no estimate.
    NotDetected,
    /// The summed Fisher matrix could not be inverted.
    Unconstrained { reason: String },
    Constrained {
        /// 1σ error per Fisher parameter, in parameter order.
        errors: Vec<f64>,
        /// 90% sky-localization area (deg²) when `ra` and `dec` are estimated.
        sky_area_90_deg2: Option<f64>,
    },
}

/// Percentiles of a per-event quantity over constrained events.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Percentiles {
    pub p10: f64,
    pub p50: f64,
    pub p90: f64,
}

impl Percentiles {
    fn of(values: &[f64]) -> Option<Self> {
        Some(Self {
            p10: quantile(values, 0.1)?,
            p50: quantile(values, 0.5)?,
            p90: quantile(values, 0.9)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterErrors {
    pub parameter: Parameter,
    pub percentiles: Option<Percentiles>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubsetErrors {
    pub label: String,
    pub detectors: NetworkSubset,
    #[serde(skip)]
    pub estimates: Vec<ErrorEstimate>,
    pub constrained: usize,
    pub unconstrained: usize,
    pub parameters: Vec<ParameterErrors>,
    pub sky_area_90_deg2: Option<Percentiles>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    pub population_id: String,
    pub parameters: Vec<Parameter>,
    pub thresholds: Thresholds,
    pub subsets: Vec<SubsetErrors>,
}

/// Sum of the Fisher matrices of `subset`'s detectors for event `k`, counting
/// only detectors with SNR `>= individual_threshold`.
///
/// Returns `None` when the network carries no Fisher matrices.
pub fn summed_fisher(
    network: &Network,
    subset: &NetworkSubset,
    k: usize,
    individual_threshold: f64,
) -> Option<DMatrix<f64>> {
    let mut total: Option<DMatrix<f64>> = None;
    for &d in subset.indices() {
        let det = &network.detectors[d];
        let fm = &det.fisher_matrix.as_ref()?[k];
        let sum = total.get_or_insert_with(|| DMatrix::zeros(fm.nrows(), fm.ncols()));
        if det.snr[k] >= individual_threshold {
            *sum += fm;
        }
    }
    total
}

/// Invert summed Fisher matrices into per-parameter errors for every subset.
pub fn analyze_errors(
    network: &Network,
    population: &Population,
    fisher_parameters: &FisherParameterSet,
    population_id: &str,
    subsets: &[NetworkSubset],
    thresholds: &Thresholds,
) -> Result<ErrorReport, CbcError> {
    if network.detectors.iter().any(|d| d.fisher_matrix.is_none()) {
        return Err(CbcError::Config(
            "Fisher matrices were not computed for this run.".to_string(),
        ));
    }
    if population.len() != network.num_events() {
        return Err(CbcError::Population(format!(
            "population has {} events but the network holds results for {}",
            population.len(),
            network.num_events()
        )));
    }
    let dim = fisher_parameters.len();
    for det in &network.detectors {
        if let Some(fm) = det.fisher_matrix.iter().flatten().find(|fm| fm.shape() != (dim, dim)) {
            return Err(CbcError::Config(format!(
                "Detector {}: stored Fisher matrices are {}x{} but {dim} parameters were requested.",
                det.id,
                fm.nrows(),
                fm.ncols()
            )));
        }
    }
    check_subsets(subsets, network.len())?;

    let ids = network.ids();
    let sky = fisher_parameters
        .position(Parameter::Ra)
        .zip(fisher_parameters.position(Parameter::Dec));

    let subsets = subsets
        .iter()
        .map(|subset| {
            let estimates: Vec<ErrorEstimate> = (0..network.num_events())
                .map(|k| estimate_event(network, population, subset, k, thresholds, sky))
                .collect();
            summarize(subset.label(&ids), subset.clone(), estimates, fisher_parameters)
        })
        .collect();

    Ok(ErrorReport {
        population_id: population_id.to_string(),
        parameters: fisher_parameters.as_slice().to_vec(),
        thresholds: *thresholds,
        subsets,
    })
}

fn estimate_event(
    network: &Network,
    population: &Population,
    subset: &NetworkSubset,
    k: usize,
    thresholds: &Thresholds,
    sky: Option<(usize, usize)>,
) -> ErrorEstimate {
    if network.status[k] != EventStatus::Complete || subset_snr(network, subset, k) < thresholds.network {
        return ErrorEstimate::NotDetected;
    }
    let Some(fm) = summed_fisher(network, subset, k, thresholds.individual) else {
        return ErrorEstimate::NotDetected;
    };

    match invert_fisher(&fm) {
        Ok(cov) => {
            let errors = (0..cov.nrows()).map(|i| cov[(i, i)].sqrt()).collect();
            let sky_area_90_deg2 =
                sky.and_then(|(ra, dec)| sky_area(&cov, ra, dec, population.events[k].dec));
            ErrorEstimate::Constrained {
                errors,
                sky_area_90_deg2,
            }
        }
        Err(e) => ErrorEstimate::Unconstrained { reason: e.0 },
    }
}

/// `ΔΩ_p = -2π ln(1 - p) |cos δ| sqrt(σ²_ra σ²_dec - C²_ra,dec)`, in deg².
fn sky_area(cov: &DMatrix<f64>, ra: usize, dec: usize, declination: f64) -> Option<f64> {
    let det = cov[(ra, ra)] * cov[(dec, dec)] - cov[(ra, dec)] * cov[(dec, ra)];
    if !(det.is_finite() && det > 0.0) {
        return None;
    }
    let area_sr = -TAU * (1.0 - SKY_AREA_LEVEL).ln() * declination.cos().abs() * det.sqrt();
    Some(area_sr * DEG2_PER_SR)
}

fn summarize(
    label: String,
    detectors: NetworkSubset,
    estimates: Vec<ErrorEstimate>,
    fisher_parameters: &FisherParameterSet,
) -> SubsetErrors {
    let mut columns = vec![Vec::new(); fisher_parameters.len()];
    let mut areas = Vec::new();
    let mut constrained = 0;
    let mut unconstrained = 0;

    for est in &estimates {
        match est {
            ErrorEstimate::NotDetected => {}
            ErrorEstimate::Unconstrained { .. } => unconstrained += 1,
            ErrorEstimate::Constrained {
                errors,
                sky_area_90_deg2,
            } => {
                constrained += 1;
                for (col, &e) in columns.iter_mut().zip(errors) {
                    col.push(e);
                }
                areas.extend(*sky_area_90_deg2);
            }
        }
    }

    let parameters = fisher_parameters
        .iter()
        .zip(&columns)
        .map(|(parameter, col)| ParameterErrors {
            parameter,
            percentiles: Percentiles::of(col),
        })
        .collect();

    SubsetErrors {
        label,
        detectors,
        estimates,
        constrained,
        unconstrained,
        parameters,
        sky_area_90_deg2: Percentiles::of(&areas),
    }
}
