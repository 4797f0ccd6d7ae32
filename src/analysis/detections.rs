//! Detection statistics per detector subset.

use serde::Serialize;

use crate::analysis::{NetworkSubset, check_subsets};
use crate::domain::{Population, Thresholds};
use crate::error::CbcError;
use crate::math::median;
use crate::network::{EventStatus, Network};

/// Detection results for one subset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubsetDetections {
    pub label: String,
    pub detectors: NetworkSubset,
    /// Subset SNR per event (quadrature sum over the subset's detectors).
    #[serde(skip)]
    pub snr: Vec<f64>,
    #[serde(skip)]
    pub detected: Vec<bool>,
    /// Events that completed the pipeline.
    pub evaluated: usize,
    pub failed: usize,
    pub detected_count: usize,
    pub detected_fraction: f64,
    pub median_snr_detected: Option<f64>,
    pub median_total_mass_detected: Option<f64>,
    pub median_redshift_detected: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionReport {
    pub population_id: String,
    pub network_threshold: f64,
    pub subsets: Vec<SubsetDetections>,
}

/// SNR of event `k` as seen by the detectors in `subset` only.
pub fn subset_snr(network: &Network, subset: &NetworkSubset, k: usize) -> f64 {
    subset
        .indices()
        .iter()
        .map(|&d| {
            let s = network.detectors[d].snr[k];
            s * s
        })
        .sum::<f64>()
        .sqrt()
}

/// Re-aggregate stored detector SNRs for every subset.
///
/// An event counts as detected by a subset when it completed the pipeline and
/// its subset SNR reaches `thresholds.network`. Subsets must index into
/// `network`.
pub fn analyze_detections(
    network: &Network,
    population: &Population,
    population_id: &str,
    subsets: &[NetworkSubset],
    thresholds: &Thresholds,
) -> Result<DetectionReport, CbcError> {
    check_subsets(subsets, network.len())?;

    let ids = network.ids();
    let subsets = subsets
        .iter()
        .map(|subset| analyze_subset(network, population, subset, &ids, thresholds.network))
        .collect();

    Ok(DetectionReport {
        population_id: population_id.to_string(),
        network_threshold: thresholds.network,
        subsets,
    })
}

fn analyze_subset(
    network: &Network,
    population: &Population,
    subset: &NetworkSubset,
    ids: &[&str],
    threshold: f64,
) -> SubsetDetections {
    let n = network.num_events();
    let mut snr = Vec::with_capacity(n);
    let mut detected = Vec::with_capacity(n);
    let mut evaluated = 0;

    for k in 0..n {
        let complete = network.status[k] == EventStatus::Complete;
        let rho = subset_snr(network, subset, k);
        evaluated += usize::from(complete);
        snr.push(rho);
        detected.push(complete && rho >= threshold);
    }

    let picked = |f: &dyn Fn(usize) -> f64| -> Vec<f64> {
        (0..n).filter(|&k| detected[k]).map(f).collect()
    };
    let detected_snr = picked(&|k| snr[k]);
    let masses = picked(&|k| population.get(k).map_or(f64::NAN, |e| e.total_mass()));
    let redshifts = picked(&|k| population.get(k).map_or(f64::NAN, |e| e.redshift));

    let detected_count = detected_snr.len();
    SubsetDetections {
        label: subset.label(ids),
        detectors: subset.clone(),
        evaluated,
        failed: n - evaluated,
        detected_count,
        detected_fraction: if evaluated > 0 {
            detected_count as f64 / evaluated as f64
        } else {
            0.0
        },
        median_snr_detected: median(&detected_snr),
        median_total_mass_detected: median(&masses),
        median_redshift_detected: median(&redshifts),
        snr,
        detected,
    }
}
