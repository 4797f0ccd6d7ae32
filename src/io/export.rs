//! Report writers.
//!
//! Per subset, one CSV of per-event detections and (with errors enabled) one
//! CSV of per-event parameter errors; plus one JSON summary of the whole run.
//! File names are prefixed with the population id:
//!
//! - `<pop_id>_<subset>_detections.csv`
//! - `<pop_id>_<subset>_errors.csv`
//! - `<pop_id>_summary.json`

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::analysis::{DetectionReport, ErrorEstimate, ErrorReport};
use crate::domain::Population;
use crate::error::CbcError;
use crate::pipeline::RunSummary;

/// Everything written to the JSON summary.
#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub tool: &'static str,
    pub generated_at: DateTime<Utc>,
    pub population_id: &'a str,
    pub detectors: Vec<&'a str>,
    pub waveform_model: &'a str,
    pub duty_cycle: bool,
    pub run: &'a RunSummary,
    pub detections: &'a DetectionReport,
    pub errors: Option<&'a ErrorReport>,
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> CbcError + '_ {
    move |source| CbcError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn csv_err(path: &Path) -> impl FnOnce(csv::Error) -> CbcError + '_ {
    move |e| CbcError::Io {
        path: path.to_path_buf(),
        source: e.into(),
    }
}

/// Write per-event detections for every subset. Returns the files written.
pub fn write_detections_csv(
    dir: &Path,
    report: &DetectionReport,
    population: &Population,
) -> Result<Vec<PathBuf>, CbcError> {
    fs::create_dir_all(dir).map_err(io_err(dir))?;
    let mut written = Vec::with_capacity(report.subsets.len());

    for subset in &report.subsets {
        let path = dir.join(format!("{}_{}_detections.csv", report.population_id, subset.label));
        let file = File::create(&path).map_err(io_err(&path))?;
        let mut writer = csv::Writer::from_writer(file);

        writer
            .write_record([
                "event",
                "network_snr",
                "detected",
                "mass_1",
                "mass_2",
                "redshift",
                "luminosity_distance",
                "ra",
                "dec",
                "psi",
                "theta_jn",
                "geocent_time",
                "phase",
            ])
            .map_err(csv_err(&path))?;

        for (k, (snr, detected)) in subset.snr.iter().zip(&subset.detected).enumerate() {
            let Some(e) = population.get(k) else { continue };
            writer
                .write_record([
                    k.to_string(),
                    format!("{snr:.6}"),
                    u8::from(*detected).to_string(),
                    e.mass_1.to_string(),
                    e.mass_2.to_string(),
                    e.redshift.to_string(),
                    e.luminosity_distance.to_string(),
                    e.ra.to_string(),
                    e.dec.to_string(),
                    e.psi.to_string(),
                    e.theta_jn.to_string(),
                    e.geocent_time.to_string(),
                    e.phase.to_string(),
                ])
                .map_err(csv_err(&path))?;
        }
        writer.flush().map_err(io_err(&path))?;
        written.push(path);
    }
    Ok(written)
}

/// Write per-event parameter errors for every subset. Undetected events are
/// omitted; unconstrained ones have empty error columns.
pub fn write_errors_csv(dir: &Path, report: &ErrorReport) -> Result<Vec<PathBuf>, CbcError> {
    fs::create_dir_all(dir).map_err(io_err(dir))?;
    let mut written = Vec::with_capacity(report.subsets.len());

    let mut header = vec!["event".to_string(), "status".to_string()];
    header.extend(report.parameters.iter().map(|p| format!("err_{p}")));
    header.push("sky_area_90_deg2".to_string());
    let blanks = report.parameters.len() + 1;

    for subset in &report.subsets {
        let path = dir.join(format!("{}_{}_errors.csv", report.population_id, subset.label));
        let file = File::create(&path).map_err(io_err(&path))?;
        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(&header).map_err(csv_err(&path))?;

        for (k, estimate) in subset.estimates.iter().enumerate() {
            let mut row = vec![k.to_string()];
            match estimate {
                ErrorEstimate::NotDetected => continue,
                ErrorEstimate::Unconstrained { .. } => {
                    row.push("unconstrained".to_string());
                    row.extend(std::iter::repeat_n(String::new(), blanks));
                }
                ErrorEstimate::Constrained {
                    errors,
                    sky_area_90_deg2,
                } => {
                    row.push("constrained".to_string());
                    row.extend(errors.iter().map(|e| format!("{e:.6e}")));
                    row.push(sky_area_90_deg2.map(|a| format!("{a:.6e}")).unwrap_or_default());
                }
            }
            writer.write_record(&row).map_err(csv_err(&path))?;
        }
        writer.flush().map_err(io_err(&path))?;
        written.push(path);
    }
    Ok(written)
}

pub fn write_summary_json(dir: &Path, report: &RunReport<'_>) -> Result<PathBuf, CbcError> {
    fs::create_dir_all(dir).map_err(io_err(dir))?;
    let path = dir.join(format!("{}_summary.json", report.population_id));
    let file = File::create(&path).map_err(io_err(&path))?;
    serde_json::to_writer_pretty(file, report).map_err(|e| CbcError::Io {
        path: path.clone(),
        source: e.into(),
    })?;
    info!(path = %path.display(), "summary written");
    Ok(path)
}
