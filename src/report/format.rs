//! Formatted terminal output.
//!
//! Formatting stays here so the analysis code only produces numbers.

use crate::analysis::{DetectionReport, ErrorReport, Percentiles};
use crate::domain::RunConfig;
use crate::pipeline::RunSummary;

/// Format the run header and per-subset detection table.
pub fn format_run_summary(config: &RunConfig, detectors: &[&str], run: &RunSummary, detections: &DetectionReport) -> String {
    let mut out = String::new();

    out.push_str("=== cbc-sim - CBC detection and Fisher errors ===\n");
    out.push_str(&format!("Population: {} ({})\n", config.pop_id, config.pop_file.display()));
    out.push_str(&format!("Detectors: {}\n", detectors.join(", ")));
    out.push_str(&format!(
        "Waveform: {} | f_ref={:.1} Hz | duty cycle: {}\n",
        config.waveform_model,
        config.f_ref,
        if config.duty_cycle { "on" } else { "off" },
    ));
    out.push_str(&format!(
        "Events: n={} | completed={} | failed={}\n",
        run.events,
        run.completed,
        run.failures.len()
    ));

    out.push_str(&format!("\nDetections (network SNR >= {}):\n", detections.network_threshold));
    out.push_str(
        format!(
            "{:<24} {:>9} {:>9} {:>10} {:>10} {:>10}",
            "network", "detected", "fraction", "med_snr", "med_mtot", "med_z"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<24} {:-<9} {:-<9} {:-<10} {:-<10} {:-<10}", "", "", "", "", "", "").trim_end());
    out.push('\n');

    for s in &detections.subsets {
        out.push_str(
            format!(
                "{:<24} {:>9} {:>9.4} {:>10} {:>10} {:>10}",
                truncate(&s.label, 24),
                s.detected_count,
                s.detected_fraction,
                fmt_opt(s.median_snr_detected, 2),
                fmt_opt(s.median_total_mass_detected, 2),
                fmt_opt(s.median_redshift_detected, 3),
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

/// Format median (10%-90%) parameter errors per subset.
pub fn format_error_summary(report: &ErrorReport) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "\nParameter errors (median [p10, p90]) over constrained detections, individual SNR >= {}:\n",
        report.thresholds.individual
    ));
    for s in &report.subsets {
        out.push_str(&format!(
            "- {} (constrained={}, unconstrained={})\n",
            s.label, s.constrained, s.unconstrained
        ));
        for p in &s.parameters {
            out.push_str(&format!("    {:<20} {}\n", p.parameter.name(), fmt_percentiles(p.percentiles.as_ref())));
        }
        if let Some(area) = &s.sky_area_90_deg2 {
            out.push_str(&format!("    {:<20} {} deg2\n", "sky_area_90", fmt_percentiles(Some(area))));
        }
    }

    out
}

fn fmt_percentiles(p: Option<&Percentiles>) -> String {
    match p {
        Some(p) => format!("{:.3e} [{:.3e}, {:.3e}]", p.p50, p.p10, p.p90),
        None => "-".to_string(),
    }
}

fn fmt_opt(v: Option<f64>, decimals: usize) -> String {
    match v {
        Some(x) => format!("{x:.decimals$}"),
        None => "-".to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{NetworkSubset, ParameterErrors, SubsetErrors, SubsetDetections};
    use crate::domain::{Parameter, Thresholds};

    #[test]
    fn detection_table_lists_every_subset() {
        let report = DetectionReport {
            population_id: "BBH".to_string(),
            network_threshold: 9.0,
            subsets: vec![SubsetDetections {
                label: "ET".to_string(),
                detectors: NetworkSubset::new(vec![0], 1).unwrap(),
                snr: vec![],
                detected: vec![],
                evaluated: 4,
                failed: 0,
                detected_count: 0,
                detected_fraction: 0.0,
                median_snr_detected: None,
                median_total_mass_detected: None,
                median_redshift_detected: None,
            }],
        };
        let config = RunConfig {
            pop_file: "pop.csv".into(),
            pop_id: "BBH".to_string(),
            detector_ids: vec!["ET".to_string()],
            networks: "[[0]]".to_string(),
            config_path: "detectors.toml".into(),
            waveform_model: "taylorf2".to_string(),
            fisher_parameters: Default::default(),
            thresholds: Thresholds::default(),
            calculate_errors: false,
            duty_cycle: false,
            failure_policy: Default::default(),
            f_ref: 50.0,
            threads: None,
            output_dir: ".".into(),
        };
        let run = RunSummary {
            events: 4,
            completed: 4,
            failures: vec![],
        };

        let text = format_run_summary(&config, &["ET"], &run, &report);
        assert!(text.contains("Events: n=4 | completed=4 | failed=0"));
        let row = text.lines().last().unwrap();
        assert!(row.starts_with("ET "));
        assert!(row.ends_with('-'));
    }

    #[test]
    fn unconstrained_parameters_print_a_dash() {
        let report = ErrorReport {
            population_id: "BBH".to_string(),
            parameters: vec![Parameter::Ra],
            thresholds: Thresholds::default(),
            subsets: vec![SubsetErrors {
                label: "ET".to_string(),
                detectors: NetworkSubset::new(vec![0], 1).unwrap(),
                estimates: vec![],
                constrained: 0,
                unconstrained: 2,
                parameters: vec![ParameterErrors {
                    parameter: Parameter::Ra,
                    percentiles: None,
                }],
                sky_area_90_deg2: None,
            }],
        };
        let text = format_error_summary(&report);
        assert!(text.contains("unconstrained=2"));
        assert!(text.lines().last().unwrap().trim_end().ends_with('-'));
    }

    #[test]
    fn long_labels_are_truncated() {
        assert_eq!(truncate("abcdef", 4), "abc.");
        assert_eq!(truncate("abc", 4), "abc");
    }
}
