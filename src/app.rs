//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - validates the run configuration before any per-event work
//! - loads the population and the detector network
//! - runs the pipeline and the subset analysis
//! - prints reports and writes exports

use clap::Parser;
use tracing::{Level, info};

use crate::analysis::{DetectionReport, ErrorReport, NetworkSpec, analyze_detections, analyze_errors};
use crate::cli::{Command, NetworksArgs, RunArgs};
use crate::domain::{FisherParameterSet, Population, RunConfig, Thresholds};
use crate::error::{AppError, CbcError};
use crate::io::{DetectorFile, RunReport, load_population, write_detections_csv, write_errors_csv, write_summary_json};
use crate::network::Network;
use crate::pipeline::{PipelineOptions, RunSummary};
use crate::waveform::WaveformModel;

/// Entry point for the `cbc-sim` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Run(args) => handle_run(&args),
        Command::Networks(args) => handle_networks(&args),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    // Ignore the error when a subscriber is already installed.
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// All computed outputs of a single `cbc-sim run`.
#[derive(Debug)]
pub struct RunOutput {
    pub population: Population,
    pub network: Network,
    pub summary: RunSummary,
    pub detections: DetectionReport,
    pub errors: Option<ErrorReport>,
}

fn handle_run(args: &RunArgs) -> Result<(), AppError> {
    let config = run_config_from_args(args)?;
    let output = execute(&config)?;

    let ids = output.network.ids();
    println!(
        "{}",
        crate::report::format_run_summary(&config, &ids, &output.summary, &output.detections)
    );
    if let Some(errors) = &output.errors {
        println!("{}", crate::report::format_error_summary(errors));
    }

    write_reports(&config, &output)?;
    Ok(())
}

fn handle_networks(args: &NetworksArgs) -> Result<(), AppError> {
    let spec: NetworkSpec = args.network.networks.parse()?;

    let mut ids: Vec<&str> = Vec::with_capacity(args.network.detectors.len());
    for id in &args.network.detectors {
        if !ids.contains(&id.as_str()) {
            ids.push(id);
        }
    }
    if ids.is_empty() {
        return Err(CbcError::Config("no detectors given".to_string()).into());
    }

    for subset in spec.resolve(ids.len())? {
        println!("{:?}\t{}", subset.indices(), subset.label(&ids));
    }
    Ok(())
}

pub fn run_config_from_args(args: &RunArgs) -> Result<RunConfig, CbcError> {
    let fisher_parameters = match &args.fisher_parameters {
        Some(list) => list.parse()?,
        None => FisherParameterSet::default(),
    };

    Ok(RunConfig {
        pop_file: args.pop_file.clone(),
        pop_id: args.pop_id.clone(),
        detector_ids: args.network.detectors.clone(),
        networks: args.network.networks.clone(),
        config_path: args.network.config.clone(),
        waveform_model: args.waveform_model.clone(),
        fisher_parameters,
        thresholds: Thresholds {
            individual: args.threshold_individual,
            network: args.threshold_network,
        },
        calculate_errors: !args.no_errors,
        duty_cycle: args.duty_cycle,
        failure_policy: args.on_error,
        f_ref: args.f_ref,
        threads: args.threads,
        output_dir: args.output_dir.clone(),
    })
}

/// Execute a full run: load inputs, simulate every event, analyze subsets.
///
/// Every configuration problem (waveform model, network specification,
/// thresholds, detector file) is reported before the first event is touched.
pub fn execute(config: &RunConfig) -> Result<RunOutput, CbcError> {
    let model: WaveformModel = config.waveform_model.parse()?;
    let spec: NetworkSpec = config.networks.parse()?;
    validate(config)?;

    let detector_file = DetectorFile::load(&config.config_path)?;
    let mut network = detector_file.build_network(&config.detector_ids)?;
    let subsets = spec.resolve(network.len())?;
    let population = load_population(&config.pop_file)?;

    let options = PipelineOptions {
        duty_cycle: config.duty_cycle,
        calculate_errors: config.calculate_errors,
        failure_policy: config.failure_policy,
        f_ref: config.f_ref,
    };

    let summary = match config.threads {
        Some(threads) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| CbcError::Config(format!("failed to build thread pool: {e}")))?;
            pool.install(|| {
                crate::pipeline::run(&population, &mut network, model, &config.fisher_parameters, &options)
            })?
        }
        None => crate::pipeline::run(&population, &mut network, model, &config.fisher_parameters, &options)?,
    };

    let detections = analyze_detections(&network, &population, &config.pop_id, &subsets, &config.thresholds)?;
    let errors = if config.calculate_errors {
        Some(analyze_errors(
            &network,
            &population,
            &config.fisher_parameters,
            &config.pop_id,
            &subsets,
            &config.thresholds,
        )?)
    } else {
        None
    };

    info!(subsets = subsets.len(), "analysis complete");
    Ok(RunOutput {
        population,
        network,
        summary,
        detections,
        errors,
    })
}

fn validate(config: &RunConfig) -> Result<(), CbcError> {
    if !(config.f_ref.is_finite() && config.f_ref > 0.0) {
        return Err(CbcError::Config(format!(
            "reference frequency must be positive (got {})",
            config.f_ref
        )));
    }
    let t = config.thresholds;
    if !(t.individual.is_finite() && t.network.is_finite() && t.individual >= 0.0 && t.network >= 0.0) {
        return Err(CbcError::Config(format!(
            "SNR thresholds must be non-negative (got individual={}, network={})",
            t.individual, t.network
        )));
    }
    if config.threads == Some(0) {
        return Err(CbcError::Config("--threads must be at least 1".to_string()));
    }
    Ok(())
}

/// Write every CSV/JSON report for `output` into `config.output_dir`.
pub fn write_reports(config: &RunConfig, output: &RunOutput) -> Result<(), CbcError> {
    let dir = &config.output_dir;
    write_detections_csv(dir, &output.detections, &output.population)?;
    if let Some(errors) = &output.errors {
        write_errors_csv(dir, errors)?;
    }

    let report = RunReport {
        tool: env!("CARGO_PKG_NAME"),
        generated_at: chrono::Utc::now(),
        population_id: &config.pop_id,
        detectors: output.network.ids(),
        waveform_model: &config.waveform_model,
        duty_cycle: config.duty_cycle,
        run: &output.summary,
        detections: &output.detections,
        errors: output.errors.as_ref(),
    };
    write_summary_json(dir, &report)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;

    fn config(extra: &[&str]) -> RunConfig {
        let mut argv = vec!["cbc-sim", "run", "--pop-file", "missing.csv"];
        argv.extend_from_slice(extra);
        let Command::Run(args) = Cli::parse_from(argv).command else {
            panic!("expected run");
        };
        run_config_from_args(&args).unwrap()
    }

    #[test]
    fn errors_flag_and_thresholds_map_into_config() {
        let c = config(&["--no-errors", "--threshold-network", "12", "--fisher-parameters", "ra,dec"]);
        assert!(!c.calculate_errors);
        assert_eq!(c.thresholds.network, 12.0);
        assert_eq!(c.fisher_parameters.len(), 2);
    }

    #[test]
    fn bad_configuration_fails_before_any_file_is_read() {
        // The population and detector files do not exist; these must fail first.
        let err = execute(&config(&["--waveform-model", "imrphenom"])).unwrap_err();
        assert!(matches!(err, CbcError::UnknownWaveformModel(_)));

        let err = execute(&config(&["--networks", "[[0],"])).unwrap_err();
        assert!(matches!(err, CbcError::MalformedNetworkSpec(_)));

        let err = execute(&config(&["--f-ref=-1"])).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
