//! Command-line parsing for the CBC detection simulator.
//!
//! Argument parsing and command dispatch are kept apart from the physics code.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::domain::{DEFAULT_F_REF, FailurePolicy};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "cbc-sim",
    version,
    about = "Detection statistics and Fisher-matrix parameter errors for compact-binary populations"
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Simulate a population on a detector network and analyze detector subsets.
    Run(RunArgs),
    /// Print the detector subsets a `--networks` value resolves to.
    Networks(NetworksArgs),
}

#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    /// Population CSV file (one event per row).
    #[arg(long, value_name = "CSV")]
    pub pop_file: PathBuf,

    /// Population identifier used in report names (e.g. BBH, BNS).
    #[arg(long, default_value = "BBH")]
    pub pop_id: String,

    #[command(flatten)]
    pub network: NetworkArgs,

    /// Waveform model (newtonian, taylorf2).
    #[arg(long, default_value = "taylorf2")]
    pub waveform_model: String,

    /// Comma-separated Fisher parameters
    /// (default: ra,dec,psi,theta_jn,luminosity_distance,mass_1,mass_2).
    #[arg(long, value_name = "LIST")]
    pub fisher_parameters: Option<String>,

    /// Minimum single-detector SNR for a detector's Fisher matrix to be used.
    #[arg(long, default_value_t = 0.0)]
    pub threshold_individual: f64,

    /// Minimum network SNR for a detection.
    #[arg(long, default_value_t = 9.0)]
    pub threshold_network: f64,

    /// Model detector duty cycles in the SNR integral.
    #[arg(long)]
    pub duty_cycle: bool,

    /// Skip Fisher matrices (detections only).
    #[arg(long)]
    pub no_errors: bool,

    /// What to do with events outside the waveform model's domain.
    #[arg(long = "on-error", value_enum, default_value_t = FailurePolicy::Abort)]
    pub on_error: FailurePolicy,

    /// Worker threads (default: one per core).
    #[arg(long)]
    pub threads: Option<usize>,

    /// Waveform phase reference frequency (Hz).
    #[arg(long, default_value_t = DEFAULT_F_REF)]
    pub f_ref: f64,

    /// Directory for CSV/JSON reports.
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,
}

/// Detector selection shared by `run` and `networks`.
#[derive(Debug, Args, Clone)]
pub struct NetworkArgs {
    /// Comma-separated detector ids from the configuration file.
    #[arg(long, value_delimiter = ',', default_value = "ET")]
    pub detectors: Vec<String>,

    /// Detector subsets to analyze: a JSON list of index lists, or `all`.
    #[arg(long, default_value = "[[0]]")]
    pub networks: String,

    /// Detector configuration file (TOML).
    #[arg(long, default_value = "detectors.toml")]
    pub config: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct NetworksArgs {
    #[command(flatten)]
    pub network: NetworkArgs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_defaults() {
        let cli = Cli::parse_from(["cbc-sim", "run", "--pop-file", "pop.csv"]);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.pop_id, "BBH");
        assert_eq!(args.network.detectors, vec!["ET"]);
        assert_eq!(args.network.networks, "[[0]]");
        assert_eq!(args.threshold_network, 9.0);
        assert_eq!(args.on_error, FailurePolicy::Abort);
        assert!(!args.no_errors);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn detector_lists_and_verbosity() {
        let cli = Cli::parse_from([
            "cbc-sim", "-vv", "networks", "--detectors", "ET,CE1,CE2", "--networks", "all",
        ]);
        assert_eq!(cli.verbose, 2);
        let Command::Networks(args) = cli.command else {
            panic!("expected networks");
        };
        assert_eq!(args.network.detectors, vec!["ET", "CE1", "CE2"]);
        assert_eq!(args.network.networks, "all");
    }

    #[test]
    fn on_error_accepts_skip() {
        let cli = Cli::parse_from(["cbc-sim", "run", "--pop-file", "p.csv", "--on-error", "skip"]);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.on_error, FailurePolicy::Skip);
    }
}
