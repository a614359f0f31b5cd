use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "AX1-RS Developers",
    version,
    about = "AX1 CLI - A command-line interface for coupled S4 neutronics and Lagrangian hydrodynamics transients in spherical fast assemblies.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a transient from an input deck and write time-series and profile CSV files.
    Run(RunArgs),
    /// Validate an input deck and report the initial eigenvalue without running a transient.
    Check(CheckArgs),
}

/// Eigenvalue mode selectable from the command line or the deck.
#[derive(ValueEnum, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ModeChoice {
    /// Multiplication factor k.
    K,
    /// Inverse period α.
    Alpha,
    /// α after scaling the radii to the deck's alpha target.
    GeometrySearch,
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the input deck in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub deck: PathBuf,

    /// Directory for the output CSV files.
    #[arg(short, long, default_value = ".", value_name = "DIR")]
    pub output: PathBuf,

    /// Override `control.mode` from the deck.
    #[arg(short, long, value_enum)]
    pub mode: Option<ModeChoice>,

    /// Override the end time of the transient (μs).
    #[arg(long, value_name = "MICROSEC")]
    pub t_end: Option<f64>,

    /// Override the largest allowed time step (μs).
    #[arg(long, value_name = "MICROSEC")]
    pub dt_max: Option<f64>,

    /// Override the number of cycles between spatial profile snapshots.
    #[arg(long, value_name = "CYCLES")]
    pub profile_interval: Option<usize>,

    /// Set a specific deck value, overriding the file.
    /// Can be used multiple times. Example: -S control.cvp=1.5
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `check` subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Path to the input deck in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub deck: PathBuf,

    /// Override `control.mode` from the deck.
    #[arg(short, long, value_enum)]
    pub mode: Option<ModeChoice>,

    /// Set a specific deck value, overriding the file.
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_arguments_parse_with_overrides() {
        let cli = Cli::parse_from([
            "ax1",
            "-vv",
            "run",
            "--deck",
            "godiva.toml",
            "--mode",
            "geometry-search",
            "--t-end",
            "150",
            "-S",
            "control.cvp=1.5",
        ]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.deck, PathBuf::from("godiva.toml"));
                assert_eq!(args.output, PathBuf::from("."));
                assert_eq!(args.mode, Some(ModeChoice::GeometrySearch));
                assert_eq!(args.t_end, Some(150.0));
                assert_eq!(args.set_values, vec!["control.cvp=1.5".to_string()]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["ax1", "-q", "-v", "check", "--deck", "a.toml"]);
        assert!(result.is_err());
    }

    #[test]
    fn deck_is_required() {
        assert!(Cli::try_parse_from(["ax1", "run"]).is_err());
    }
}
