use super::load_deck;
use crate::cli::RunArgs;
use crate::config::CliOverrides;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use ax1::core::io::output::{CsvSink, ProfileRow};
use ax1::core::models::zone::ZoneState;
use ax1::engine::error::EngineError;
use ax1::engine::progress::ProgressReporter;
use ax1::engine::tasks::transport::TransportSolution;
use ax1::workflows::simulate::{self, CycleObserver, CycleRecord, SimulationResult};
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

pub const TIMESERIES_FILE: &str = "timeseries.csv";
pub const PROFILES_FILE: &str = "profiles.csv";

/// Streams the run history and the spatial profiles to CSV files as the transient advances.
pub struct CsvObserver {
    timeseries: CsvSink<File>,
    profiles: CsvSink<File>,
    profile_interval: usize,
    last_profile: Option<usize>,
}

impl CsvObserver {
    pub fn create(dir: &Path, profile_interval: usize) -> Result<Self> {
        Ok(Self {
            timeseries: CsvSink::create(&dir.join(TIMESERIES_FILE)).map_err(EngineError::from)?,
            profiles: CsvSink::create(&dir.join(PROFILES_FILE)).map_err(EngineError::from)?,
            profile_interval,
            last_profile: None,
        })
    }

    fn write_profile(
        &mut self,
        cycle: usize,
        time: f64,
        zones: &ZoneState,
        fission_density: &[f64],
    ) -> std::result::Result<(), EngineError> {
        debug!(cycle, time, "Writing spatial profile.");
        self.profiles
            .write_all(&ProfileRow::snapshot(cycle, time, zones, fission_density))?;
        self.last_profile = Some(cycle);
        Ok(())
    }
}

impl CycleObserver for CsvObserver {
    fn on_start(
        &mut self,
        zones: &ZoneState,
        solution: &TransportSolution,
    ) -> std::result::Result<(), EngineError> {
        self.write_profile(0, 0.0, zones, &solution.fission_density)
    }

    fn on_cycle(
        &mut self,
        record: &CycleRecord,
        zones: &ZoneState,
        solution: &TransportSolution,
    ) -> std::result::Result<(), EngineError> {
        self.timeseries.write(&record.to_row())?;
        if self.profile_interval > 0 && record.cycle % self.profile_interval == 0 {
            self.write_profile(record.cycle, record.time, zones, &solution.fission_density)?;
        }
        Ok(())
    }

    fn on_finish(
        &mut self,
        result: &SimulationResult,
        zones: &ZoneState,
        solution: &TransportSolution,
    ) -> std::result::Result<(), EngineError> {
        if self.last_profile != Some(result.cycles) {
            self.write_profile(result.cycles, result.time, zones, &solution.fission_density)?;
        }
        self.timeseries.flush()?;
        self.profiles.flush()?;
        Ok(())
    }
}

pub fn run(args: RunArgs) -> Result<()> {
    let deck = load_deck(&args.deck, &CliOverrides::from(&args))?;
    let config = deck.config;
    let mut assembly = deck.assembly;

    std::fs::create_dir_all(&args.output)?;
    info!("Writing output files to {:?}", &args.output);
    let mut observer = CsvObserver::create(&args.output, config.profile_interval)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Starting transient ({} mode, {} zones, t_end = {} μs)...",
        config.transport.mode.name(),
        assembly.zones.num_zones(),
        config.stability.t_end
    );
    info!("Invoking the core simulation workflow...");

    let result = simulate::run(&mut assembly, &config, &reporter, &mut observer)?;

    info!(
        "Workflow finished after {} cycle(s): {}",
        result.cycles, result.termination
    );
    if let Some(search) = &result.geometry_search {
        println!(
            "Critical geometry: radius scale {:.6} after {} iteration(s){}",
            search.value,
            search.iterations,
            if search.converged { "" } else { " (not converged)" }
        );
    }
    println!("Transient stopped: {}", result.termination);
    println!(
        "  cycles: {}, time: {:.4} μs, final {} = {:.6e}",
        result.cycles,
        result.time,
        result.final_eigenvalue.symbol(),
        result.final_eigenvalue.value()
    );
    println!(
        "  generated energy: {:.6e} (10^12 erg), final power: {:.6e} (10^12 erg/μs)",
        result.generated_energy, result.final_power
    );
    println!(
        "✓ Results written to: {} and {}",
        args.output.join(TIMESERIES_FILE).display(),
        args.output.join(PROFILES_FILE).display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures;
    use tempfile::tempdir;

    fn run_args(deck: &Path, output: &Path) -> RunArgs {
        RunArgs {
            deck: deck.to_path_buf(),
            output: output.to_path_buf(),
            mode: None,
            t_end: None,
            dt_max: None,
            profile_interval: None,
            set_values: Vec::new(),
        }
    }

    fn read_rows(path: &Path) -> Vec<csv::StringRecord> {
        let mut reader = csv::Reader::from_path(path).unwrap();
        reader.records().map(|r| r.unwrap()).collect()
    }

    #[test]
    fn run_writes_timeseries_and_profiles() {
        let dir = tempdir().unwrap();
        let deck = fixtures::write_deck(dir.path(), fixtures::DECK);
        let output = dir.path().join("out");

        run(run_args(&deck, &output)).unwrap();

        let mut reader = csv::Reader::from_path(output.join(TIMESERIES_FILE)).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.get(0), Some("cycle"));
        assert!(headers.iter().any(|h| h == "CHECK"));
        assert!(headers.iter().any(|h| h == "W_dimensionless"));

        let history = read_rows(&output.join(TIMESERIES_FILE));
        assert!(!history.is_empty());
        assert_eq!(&history[0][0], "1");

        let profiles = read_rows(&output.join(PROFILES_FILE));
        assert_eq!(profiles.len() % 8, 0);
        assert!(profiles.len() >= 16);
        assert_eq!(&profiles[0][0], "0");
        assert_eq!(&profiles[0][2], "1");
    }

    #[test]
    fn profile_interval_zero_writes_only_first_and_last() {
        let dir = tempdir().unwrap();
        let deck = fixtures::write_deck(dir.path(), fixtures::DECK);
        let mut args = run_args(&deck, dir.path());
        args.profile_interval = Some(0);

        run(args).unwrap();

        let profiles = read_rows(&dir.path().join(PROFILES_FILE));
        assert_eq!(profiles.len(), 16);
    }

    #[test]
    fn run_fails_for_missing_deck() {
        let dir = tempdir().unwrap();
        let result = run(run_args(&dir.path().join("missing.toml"), dir.path()));
        assert!(matches!(result, Err(crate::error::CliError::Io(_))));
    }
}
