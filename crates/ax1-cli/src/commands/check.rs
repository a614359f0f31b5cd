use super::load_deck;
use crate::cli::CheckArgs;
use crate::config::CliOverrides;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use ax1::engine::config::SolverMode;
use ax1::engine::progress::ProgressReporter;
use ax1::engine::state::{Eigenvalue, IterationOutcome, TransportState};
use ax1::engine::tasks::{geometry_search, transport};
use tracing::info;

/// Initial state of a deck as reported by `ax1 check`.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckSummary {
    pub zones: usize,
    pub groups: usize,
    pub materials: Vec<String>,
    pub outer_radius: f64,
    pub total_mass: f64,
    pub eigenvalue: Eigenvalue,
    pub multiplication: f64,
    pub generation_time: f64,
    pub iterations: usize,
    pub converged: bool,
    pub geometry_search: Option<IterationOutcome<f64>>,
}

/// Builds the assembly from the deck and performs the initial eigenvalue solve.
pub fn evaluate(args: &CheckArgs) -> Result<CheckSummary> {
    let deck = load_deck(&args.deck, &CliOverrides::from(args))?;
    let config = deck.config;
    let mut assembly = deck.assembly;
    let mut state = TransportState::new();

    let geometry_search = match config.transport.mode {
        SolverMode::GeometrySearch { .. } => {
            let progress_handler = CliProgressHandler::new();
            let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
            Some(geometry_search::run(
                &mut assembly,
                &config.transport,
                &mut state,
                &reporter,
            )?)
        }
        _ => None,
    };

    info!("Solving the initial eigenvalue problem...");
    let solution = transport::run(
        &assembly.zones,
        &assembly.materials,
        &config.transport,
        &mut state,
        0.0,
    )?;

    Ok(CheckSummary {
        zones: assembly.zones.num_zones(),
        groups: assembly.num_groups(),
        materials: assembly.materials.iter().map(|m| m.name.clone()).collect(),
        outer_radius: assembly.zones.outer_radius(),
        total_mass: assembly.zones.total_mass(),
        eigenvalue: solution.eigenvalue,
        multiplication: solution.multiplication,
        generation_time: solution.generation_time,
        iterations: solution.iterations,
        converged: solution.converged,
        geometry_search,
    })
}

pub fn run(args: CheckArgs) -> Result<()> {
    let summary = evaluate(&args)?;

    println!("Deck {} is valid.", args.deck.display());
    println!(
        "  {} zone(s), {} group(s), materials: {}",
        summary.zones,
        summary.groups,
        summary.materials.join(", ")
    );
    println!(
        "  outer radius: {:.6} cm, total mass: {:.6e} g",
        summary.outer_radius, summary.total_mass
    );
    if let Some(search) = &summary.geometry_search {
        println!(
            "  critical geometry: radius scale {:.6} after {} iteration(s){}",
            search.value,
            search.iterations,
            if search.converged { "" } else { " (not converged)" }
        );
    }
    println!(
        "  {} = {:.6e}, k = {:.6}, generation time = {:.6e} μs",
        summary.eigenvalue.symbol(),
        summary.eigenvalue.value(),
        summary.multiplication,
        summary.generation_time
    );
    println!(
        "  transport: {} iteration(s){}",
        summary.iterations,
        if summary.converged {
            ""
        } else {
            " (not converged)"
        }
    );
    Ok(())
}
