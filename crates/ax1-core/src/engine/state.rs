use super::config::SimulationConfig;
use super::diagnostics::WarningThrottle;
use crate::core::models::flux::FluxField;

/// Non-convergence warnings logged at `warn` level before the rest drop to `debug`.
const LOGGED_WARNINGS: usize = 10;

/// The result of an iteration that may stop at its cap instead of converging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationOutcome<T> {
    pub value: T,
    pub converged: bool,
    pub iterations: usize,
}

impl<T> IterationOutcome<T> {
    pub fn converged(value: T, iterations: usize) -> Self {
        Self {
            value,
            converged: true,
            iterations,
        }
    }

    pub fn exhausted(value: T, iterations: usize) -> Self {
        Self {
            value,
            converged: false,
            iterations,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Eigenvalue {
    /// Multiplication factor k.
    Multiplication(f64),
    /// Inverse period α, μs⁻¹.
    InversePeriod(f64),
}

impl Eigenvalue {
    #[inline]
    pub fn value(&self) -> f64 {
        match *self {
            Eigenvalue::Multiplication(k) => k,
            Eigenvalue::InversePeriod(alpha) => alpha,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Eigenvalue::Multiplication(_) => "k",
            Eigenvalue::InversePeriod(_) => "alpha",
        }
    }
}

/// Geometry the last α solve was performed on.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SolvedGeometry {
    pub atom_density: Vec<f64>,
    pub radius: Vec<f64>,
}

/// Everything the transport solver carries from one solve to the next.
#[derive(Debug, Clone)]
pub struct TransportState {
    pub flux: Option<FluxField>,
    pub k: Option<f64>,
    pub alpha: Option<f64>,
    pub generation_time: Option<f64>,
    pub solves: usize,
    pub nonconvergence: WarningThrottle,
    pub(crate) solved_geometry: Option<SolvedGeometry>,
}

impl Default for TransportState {
    fn default() -> Self {
        Self {
            flux: None,
            k: None,
            alpha: None,
            generation_time: None,
            solves: 0,
            nonconvergence: WarningThrottle::new(LOGGED_WARNINGS),
            solved_geometry: None,
        }
    }
}

impl TransportState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Step-control scalars that persist for the whole run.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlState {
    pub time: f64,
    pub dt: f64,
    pub cycle: usize,
    pub substeps: usize,
    /// Eigenvalue of the cycle just completed.
    pub eigenvalue: f64,
    pub previous_eigenvalue: Option<f64>,
    pub max_eigenvalue_magnitude: f64,
    pub doubling_countdown: usize,
    pub force_halve: bool,
    pub power: f64,
    pub previous_power: f64,
    /// Total fission energy generated since the start (10¹² erg).
    pub generated_energy: f64,
    pub cycle_energy: f64,
    pub disassembly_radius: f64,
}

impl ControlState {
    pub fn new(config: &SimulationConfig, initial_outer_radius: f64) -> Self {
        Self {
            time: 0.0,
            dt: config.initial_dt,
            cycle: 0,
            substeps: config.initial_substeps,
            eigenvalue: 0.0,
            previous_eigenvalue: None,
            max_eigenvalue_magnitude: 0.0,
            doubling_countdown: config.stability.doubling_countdown,
            force_halve: false,
            power: config.initial_power,
            previous_power: config.initial_power,
            generated_energy: 0.0,
            cycle_energy: 0.0,
            disassembly_radius: config
                .stability
                .resolve_disassembly_radius(initial_outer_radius),
        }
    }
}
