use crate::core::models::zone::ZoneState;
use crate::engine::config::StabilityConfig;
use crate::engine::state::ControlState;
use std::fmt;
use tracing::{debug, instrument};

/// Why a transient stopped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TerminationReason {
    TimeLimit { time: f64 },
    EigenvalueRunaway { eigenvalue: f64, limit: f64 },
    Disassembly { radius: f64, threshold: f64 },
    CycleLimit { cycles: usize },
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::TimeLimit { time } => {
                write!(f, "end time reached at t = {time:.4} μs")
            }
            TerminationReason::EigenvalueRunaway { eigenvalue, limit } => write!(
                f,
                "eigenvalue {eigenvalue:.6e} exceeded the runaway limit {limit:.6e}"
            ),
            TerminationReason::Disassembly { radius, threshold } => write!(
                f,
                "assembly disassembled: outer radius {radius:.4} cm beyond {threshold:.4} cm"
            ),
            TerminationReason::CycleLimit { cycles } => {
                write!(f, "cycle limit of {cycles} reached")
            }
        }
    }
}

/// The W stability number and its two contributions, each maximised over zones.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StabilityMetric {
    pub w: f64,
    pub w_cfl: f64,
    pub w_visc: f64,
    /// Zone attaining the maximum of `w`.
    pub zone: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepDecision {
    pub dt: f64,
    pub substeps: usize,
    pub halved: bool,
    pub doubled: bool,
    pub metric: StabilityMetric,
    pub termination: Option<TerminationReason>,
}

/// Evaluates `W = max_i [CSC·e_i·(Δt/Δr_i)² + 4·CVP·ρ_i·|ΔV_i|]`.
pub fn stability_metric(zones: &ZoneState, dt: f64, csc: f64, cvp: f64) -> StabilityMetric {
    let mut metric = StabilityMetric::default();
    for i in 0..zones.num_zones() {
        let courant = dt / zones.zone_width(i);
        let cfl = csc * zones.internal_energy[i].max(0.0) * courant * courant;
        let visc = 4.0 * cvp * zones.density[i] * zones.specific_volume_change[i].abs();
        metric.w_cfl = metric.w_cfl.max(cfl);
        metric.w_visc = metric.w_visc.max(visc);
        if cfl + visc > metric.w {
            metric.w = cfl + visc;
            metric.zone = i;
        }
    }
    metric
}

fn relative_change(current: f64, previous: f64, floor: f64) -> f64 {
    (current - previous).abs() / previous.abs().max(floor)
}

/// Chooses the step size and substep count for the next cycle and checks for termination.
///
/// Reads the eigenvalue, power and energy of the cycle just completed from `control`, then
/// rolls them into the history used by the next call.
#[instrument(skip_all, name = "stability_control", fields(cycle = control.cycle))]
pub fn adjust(
    zones: &ZoneState,
    control: &mut ControlState,
    config: &StabilityConfig,
    cvp: f64,
) -> StepDecision {
    let metric = stability_metric(zones, control.dt, config.stability_constant, cvp);
    let eigenvalue = control.eigenvalue;
    let delta = control
        .previous_eigenvalue
        .map(|previous| relative_change(eigenvalue, previous, config.eigenvalue_floor));

    let was_single = control.substeps == 1;
    let mut substeps = control.substeps;
    if let Some(delta) = delta {
        if delta < config.ns4_increase_threshold {
            substeps = (substeps + 1).min(config.ns4_max);
        } else if delta > config.ns4_decrease_threshold {
            substeps = substeps.saturating_sub(1).max(1);
        }
        if was_single && delta > config.force_halve_threshold {
            control.force_halve = true;
        }
    }

    if control.generated_energy > 0.0 {
        let fraction = control.cycle_energy / control.generated_energy;
        if fraction > config.energy_reset_fraction {
            substeps = 1;
        } else if fraction < config.energy_bump_fraction {
            substeps = (substeps + 1).min(config.ns4_max);
        }
    }

    let previous_dt = control.dt;
    let mut dt = previous_dt;
    let mut halved = false;
    let mut doubled = false;

    if metric.w > config.w_limit || control.force_halve {
        dt = (previous_dt * 0.5).max(config.dt_min);
        halved = dt < previous_dt;
        control.doubling_countdown = config.doubling_countdown;
        control.force_halve = false;
        debug!(w = metric.w, zone = metric.zone, dt, "Halving the time step.");
    } else if metric.w < config.double_fraction * config.w_limit {
        control.doubling_countdown = control.doubling_countdown.saturating_sub(1);
        if control.doubling_countdown == 0 {
            let eigen_steady = delta.is_some_and(|d| d < config.doubling_max_eigen_change);
            let power_steady = control.previous_power > 0.0
                && control.power / control.previous_power < config.doubling_max_power_ratio;
            if eigen_steady && power_steady {
                dt = (previous_dt * 2.0).min(config.dt_max);
                doubled = dt > previous_dt;
                if doubled {
                    debug!(w = metric.w, dt, "Doubling the time step.");
                }
            }
            control.doubling_countdown = config.doubling_countdown;
        }
    } else {
        control.doubling_countdown = config.doubling_countdown;
    }

    let termination = check_termination(zones, control, config, delta.is_some());

    control.previous_eigenvalue = Some(eigenvalue);
    control.max_eigenvalue_magnitude = control.max_eigenvalue_magnitude.max(eigenvalue.abs());
    control.previous_power = control.power;
    control.dt = dt;
    control.substeps = substeps;

    StepDecision {
        dt,
        substeps,
        halved,
        doubled,
        metric,
        termination,
    }
}

fn check_termination(
    zones: &ZoneState,
    control: &ControlState,
    config: &StabilityConfig,
    has_history: bool,
) -> Option<TerminationReason> {
    if control.time >= config.t_end {
        return Some(TerminationReason::TimeLimit { time: control.time });
    }
    if has_history {
        let limit = config.runaway_factor * control.max_eigenvalue_magnitude;
        if control.max_eigenvalue_magnitude > 0.0 && control.eigenvalue.abs() > limit {
            return Some(TerminationReason::EigenvalueRunaway {
                eigenvalue: control.eigenvalue,
                limit,
            });
        }
    }
    let radius = zones.outer_radius();
    if radius > control.disassembly_radius {
        return Some(TerminationReason::Disassembly {
            radius,
            threshold: control.disassembly_radius,
        });
    }
    if control.cycle >= config.max_cycles {
        return Some(TerminationReason::CycleLimit {
            cycles: control.cycle,
        });
    }
    None
}
