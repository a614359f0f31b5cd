use crate::core::models::material::Material;
use crate::core::models::zone::{ZoneState, clamp_density};
use crate::core::physics::viscosity;
use crate::engine::config::{HydroConfig, SurfaceCondition, VelocityLimiter};
use crate::engine::diagnostics::{Phase, check_finite};
use crate::engine::error::EngineError;
use tracing::{instrument, trace};

/// Offset keeping the relative pressure change finite at zero pressure.
const PRESSURE_SCALE_FLOOR: f64 = 1e-12;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HydroReport {
    /// Zones whose pressure-energy iteration stopped at the iteration cap.
    pub unconverged_zones: Vec<usize>,
    pub max_eos_iterations: usize,
    /// Boundaries whose position was held at the minimum zone width.
    pub floored_boundaries: Vec<usize>,
}

/// Advances the Lagrangian mesh by one substep of length `dt` (μs).
///
/// `deposition[i]` is the fission energy (10¹² erg) released in zone `i` over the substep.
/// The state is updated in the order velocity, position, density, energy and pressure; each
/// stage is scanned for non-finite values before the next one reads it.
#[instrument(level = "debug", skip_all, name = "hydro_step", fields(dt = dt, time = time))]
pub fn run(
    zones: &mut ZoneState,
    materials: &[Material],
    config: &HydroConfig,
    dt: f64,
    time: f64,
    deposition: &[f64],
) -> Result<HydroReport, EngineError> {
    let mut report = HydroReport::default();

    update_velocity(zones, config, dt, time);
    check_finite(&zones.velocity, Phase::VelocityUpdate, "velocity", time)?;

    update_positions(zones, config, dt, &mut report);
    check_finite(&zones.radius, Phase::PositionUpdate, "radius", time)?;

    update_density(zones, materials);
    check_finite(&zones.density, Phase::DensityUpdate, "density", time)?;

    solve_pressure_energy(zones, materials, config, dt, deposition, &mut report);
    check_finite(&zones.pressure, Phase::EquationOfState, "pressure", time)?;
    check_finite(
        &zones.internal_energy,
        Phase::EquationOfState,
        "internal energy",
        time,
    )?;

    zones.ghost_pressure = -zones.pressure.last().copied().unwrap_or(0.0);

    if !report.unconverged_zones.is_empty() {
        trace!(
            zones = ?report.unconverged_zones,
            "Pressure-energy iteration hit its cap."
        );
    }
    Ok(report)
}

/// Acceleration of interior boundary `b` from the pressure jump across it.
fn interior_acceleration(zones: &ZoneState, b: usize) -> f64 {
    let lagrangian = &zones.lagrangian_radius;
    let compression = zones.radius[b] / lagrangian[b];
    let mean_density = 0.5 * (zones.reference_density[b - 1] + zones.reference_density[b]);
    let mean_width = 0.5 * (lagrangian[b + 1] - lagrangian[b - 1]);
    -compression * compression * (zones.pressure[b] - zones.pressure[b - 1])
        / (mean_density * mean_width)
}

/// Acceleration of the outer boundary against the ghost pressure.
fn surface_acceleration(zones: &ZoneState) -> f64 {
    let n = zones.num_zones();
    let lagrangian = &zones.lagrangian_radius;
    let compression = zones.radius[n] / lagrangian[n];
    let width = lagrangian[n] - lagrangian[n - 1];
    -compression * compression * (zones.ghost_pressure - zones.pressure[n - 1])
        / (zones.reference_density[n - 1] * width)
}

fn limit(value: f64, bound: f64) -> f64 {
    value.clamp(-bound, bound)
}

fn update_velocity(zones: &mut ZoneState, config: &HydroConfig, dt: f64, time: f64) {
    let n = zones.num_zones();
    let limiter: Option<VelocityLimiter> = config
        .velocity_limiter
        .filter(|limiter| time >= limiter.active_after);

    let advance = |velocity: f64, acceleration: f64| match limiter {
        Some(l) => limit(
            velocity + limit(acceleration, l.max_acceleration) * dt,
            l.max_velocity,
        ),
        None => velocity + acceleration * dt,
    };

    let mut updated = zones.velocity.clone();
    updated[0] = 0.0;
    for b in 1..n {
        updated[b] = advance(zones.velocity[b], interior_acceleration(zones, b));
    }

    updated[n] = match config.surface {
        SurfaceCondition::Extrapolated if n >= 2 => {
            let inner = zones.radius[n - 1] - zones.radius[n - 2];
            let outer = zones.radius[n] - zones.radius[n - 1];
            let slope = (updated[n - 1] - updated[n - 2]) / inner;
            let extrapolated = updated[n - 1] + slope * outer;
            match limiter {
                Some(l) => limit(extrapolated, l.max_velocity),
                None => extrapolated,
            }
        }
        _ => advance(zones.velocity[n], surface_acceleration(zones)),
    };

    zones.velocity = updated;
}

fn update_positions(zones: &mut ZoneState, config: &HydroConfig, dt: f64, report: &mut HydroReport) {
    for b in 1..zones.num_boundaries() {
        let moved = zones.radius[b] + zones.velocity[b] * dt;
        let floor = zones.radius[b - 1] + config.min_zone_width;
        if moved < floor {
            report.floored_boundaries.push(b);
            zones.radius[b] = floor;
        } else {
            zones.radius[b] = moved;
        }
    }
}

fn update_density(zones: &mut ZoneState, materials: &[Material]) {
    for i in 0..zones.num_zones() {
        let previous = zones.density[i];
        let density = clamp_density(zones.mass[i] / zones.volume(i));
        zones.density[i] = density;
        zones.atom_density[i] = materials[zones.material[i]].atom_density(density);
        zones.specific_volume_change[i] = 1.0 / density - 1.0 / previous;
    }
}

/// Iterates energy and pressure to consistency in every zone.
///
/// The work term uses the mean of the substep's starting pressure and the current guess,
/// so the update is implicit in pressure. Zones that fail to settle within the iteration
/// cap keep their last iterate and are listed in the report.
fn solve_pressure_energy(
    zones: &mut ZoneState,
    materials: &[Material],
    config: &HydroConfig,
    dt: f64,
    deposition: &[f64],
    report: &mut HydroReport,
) {
    for i in 0..zones.num_zones() {
        let material = &materials[zones.material[i]];
        let density = zones.density[i];
        let delta_v = zones.specific_volume_change[i];
        let width = zones.zone_width(i);
        let start_energy = zones.internal_energy[i]
            + deposition.get(i).copied().unwrap_or(0.0) / zones.mass[i];
        let start_pressure = zones.pressure[i];

        let mut guess = start_pressure;
        let mut energy = zones.internal_energy[i];
        let mut temperature = zones.temperature[i];
        let mut hydrostatic = zones.hydrostatic_pressure[i];
        let mut viscous = 0.0;
        let mut converged = false;
        let mut iterations = 0;

        while iterations < config.eos_max_iterations {
            iterations += 1;
            energy = start_energy - 0.5 * (start_pressure + guess) * delta_v;
            temperature = material.heat_capacity.temperature(energy);
            hydrostatic = material.eos.hydrostatic_pressure(density, temperature);
            viscous = viscosity::capped(
                viscosity::von_neumann_richtmyer(
                    config.viscosity_coefficient,
                    density,
                    width,
                    delta_v / dt,
                ),
                hydrostatic,
                config.viscous_cap_ratio,
            );
            let pressure = hydrostatic + viscous;
            let change = (pressure - guess).abs();
            guess = pressure;
            if change <= config.eos_tolerance * (pressure.abs() + PRESSURE_SCALE_FLOOR) {
                converged = true;
                break;
            }
        }

        if !converged {
            report.unconverged_zones.push(i);
        }
        report.max_eos_iterations = report.max_eos_iterations.max(iterations);

        zones.internal_energy[i] = energy;
        zones.temperature[i] = temperature;
        zones.hydrostatic_pressure[i] = hydrostatic;
        zones.viscous_pressure[i] = viscous;
        zones.pressure[i] = guess;
    }
}
