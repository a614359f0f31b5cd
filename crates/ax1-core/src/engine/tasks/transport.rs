use super::sweep::sweep_group;
use crate::core::models::flux::FluxField;
use crate::core::models::material::{CrossSections, Material};
use crate::core::models::zone::ZoneState;
use crate::core::physics::geometry::reduced_volume;
use crate::engine::config::{OuterBoundary, SolverMode, TransportConfig};
use crate::engine::diagnostics::{NonFiniteReport, Phase};
use crate::engine::error::EngineError;
use crate::engine::state::{Eigenvalue, IterationOutcome, SolvedGeometry, TransportState};
use std::f64::consts::PI;
use tracing::{debug, instrument, trace, warn};

/// Relative density change below which the geometry counts as frozen.
const FROZEN_GEOMETRY_TOLERANCE: f64 = 1e-12;
const SEED_FLUX: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct TransportSolution {
    pub eigenvalue: Eigenvalue,
    /// Latest multiplication factor, also available in α mode.
    pub multiplication: f64,
    /// Flux-weighted prompt generation time, μs.
    pub generation_time: f64,
    /// Fission rate density `n·Σ σf·φ` of the normalised flux, per zone.
    pub fission_density: Vec<f64>,
    pub iterations: usize,
    pub converged: bool,
    /// The α update hit the per-solve rate limit.
    pub rate_limited: bool,
    /// The α update was skipped because the geometry had not changed.
    pub skipped: bool,
}

#[inline]
fn is_usable(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Per-solve view of the assembly with precomputed volume weights.
struct Problem<'a> {
    zones: &'a ZoneState,
    materials: &'a [Material],
    weights: Vec<f64>,
    num_groups: usize,
    time: f64,
}

impl<'a> Problem<'a> {
    fn new(zones: &'a ZoneState, materials: &'a [Material], time: f64) -> Self {
        let weights = zones
            .radius
            .windows(2)
            .map(|w| reduced_volume(w[0], w[1]))
            .collect();
        Self {
            zones,
            materials,
            weights,
            num_groups: materials.first().map_or(0, Material::num_groups),
            time,
        }
    }

    #[inline]
    fn num_zones(&self) -> usize {
        self.zones.num_zones()
    }

    #[inline]
    fn xs(&self, zone: usize) -> &CrossSections {
        &self.materials[self.zones.material[zone]].cross_sections
    }

    #[inline]
    fn n(&self, zone: usize) -> f64 {
        self.zones.atom_density[zone]
    }

    fn is_fissile(&self) -> bool {
        (0..self.num_zones()).any(|i| self.n(i) > 0.0 && self.xs(i).is_fissile())
    }

    /// `n·Σ_g νσf_g·φ_g` in one zone.
    fn production_density(&self, flux: &FluxField, zone: usize) -> f64 {
        let xs = self.xs(zone);
        self.n(zone)
            * (0..self.num_groups)
                .map(|g| xs.group(g).nu_sigma_f * flux.scalar(g, zone))
                .sum::<f64>()
    }

    /// Volume-weighted fission neutron production, `Σ T·F`.
    fn production(&self, flux: &FluxField) -> f64 {
        (0..self.num_zones())
            .map(|i| self.weights[i] * self.production_density(flux, i))
            .sum()
    }

    /// Volume-weighted total scattering rate.
    fn scattering(&self, flux: &FluxField) -> f64 {
        (0..self.num_zones())
            .map(|i| {
                let xs = self.xs(i);
                self.weights[i]
                    * self.n(i)
                    * (0..self.num_groups)
                        .map(|g| xs.scatter_out(g) * flux.scalar(g, i))
                        .sum::<f64>()
            })
            .sum()
    }

    /// Volume-weighted neutron population, `Σ T·Σ_g φ_g/V_g`.
    fn population(&self, flux: &FluxField) -> f64 {
        (0..self.num_zones())
            .map(|i| {
                let xs = self.xs(i);
                self.weights[i]
                    * (0..self.num_groups)
                        .map(|g| flux.scalar(g, i) / xs.group(g).velocity)
                        .sum::<f64>()
            })
            .sum()
    }

    fn fission_density(&self, flux: &FluxField) -> Vec<f64> {
        (0..self.num_zones())
            .map(|i| {
                let xs = self.xs(i);
                self.n(i)
                    * (0..self.num_groups)
                        .map(|g| xs.group(g).sigma_f * flux.scalar(g, i))
                        .sum::<f64>()
            })
            .collect()
    }

    /// Isotropic emission density of group `g`: in-scatter plus `fission_scale` times the
    /// fission source.
    fn source(&self, flux: &FluxField, group: usize, fission_scale: f64) -> Vec<f64> {
        (0..self.num_zones())
            .map(|i| {
                let xs = self.xs(i);
                let inscatter: f64 = (0..self.num_groups)
                    .map(|from| xs.transfer(from, group) * flux.scalar(from, i))
                    .sum();
                let fission: f64 = (0..self.num_groups)
                    .map(|from| xs.group(from).nu_sigma_f * flux.scalar(from, i))
                    .sum();
                self.n(i) * (inscatter + xs.group(group).chi * fission_scale * fission)
            })
            .collect()
    }

    fn total_xs(&self, group: usize, alpha: f64, floor: f64) -> Vec<f64> {
        (0..self.num_zones())
            .map(|i| {
                let c = self.xs(i).group(group);
                (self.n(i) * c.sigma_tr + alpha / c.velocity).max(floor)
            })
            .collect()
    }

    fn sweep(
        &self,
        flux: &mut FluxField,
        fission_scale: f64,
        alpha: f64,
        config: &TransportConfig,
    ) -> Result<(), NonFiniteReport> {
        for g in 0..self.num_groups {
            let sigma = self.total_xs(g, alpha, config.cross_section_floor);
            let source = self.source(flux, g, fission_scale);
            sweep_group(flux, g, &self.zones.radius, &sigma, &source, config.boundary);
        }
        match flux.first_non_finite() {
            None => Ok(()),
            Some((group, zone, value)) => {
                let phi = flux.group_scalar(group);
                Err(NonFiniteReport {
                    phase: Phase::TransportSweep,
                    field: "scalar flux",
                    index: zone,
                    time: self.time,
                    value,
                    neighbors: (
                        zone.checked_sub(1).map(|i| phi[i]),
                        phi.get(zone + 1).copied(),
                    ),
                })
            }
        }
    }

    /// Scales the flux to unit fission production, or to unit population when the
    /// assembly produces no fission neutrons.
    fn normalise(&self, flux: &mut FluxField) {
        let production = self.production(flux);
        let norm = if production > 0.0 {
            production
        } else {
            self.population(flux)
        };
        if is_usable(norm) {
            flux.scale(1.0 / norm);
        }
    }

    /// Infinite-medium multiplication corrected for leakage by one-group diffusion theory.
    fn initial_multiplication(&self, boundary: OuterBoundary) -> f64 {
        let mut production = 0.0;
        let mut absorption = 0.0;
        let mut transport = 0.0;
        let mut volume = 0.0;
        for i in 0..self.num_zones() {
            let xs = self.xs(i);
            let t = self.weights[i];
            for g in 0..self.num_groups {
                production += t * self.n(i) * xs.group(g).nu_sigma_f;
                absorption += t * self.n(i) * xs.absorption(g);
                transport += t * self.n(i) * xs.group(g).sigma_tr;
            }
            volume += t * self.num_groups as f64;
        }
        if volume <= 0.0 || absorption <= 0.0 {
            return 1.0;
        }
        let k_infinite = production / absorption;
        let sigma_a = absorption / volume;
        let diffusion = 1.0 / (3.0 * transport / volume);
        let buckling = match boundary {
            OuterBoundary::Vacuum => PI / (self.zones.outer_radius() + 2.0 * diffusion),
            OuterBoundary::Reflective => 0.0,
        };
        let k0 = k_infinite / (1.0 + diffusion / sigma_a * buckling * buckling);
        if is_usable(k0) { k0 } else { 1.0 }
    }

    fn generation_time(&self, flux: &FluxField, config: &TransportConfig) -> f64 {
        let production = self.production(flux);
        let lambda = config.generation_time_scale * self.population(flux) / production;
        if production > 0.0 && is_usable(lambda) {
            lambda
        } else {
            config.fallback_generation_time
        }
    }

    fn geometry(&self) -> SolvedGeometry {
        SolvedGeometry {
            atom_density: self.zones.atom_density.clone(),
            radius: self.zones.radius.clone(),
        }
    }

    fn geometry_unchanged(&self, previous: &SolvedGeometry) -> bool {
        let close = |a: &[f64], b: &[f64]| {
            a.len() == b.len()
                && a.iter()
                    .zip(b)
                    .all(|(x, y)| (x - y).abs() <= FROZEN_GEOMETRY_TOLERANCE * x.abs().max(y.abs()))
        };
        close(&self.zones.atom_density, &previous.atom_density)
            && close(&self.zones.radius, &previous.radius)
    }
}

/// Runs one eigenvalue solve in the mode selected by `config.mode`.
#[instrument(skip_all, name = "transport_solve")]
pub fn run(
    zones: &ZoneState,
    materials: &[Material],
    config: &TransportConfig,
    state: &mut TransportState,
    time: f64,
) -> Result<TransportSolution, EngineError> {
    let problem = Problem::new(zones, materials, time);
    state.solves += 1;

    let solution = match config.mode {
        SolverMode::Multiplication => solve_multiplication(&problem, config, state)?,
        SolverMode::InversePeriod | SolverMode::GeometrySearch { .. } => {
            solve_inverse_period(&problem, config, state, Some(config.alpha_step_limit))?
        }
    };

    if !solution.converged && !solution.rate_limited && !solution.skipped {
        if state.nonconvergence.record() {
            warn!(
                time,
                iterations = solution.iterations,
                eigenvalue = solution.eigenvalue.value(),
                "Transport iteration did not converge; using the last iterate."
            );
        } else {
            debug!(
                iterations = solution.iterations,
                "Transport iteration did not converge."
            );
        }
    }
    Ok(solution)
}

/// α solve without the per-solve rate limit, used while the geometry is being fitted.
pub(crate) fn run_unlimited_alpha(
    zones: &ZoneState,
    materials: &[Material],
    config: &TransportConfig,
    state: &mut TransportState,
) -> Result<TransportSolution, EngineError> {
    let problem = Problem::new(zones, materials, 0.0);
    state.solves += 1;
    solve_inverse_period(&problem, config, state, None)
}

fn prepared_flux(problem: &Problem, state: &mut TransportState) -> FluxField {
    match state.flux.take() {
        Some(flux)
            if flux.fits(problem.num_groups, problem.num_zones()) && !flux.is_degenerate() =>
        {
            flux
        }
        _ => {
            debug!("Seeding a uniform flux.");
            FluxField::uniform(problem.num_groups, problem.num_zones(), SEED_FLUX)
        }
    }
}

fn iterate_multiplication(
    problem: &Problem,
    config: &TransportConfig,
    flux: &mut FluxField,
    initial_k: f64,
) -> Result<IterationOutcome<f64>, NonFiniteReport> {
    let mut k = initial_k;
    problem.normalise(flux);

    for iteration in 1..=config.max_iterations {
        let old = problem.production(flux);
        problem.sweep(flux, 1.0 / k, 0.0, config)?;
        let new = problem.production(flux);
        if !is_usable(old) || !is_usable(new) {
            return Ok(IterationOutcome::exhausted(k, iteration));
        }

        let k_new = k * new / old;
        flux.scale(1.0 / new);
        let change = (k_new - k).abs();
        k = k_new;
        trace!(iteration, k, change, "k iteration");

        if change < config.k_tolerance {
            return Ok(IterationOutcome::converged(k, iteration));
        }
    }
    Ok(IterationOutcome::exhausted(k, config.max_iterations))
}

fn solve_multiplication(
    problem: &Problem,
    config: &TransportConfig,
    state: &mut TransportState,
) -> Result<TransportSolution, EngineError> {
    let mut flux = prepared_flux(problem, state);

    if !problem.is_fissile() {
        debug!("No fission source present; k = 0.");
        let fission_density = problem.fission_density(&flux);
        state.flux = Some(flux);
        state.k = Some(0.0);
        state.generation_time = Some(config.fallback_generation_time);
        return Ok(TransportSolution {
            eigenvalue: Eigenvalue::Multiplication(0.0),
            multiplication: 0.0,
            generation_time: config.fallback_generation_time,
            fission_density,
            iterations: 0,
            converged: true,
            rate_limited: false,
            skipped: false,
        });
    }

    let initial_k = state
        .k
        .filter(|&k| is_usable(k))
        .unwrap_or_else(|| problem.initial_multiplication(config.boundary));
    let outcome = iterate_multiplication(problem, config, &mut flux, initial_k)?;
    let generation_time = problem.generation_time(&flux, config);

    debug!(
        k = outcome.value,
        iterations = outcome.iterations,
        converged = outcome.converged,
        generation_time,
        "k solve finished."
    );

    let fission_density = problem.fission_density(&flux);
    state.flux = Some(flux);
    state.k = Some(outcome.value);
    state.generation_time = Some(generation_time);

    Ok(TransportSolution {
        eigenvalue: Eigenvalue::Multiplication(outcome.value),
        multiplication: outcome.value,
        generation_time,
        fission_density,
        iterations: outcome.iterations,
        converged: outcome.converged,
        rate_limited: false,
        skipped: false,
    })
}

struct AlphaIteration {
    outcome: IterationOutcome<f64>,
    rate_limited: bool,
}

fn iterate_inverse_period(
    problem: &Problem,
    config: &TransportConfig,
    flux: &mut FluxField,
    initial_alpha: f64,
    rate_limit: Option<f64>,
) -> Result<AlphaIteration, NonFiniteReport> {
    let mut alpha = initial_alpha;
    problem.normalise(flux);

    for iteration in 1..=config.max_iterations {
        let fission_before = problem.production(flux);
        let scatter_before = problem.scattering(flux);
        problem.sweep(flux, 1.0, alpha, config)?;
        let fission_after = problem.production(flux);
        let scatter_after = problem.scattering(flux);
        let weight = problem.population(flux);

        if !is_usable(weight) {
            problem.normalise(flux);
            return Ok(AlphaIteration {
                outcome: IterationOutcome::exhausted(alpha, iteration),
                rate_limited: false,
            });
        }

        let change = ((fission_after - fission_before) + (scatter_after - scatter_before)) / weight;
        let mut next = alpha + change;
        problem.normalise(flux);

        if let Some(limit) = rate_limit {
            let bounded = next.clamp(initial_alpha - limit, initial_alpha + limit);
            if bounded != next {
                trace!(iteration, requested = next, applied = bounded, "α update rate limited");
                next = bounded;
                return Ok(AlphaIteration {
                    outcome: IterationOutcome::exhausted(next, iteration),
                    rate_limited: true,
                });
            }
        }

        alpha = next;
        trace!(iteration, alpha, change, "α iteration");
        if change.abs() < config.alpha_tolerance {
            return Ok(AlphaIteration {
                outcome: IterationOutcome::converged(alpha, iteration),
                rate_limited: false,
            });
        }
    }
    Ok(AlphaIteration {
        outcome: IterationOutcome::exhausted(alpha, config.max_iterations),
        rate_limited: false,
    })
}

/// Prompt multiplication implied by an inverse period, `k = 1 + αΛ`.
#[inline]
fn multiplication_from_period(alpha: f64, generation_time: f64) -> f64 {
    (1.0 + alpha * generation_time).max(0.0)
}

fn solve_inverse_period(
    problem: &Problem,
    config: &TransportConfig,
    state: &mut TransportState,
    rate_limit: Option<f64>,
) -> Result<TransportSolution, EngineError> {
    if let (Some(alpha), Some(previous), Some(flux)) =
        (state.alpha, &state.solved_geometry, &state.flux)
    {
        if problem.geometry_unchanged(previous) && flux.fits(problem.num_groups, problem.num_zones())
        {
            debug!(alpha, "Geometry unchanged since the last α solve; reusing α.");
            return Ok(TransportSolution {
                eigenvalue: Eigenvalue::InversePeriod(alpha),
                multiplication: state.k.unwrap_or(0.0),
                generation_time: state
                    .generation_time
                    .unwrap_or(config.fallback_generation_time),
                fission_density: problem.fission_density(flux),
                iterations: 0,
                converged: true,
                rate_limited: false,
                skipped: true,
            });
        }
    }

    let (initial_alpha, limit) = match state.alpha {
        Some(alpha) if alpha.is_finite() => (alpha, rate_limit),
        _ => {
            let k_solution = solve_multiplication(problem, config, state)?;
            let alpha0 = (k_solution.multiplication - 1.0) / k_solution.generation_time;
            debug!(
                k = k_solution.multiplication,
                generation_time = k_solution.generation_time,
                alpha0,
                "Starting α iteration from the k solution."
            );
            (alpha0, None)
        }
    };

    let mut flux = prepared_flux(problem, state);
    let iteration = iterate_inverse_period(problem, config, &mut flux, initial_alpha, limit)?;
    let alpha = iteration.outcome.value;

    if iteration.rate_limited {
        if state.nonconvergence.record() {
            warn!(
                time = problem.time,
                alpha,
                limit = config.alpha_step_limit,
                "α update reached the per-solve rate limit."
            );
        } else {
            debug!(alpha, "α update rate limited.");
        }
    }
    debug!(
        alpha,
        iterations = iteration.outcome.iterations,
        converged = iteration.outcome.converged,
        "α solve finished."
    );

    let generation_time = problem.generation_time(&flux, config);
    let multiplication = multiplication_from_period(alpha, generation_time);
    let fission_density = problem.fission_density(&flux);
    state.flux = Some(flux);
    state.alpha = Some(alpha);
    state.k = Some(multiplication);
    state.generation_time = Some(generation_time);
    state.solved_geometry = Some(problem.geometry());

    Ok(TransportSolution {
        eigenvalue: Eigenvalue::InversePeriod(alpha),
        multiplication,
        generation_time,
        fission_density,
        iterations: iteration.outcome.iterations,
        converged: iteration.outcome.converged,
        rate_limited: iteration.rate_limited,
        skipped: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::assembly::{Assembly, AssemblyBuilder};
    use crate::core::models::material::GroupConstants;
    use crate::core::physics::eos::{HeatCapacity, LinearEos};

    fn one_group_material(nu_sigma_f: f64, sigma_f: f64, sigma_s: f64, sigma_tr: f64) -> Material {
        Material {
            name: "test".to_string(),
            eos: LinearEos::new(1.0, 0.5, 0.1),
            heat_capacity: HeatCapacity::new(1.0, 0.0),
            cross_sections: CrossSections::new(
                vec![GroupConstants {
                    nu_sigma_f,
                    sigma_f,
                    sigma_tr,
                    chi: 1.0,
                    velocity: 1.0,
                }],
                vec![vec![sigma_s]],
            ),
            rolab: 1.0,
        }
    }

    fn uniform_sphere(material: Material, zones: usize, radius: f64) -> Assembly {
        AssemblyBuilder::new()
            .radii((0..=zones).map(|i| radius * i as f64 / zones as f64).collect())
            .zone_materials(vec![0; zones])
            .densities(vec![1.0; zones])
            .temperatures(vec![0.0; zones])
            .material(material)
            .build()
            .unwrap()
    }

    fn config(mode: SolverMode, boundary: OuterBoundary) -> TransportConfig {
        TransportConfig {
            mode,
            boundary,
            k_tolerance: 1e-10,
            alpha_tolerance: 1e-10,
            max_iterations: 2000,
            ..TransportConfig::default()
        }
    }

    #[test]
    fn reflective_uniform_medium_converges_to_nu() {
        let nu = 2.5;
        let assembly = uniform_sphere(one_group_material(nu * 1.0, 1.0, 1.5, 2.5), 8, 10.0);
        let config = config(SolverMode::Multiplication, OuterBoundary::Reflective);
        let mut state = TransportState::new();

        let solution = run(&assembly.zones, &assembly.materials, &config, &mut state, 0.0).unwrap();

        assert!(solution.converged);
        assert!((solution.eigenvalue.value() - nu).abs() < 1e-6);
        assert_eq!(state.k, Some(solution.multiplication));
    }

    #[test]
    fn vacuum_boundary_reduces_multiplication_below_infinite_medium() {
        let assembly = uniform_sphere(one_group_material(2.5, 1.0, 1.5, 2.5), 10, 3.0);
        let config = config(SolverMode::Multiplication, OuterBoundary::Vacuum);
        let mut state = TransportState::new();

        let solution = run(&assembly.zones, &assembly.materials, &config, &mut state, 0.0).unwrap();

        assert!(solution.eigenvalue.value() < 2.5);
        assert!(solution.eigenvalue.value() > 0.0);
        let phi = state.flux.as_ref().unwrap().group_scalar(0).to_vec();
        assert!(phi[0] > phi[9]);
    }

    #[test]
    fn initial_multiplication_uses_buckling_correction() {
        let assembly = uniform_sphere(one_group_material(2.5, 1.0, 1.5, 2.5), 10, 3.0);
        let problem = Problem::new(&assembly.zones, &assembly.materials, 0.0);
        let reflective = problem.initial_multiplication(OuterBoundary::Reflective);
        let vacuum = problem.initial_multiplication(OuterBoundary::Vacuum);
        assert!((reflective - 2.5).abs() < 1e-12);
        assert!(vacuum < reflective);
    }

    #[test]
    fn non_fissile_assembly_reports_zero_multiplication() {
        let assembly = uniform_sphere(one_group_material(0.0, 0.0, 1.5, 2.5), 4, 2.0);
        let config = config(SolverMode::Multiplication, OuterBoundary::Vacuum);
        let mut state = TransportState::new();

        let solution = run(&assembly.zones, &assembly.materials, &config, &mut state, 0.0).unwrap();

        assert_eq!(solution.eigenvalue, Eigenvalue::Multiplication(0.0));
        assert_eq!(solution.generation_time, config.fallback_generation_time);
        assert!(solution.fission_density.iter().all(|&f| f == 0.0));
    }

    #[test]
    fn reflective_uniform_medium_gives_closed_form_alpha() {
        // α = V·n·(νσf − σa) with νσf = 2, σa = 1, V = 1, n = 1.
        let assembly = uniform_sphere(one_group_material(2.0, 0.8, 2.0, 3.0), 6, 10.0);
        let config = config(SolverMode::InversePeriod, OuterBoundary::Reflective);
        let mut state = TransportState::new();

        let solution = run(&assembly.zones, &assembly.materials, &config, &mut state, 0.0).unwrap();

        assert!(solution.converged);
        assert!(!solution.rate_limited);
        assert!((solution.eigenvalue.value() - 1.0).abs() < 1e-6);
        // Λ = 1/(V·n·νσf) = 0.5 for the converged flat flux, so k = 1 + αΛ = 1.5.
        assert!((solution.generation_time - 0.5).abs() < 1e-6);
        assert!((solution.multiplication - 1.5).abs() < 1e-6);
        assert_eq!(state.k, Some(solution.multiplication));
        assert_eq!(state.generation_time, Some(solution.generation_time));
    }

    #[test]
    fn alpha_solves_refresh_generation_time_and_multiplication() {
        // Half-density fuel in a reflective sphere: α = n·(νσf − σa) = 0.5, Λ = 1.
        let mut assembly = uniform_sphere(one_group_material(2.0, 0.8, 2.0, 3.0), 6, 10.0);
        for i in 0..assembly.zones.num_zones() {
            assembly.zones.density[i] *= 0.5;
            assembly.zones.atom_density[i] *= 0.5;
        }
        let mut config = config(SolverMode::InversePeriod, OuterBoundary::Reflective);
        config.alpha_step_limit = 10.0;
        let mut state = TransportState::new();

        let first = run(&assembly.zones, &assembly.materials, &config, &mut state, 0.0).unwrap();
        assert!((first.eigenvalue.value() - 0.5).abs() < 1e-6);
        assert!((first.generation_time - 1.0).abs() < 1e-6);

        for i in 0..assembly.zones.num_zones() {
            assembly.zones.density[i] *= 2.0;
            assembly.zones.atom_density[i] *= 2.0;
        }
        let second = run(&assembly.zones, &assembly.materials, &config, &mut state, 2.0).unwrap();

        assert!(second.converged);
        assert!((second.eigenvalue.value() - 1.0).abs() < 1e-6);
        assert!((second.generation_time - 0.5).abs() < 1e-6);
        let k = 1.0 + second.eigenvalue.value() * second.generation_time;
        assert!((second.multiplication - k).abs() < 1e-12);
        assert!(second.multiplication > 1.0);
    }

    #[test]
    fn exhausted_iteration_reports_last_finite_iterate() {
        let assembly = uniform_sphere(one_group_material(2.5, 1.0, 1.5, 2.5), 10, 3.0);
        let mut config = config(SolverMode::Multiplication, OuterBoundary::Vacuum);
        config.max_iterations = 1;
        let mut state = TransportState::new();

        let solution = run(&assembly.zones, &assembly.materials, &config, &mut state, 0.0).unwrap();

        assert!(!solution.converged);
        assert_eq!(solution.iterations, 1);
        assert!(solution.eigenvalue.value().is_finite());
        assert!(solution.eigenvalue.value() > 0.0);
        assert!(solution.generation_time.is_finite());
        assert!(solution.fission_density.iter().all(|f| f.is_finite()));
        assert_eq!(state.k, Some(solution.multiplication));
        assert!(state.flux.as_ref().is_some_and(|flux| !flux.is_degenerate()));
    }

    #[test]
    fn alpha_solve_is_skipped_when_geometry_is_frozen() {
        let assembly = uniform_sphere(one_group_material(2.0, 0.8, 2.0, 3.0), 6, 10.0);
        let config = config(SolverMode::InversePeriod, OuterBoundary::Reflective);
        let mut state = TransportState::new();

        let first = run(&assembly.zones, &assembly.materials, &config, &mut state, 0.0).unwrap();
        let second = run(&assembly.zones, &assembly.materials, &config, &mut state, 2.0).unwrap();

        assert!(!first.skipped);
        assert!(second.skipped);
        assert_eq!(second.iterations, 0);
        assert_eq!(first.eigenvalue, second.eigenvalue);
        assert_eq!(state.solves, 2);
    }

    #[test]
    fn alpha_change_is_rate_limited_after_the_first_solve() {
        let mut assembly = uniform_sphere(one_group_material(2.0, 0.8, 2.0, 3.0), 6, 10.0);
        let mut config = config(SolverMode::InversePeriod, OuterBoundary::Reflective);
        config.alpha_step_limit = 0.01;
        let mut state = TransportState::new();

        let first = run(&assembly.zones, &assembly.materials, &config, &mut state, 0.0).unwrap();

        for i in 0..assembly.zones.num_zones() {
            assembly.zones.density[i] *= 2.0;
            assembly.zones.atom_density[i] *= 2.0;
        }
        let second = run(&assembly.zones, &assembly.materials, &config, &mut state, 2.0).unwrap();

        assert!(second.rate_limited);
        assert!(!second.converged);
        let step = second.eigenvalue.value() - first.eigenvalue.value();
        assert!((step.abs() - 0.01).abs() < 1e-12);
        assert!(step > 0.0);
    }

    #[test]
    fn generation_time_matches_flux_weighted_definition() {
        let assembly = uniform_sphere(one_group_material(2.0, 0.8, 2.0, 3.0), 6, 10.0);
        let mut config = config(SolverMode::Multiplication, OuterBoundary::Reflective);
        config.generation_time_scale = 2.0;
        let mut state = TransportState::new();

        let solution = run(&assembly.zones, &assembly.materials, &config, &mut state, 0.0).unwrap();

        // Flat flux: Λ = scale / (V·n·νσf).
        assert!((solution.generation_time - 1.0).abs() < 1e-6);
    }

    #[test]
    fn degenerate_cached_flux_is_reseeded() {
        let assembly = uniform_sphere(one_group_material(2.5, 1.0, 1.5, 2.5), 4, 10.0);
        let config = config(SolverMode::Multiplication, OuterBoundary::Reflective);
        let mut state = TransportState::new();
        state.flux = Some(FluxField::uniform(1, 4, 0.0));
        state.k = Some(f64::NAN);

        let solution = run(&assembly.zones, &assembly.materials, &config, &mut state, 0.0).unwrap();

        assert!((solution.eigenvalue.value() - 2.5).abs() < 1e-6);
    }
}
