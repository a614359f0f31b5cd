use super::deposition;
use crate::core::io::output::TimeSeriesRow;
use crate::core::models::assembly::Assembly;
use crate::core::models::zone::ZoneState;
use crate::engine::config::{SimulationConfig, SolverMode};
use crate::engine::diagnostics::WarningThrottle;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::state::{ControlState, Eigenvalue, IterationOutcome, TransportState};
use crate::engine::tasks::stability::{StabilityMetric, TerminationReason};
use crate::engine::tasks::transport::TransportSolution;
use crate::engine::tasks::{geometry_search, hydro, stability, transport};
use tracing::{debug, error, info, instrument, warn};

/// Pressure-energy iteration warnings logged before the rest drop to `debug`.
const LOGGED_EOS_WARNINGS: usize = 10;

/// Everything reported about one completed cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleRecord {
    pub cycle: usize,
    /// Time at the end of the cycle, μs.
    pub time: f64,
    /// Substep length used during the cycle, μs.
    pub dt: f64,
    pub substeps: usize,
    pub eigenvalue: Eigenvalue,
    /// Inverse period that drove the power, μs⁻¹.
    pub alpha: f64,
    pub multiplication: f64,
    pub power: f64,
    pub relative_power: f64,
    pub generated_energy: f64,
    pub cycle_energy: f64,
    /// `IE₀ + KE₀` at the start of the run.
    pub initial_energy: f64,
    pub internal_energy: f64,
    pub kinetic_energy: f64,
    /// `(IE + KE) − (IE₀ + KE₀ + Q)`.
    pub energy_check: f64,
    pub outer_radius: f64,
    pub metric: StabilityMetric,
    pub transport_iterations: usize,
    pub transport_converged: bool,
}

impl CycleRecord {
    pub fn to_row(&self) -> TimeSeriesRow {
        TimeSeriesRow {
            cycle: self.cycle,
            time_microsec: self.time,
            dt_microsec: self.dt,
            substeps: self.substeps,
            total_energy: self.initial_energy + self.generated_energy,
            power_relative: self.relative_power,
            alpha_1_microsec: self.alpha,
            k_eff: self.multiplication,
            w: self.metric.w,
            w_cfl: self.metric.w_cfl,
            w_visc: self.metric.w_visc,
            kinetic_energy: self.kinetic_energy,
            internal_energy: self.internal_energy,
            energy_check: self.energy_check,
            outer_radius_cm: self.outer_radius,
            transport_iterations: self.transport_iterations,
            transport_converged: self.transport_converged,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    pub termination: TerminationReason,
    pub cycles: usize,
    pub time: f64,
    pub generated_energy: f64,
    pub final_power: f64,
    pub final_eigenvalue: Eigenvalue,
    /// Radius scale found by the critical geometry search, when one was run.
    pub geometry_search: Option<IterationOutcome<f64>>,
    pub transport_solves: usize,
}

/// Receives the state of the run at its start, after every cycle, and at its end.
pub trait CycleObserver {
    fn on_start(
        &mut self,
        _zones: &ZoneState,
        _solution: &TransportSolution,
    ) -> Result<(), EngineError> {
        Ok(())
    }

    fn on_cycle(
        &mut self,
        _record: &CycleRecord,
        _zones: &ZoneState,
        _solution: &TransportSolution,
    ) -> Result<(), EngineError> {
        Ok(())
    }

    fn on_finish(
        &mut self,
        _result: &SimulationResult,
        _zones: &ZoneState,
        _solution: &TransportSolution,
    ) -> Result<(), EngineError> {
        Ok(())
    }
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl CycleObserver for NullObserver {}

/// Runs the coupled transient until a termination condition is met.
///
/// Each cycle solves the eigenvalue problem once, advances the hydrodynamics by
/// `substeps` substeps of `dt` with point-kinetics energy deposition, and lets the stability
/// controller choose the next step. In geometry-search mode the assembly radii are first
/// scaled to the target α.
#[instrument(skip_all, name = "simulation_workflow")]
pub fn run<O: CycleObserver>(
    assembly: &mut Assembly,
    config: &SimulationConfig,
    reporter: &ProgressReporter,
    observer: &mut O,
) -> Result<SimulationResult, EngineError> {
    let result = execute(assembly, config, reporter, observer);
    if let Err(EngineError::NonFinite(report)) = &result {
        error!(%report, "Numerical failure; stopping the run.");
    }
    result
}

fn execute<O: CycleObserver>(
    assembly: &mut Assembly,
    config: &SimulationConfig,
    reporter: &ProgressReporter,
    observer: &mut O,
) -> Result<SimulationResult, EngineError> {
    // === Phase 0: Preparation ===
    reporter.report(Progress::PhaseStart {
        name: "Preparation",
    });
    info!(
        zones = assembly.zones.num_zones(),
        groups = assembly.num_groups(),
        materials = assembly.materials.len(),
        mode = config.transport.mode.name(),
        "Preparing transient."
    );

    let mut transport_state = TransportState::new();
    let search = match config.transport.mode {
        SolverMode::GeometrySearch { .. } => Some(geometry_search::run(
            assembly,
            &config.transport,
            &mut transport_state,
            reporter,
        )?),
        _ => None,
    };
    reporter.report(Progress::PhaseFinish);

    // === Phase 1: Transient ===
    reporter.report(Progress::PhaseStart { name: "Transient" });
    reporter.report(Progress::TransientStart {
        t_end: config.stability.t_end,
    });

    let zones = &mut assembly.zones;
    let materials = &assembly.materials;
    let mut control = ControlState::new(config, zones.outer_radius());
    let initial_energy = zones.total_internal_energy() + zones.total_kinetic_energy();
    let mut eos_warnings = WarningThrottle::new(LOGGED_EOS_WARNINGS);
    let mut started = false;

    let (termination, solution) = loop {
        let solution = transport::run(
            zones,
            materials,
            &config.transport,
            &mut transport_state,
            control.time,
        )?;
        if !started {
            observer.on_start(zones, &solution)?;
            started = true;
        }

        let alpha = match solution.eigenvalue {
            Eigenvalue::InversePeriod(alpha) => alpha,
            Eigenvalue::Multiplication(k) => (k - 1.0) / solution.generation_time,
        };

        let dt = control.dt;
        let substeps = control.substeps;
        let mut cycle_energy = 0.0;
        for _ in 0..substeps {
            let step = deposition::substep_energy(control.power, alpha, dt, config.max_exponent);
            let shares = deposition::distribute(step.energy, &solution.fission_density, zones);
            let report = hydro::run(zones, materials, &config.hydro, dt, control.time, &shares)?;
            if !report.unconverged_zones.is_empty() {
                if eos_warnings.record() {
                    warn!(
                        time = control.time,
                        zones = ?report.unconverged_zones,
                        "Pressure-energy iteration did not converge; using the last iterate."
                    );
                } else {
                    debug!(zones = ?report.unconverged_zones, "Pressure-energy iteration did not converge.");
                }
            }
            control.power = step.power;
            control.time += dt;
            cycle_energy += step.energy;
        }

        control.cycle += 1;
        control.cycle_energy = cycle_energy;
        control.generated_energy += cycle_energy;
        control.eigenvalue = solution.eigenvalue.value();

        let internal_energy = zones.total_internal_energy();
        let kinetic_energy = zones.total_kinetic_energy();
        let energy_check =
            (internal_energy + kinetic_energy) - (initial_energy + control.generated_energy);

        let decision = stability::adjust(
            zones,
            &mut control,
            &config.stability,
            config.hydro.viscosity_coefficient,
        );

        let record = CycleRecord {
            cycle: control.cycle,
            time: control.time,
            dt,
            substeps,
            eigenvalue: solution.eigenvalue,
            alpha,
            multiplication: solution.multiplication,
            power: control.power,
            relative_power: control.power / config.initial_power,
            generated_energy: control.generated_energy,
            cycle_energy,
            initial_energy,
            internal_energy,
            kinetic_energy,
            energy_check,
            outer_radius: zones.outer_radius(),
            metric: decision.metric,
            transport_iterations: solution.iterations,
            transport_converged: solution.converged,
        };
        info!(
            cycle = record.cycle,
            time = record.time,
            dt = record.dt,
            substeps = record.substeps,
            eigenvalue = solution.eigenvalue.value(),
            power = record.relative_power,
            w = record.metric.w,
            "Cycle complete."
        );
        observer.on_cycle(&record, zones, &solution)?;
        reporter.report(Progress::CycleFinished {
            cycle: control.cycle,
            time: control.time,
            eigenvalue: solution.eigenvalue.value(),
        });

        if let Some(reason) = decision.termination {
            break (reason, solution);
        }
    };

    reporter.report(Progress::PhaseFinish);

    if eos_warnings.suppressed() > 0 {
        warn!(
            suppressed = eos_warnings.suppressed(),
            "Further pressure-energy convergence warnings were logged at debug level."
        );
    }

    let result = SimulationResult {
        termination,
        cycles: control.cycle,
        time: control.time,
        generated_energy: control.generated_energy,
        final_power: control.power,
        final_eigenvalue: solution.eigenvalue,
        geometry_search: search,
        transport_solves: transport_state.solves,
    };
    observer.on_finish(&result, zones, &solution)?;

    info!(
        reason = %result.termination,
        cycles = result.cycles,
        time = result.time,
        energy = result.generated_energy,
        "Transient finished."
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::assembly::AssemblyBuilder;
    use crate::core::models::material::{CrossSections, GroupConstants, Material};
    use crate::core::physics::eos::{HeatCapacity, LinearEos};
    use crate::engine::config::{OuterBoundary, SimulationConfigBuilder, StabilityConfig};

    fn fuel(nu_sigma_f: f64) -> Material {
        Material {
            name: "fuel".to_string(),
            eos: LinearEos::new(0.02873, 278.46, -0.3946),
            heat_capacity: HeatCapacity::new(12.163, 5780.0),
            cross_sections: CrossSections::new(
                vec![GroupConstants {
                    nu_sigma_f,
                    sigma_f: nu_sigma_f / 2.5,
                    sigma_tr: 7.0,
                    chi: 1.0,
                    velocity: 1000.0,
                }],
                vec![vec![6.196]],
            ),
            rolab: 396.0,
        }
    }

    fn assembly(nu_sigma_f: f64) -> Assembly {
        let zones = 8;
        AssemblyBuilder::new()
            .radii((0..=zones).map(|i| 20.0 * i as f64 / zones as f64).collect())
            .zone_materials(vec![0; zones])
            .densities(vec![8.0; zones])
            .temperatures(vec![0.0; zones])
            .material(fuel(nu_sigma_f))
            .build()
            .unwrap()
    }

    fn config(mode: SolverMode, t_end: f64) -> SimulationConfig {
        SimulationConfigBuilder::new()
            .mode(mode)
            .boundary(OuterBoundary::Vacuum)
            .t_end(t_end)
            .dt_initial(1.0)
            .dt_max(4.0)
            .initial_power(1.0)
            .stability(StabilityConfig {
                max_cycles: 500,
                ..StabilityConfig::default()
            })
            .build()
            .unwrap()
    }

    #[derive(Default)]
    struct RecordingObserver {
        started: bool,
        records: Vec<CycleRecord>,
        finished: Option<SimulationResult>,
    }

    impl CycleObserver for RecordingObserver {
        fn on_start(
            &mut self,
            _zones: &ZoneState,
            _solution: &TransportSolution,
        ) -> Result<(), EngineError> {
            self.started = true;
            Ok(())
        }

        fn on_cycle(
            &mut self,
            record: &CycleRecord,
            _zones: &ZoneState,
            _solution: &TransportSolution,
        ) -> Result<(), EngineError> {
            self.records.push(record.clone());
            Ok(())
        }

        fn on_finish(
            &mut self,
            result: &SimulationResult,
            _zones: &ZoneState,
            _solution: &TransportSolution,
        ) -> Result<(), EngineError> {
            self.finished = Some(result.clone());
            Ok(())
        }
    }

    #[test]
    fn short_transient_reaches_time_limit() {
        let mut assembly = assembly(0.95);
        let config = config(SolverMode::InversePeriod, 10.0);
        let mut observer = RecordingObserver::default();

        let result = run(&mut assembly, &config, &ProgressReporter::new(), &mut observer).unwrap();

        assert!(matches!(result.termination, TerminationReason::TimeLimit { .. }));
        assert!(result.time >= 10.0);
        assert!(observer.started);
        assert_eq!(observer.records.len(), result.cycles);
        assert_eq!(observer.finished.as_ref(), Some(&result));
        assert!(result.generated_energy > 0.0);

        let cycles: Vec<usize> = observer.records.iter().map(|r| r.cycle).collect();
        assert_eq!(cycles, (1..=result.cycles).collect::<Vec<_>>());
        assert!(observer.records.windows(2).all(|w| w[1].time > w[0].time));
    }

    #[test]
    fn energy_check_stays_small_relative_to_generated_energy() {
        let mut assembly = assembly(0.95);
        let config = config(SolverMode::InversePeriod, 20.0);
        let mut observer = RecordingObserver::default();

        run(&mut assembly, &config, &ProgressReporter::new(), &mut observer).unwrap();

        let last = observer.records.last().unwrap();
        assert!(last.internal_energy > 0.0);
        assert!(last.energy_check.abs() <= 0.05 * last.generated_energy.max(1e-12));

        let first = &observer.records[0];
        assert!(observer.records.iter().all(|r| r.initial_energy == first.initial_energy));
        let row = last.to_row();
        assert_eq!(row.total_energy, last.initial_energy + last.generated_energy);
        assert!(row.total_energy >= last.generated_energy);
    }

    #[test]
    fn multiplication_mode_drives_power_with_effective_alpha() {
        let mut assembly = assembly(0.95);
        let config = config(SolverMode::Multiplication, 4.0);
        let mut observer = RecordingObserver::default();

        let result = run(&mut assembly, &config, &ProgressReporter::new(), &mut observer).unwrap();

        assert!(matches!(result.final_eigenvalue, Eigenvalue::Multiplication(_)));
        let first = &observer.records[0];
        let k = first.eigenvalue.value();
        assert_eq!(first.multiplication, k);
        assert_eq!(first.alpha.signum(), (k - 1.0).signum());
    }

    #[test]
    fn subcritical_assembly_loses_power() {
        let mut assembly = assembly(0.2);
        let config = config(SolverMode::InversePeriod, 5.0);
        let mut observer = RecordingObserver::default();

        let result = run(&mut assembly, &config, &ProgressReporter::new(), &mut observer).unwrap();

        assert!(observer.records[0].alpha < 0.0);
        assert!(result.final_power < 1.0);
    }

    #[test]
    fn cycle_record_maps_onto_time_series_row() {
        let record = CycleRecord {
            cycle: 3,
            time: 6.0,
            dt: 2.0,
            substeps: 1,
            eigenvalue: Eigenvalue::InversePeriod(0.013),
            alpha: 0.013,
            multiplication: 1.002,
            power: 2.0,
            relative_power: 2.0,
            generated_energy: 5.0,
            cycle_energy: 1.0,
            initial_energy: 3.0,
            internal_energy: 7.9,
            kinetic_energy: 0.1,
            energy_check: 0.0,
            outer_radius: 20.0,
            metric: StabilityMetric {
                w: 0.1,
                w_cfl: 0.07,
                w_visc: 0.03,
                zone: 2,
            },
            transport_iterations: 4,
            transport_converged: true,
        };
        let row = record.to_row();
        assert_eq!(row.cycle, 3);
        assert_eq!(row.alpha_1_microsec, 0.013);
        assert_eq!(row.k_eff, 1.002);
        assert_eq!(row.w_visc, 0.03);
        assert_eq!(row.outer_radius_cm, 20.0);
        assert_eq!(row.total_energy, 8.0);
        let closure = row.internal_energy + row.kinetic_energy - row.energy_check;
        assert!((row.total_energy - closure).abs() < 1e-12);
    }

    #[test]
    fn null_observer_accepts_every_event() {
        let mut assembly = assembly(0.95);
        let config = config(SolverMode::InversePeriod, 2.0);
        let result = run(
            &mut assembly,
            &config,
            &ProgressReporter::new(),
            &mut NullObserver,
        )
        .unwrap();
        assert!(result.cycles >= 1);
        assert_eq!(result.transport_solves, result.cycles);
    }
}
