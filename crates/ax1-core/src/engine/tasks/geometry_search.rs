use super::transport::run_unlimited_alpha;
use crate::core::models::assembly::Assembly;
use crate::engine::config::{ConfigError, SolverMode, TransportConfig};
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::state::{IterationOutcome, TransportState};
use tracing::{debug, info, instrument, warn};

/// First trial scale when α is above or below the target.
const SHRINK_STEP: f64 = 0.98;
const GROW_STEP: f64 = 1.02;
/// Largest factor by which one secant step may move the scale.
const MAX_SECANT_FACTOR: f64 = 2.0;

/// Scales every radius of `assembly` uniformly, at fixed density, until the α eigenvalue
/// matches the target of a `GeometrySearch` mode.
///
/// The search is a secant iteration on the scale factor. It stops when the relative change
/// of the scale drops below the radius tolerance. The assembly is left scaled by the final
/// factor, with its masses re-established, and the returned outcome carries that factor.
#[instrument(skip_all, name = "geometry_search")]
pub fn run(
    assembly: &mut Assembly,
    config: &TransportConfig,
    state: &mut TransportState,
    reporter: &ProgressReporter,
) -> Result<IterationOutcome<f64>, EngineError> {
    let SolverMode::GeometrySearch {
        alpha_target,
        radius_tolerance,
    } = config.mode
    else {
        return Err(ConfigError::InvalidParameter {
            name: "mode",
            reason: format!(
                "geometry search requires the geometry-search mode, got '{}'",
                config.mode.name()
            ),
        }
        .into());
    };

    let fissile = (0..assembly.zones.num_zones())
        .any(|i| assembly.material_of(i).cross_sections.is_fissile());
    if !fissile {
        return Err(EngineError::NoFissionSource {
            mode: config.mode.name(),
        });
    }

    info!(
        alpha_target,
        radius_tolerance,
        outer_radius = assembly.zones.outer_radius(),
        "Starting critical geometry search."
    );
    reporter.report(Progress::TaskStart {
        total_steps: config.search_max_iterations as u64,
    });

    let residual = |scale: f64, state: &mut TransportState| -> Result<f64, EngineError> {
        let mut trial = assembly.clone();
        trial.scale_radii(scale);
        let solution = run_unlimited_alpha(&trial.zones, &trial.materials, config, state)?;
        reporter.report(Progress::TaskIncrement);
        let alpha = solution.eigenvalue.value();
        debug!(scale, alpha, "Geometry search trial.");
        Ok(alpha - alpha_target)
    };

    let mut previous_scale = 1.0;
    let mut previous_residual = residual(previous_scale, state)?;
    let mut scale = if previous_residual > 0.0 {
        SHRINK_STEP
    } else {
        GROW_STEP
    };
    let mut current_residual = residual(scale, state)?;
    let mut evaluations = 2;

    let outcome = loop {
        if current_residual == 0.0 {
            break IterationOutcome::converged(scale, evaluations);
        }
        let slope = (current_residual - previous_residual) / (scale - previous_scale);
        if slope == 0.0 || !slope.is_finite() {
            warn!(scale, "Geometry search stalled on a flat residual.");
            break IterationOutcome::exhausted(scale, evaluations);
        }

        let next = (scale - current_residual / slope)
            .clamp(scale / MAX_SECANT_FACTOR, scale * MAX_SECANT_FACTOR);
        if ((next - scale) / scale).abs() < radius_tolerance {
            break IterationOutcome::converged(next, evaluations);
        }
        if evaluations >= config.search_max_iterations {
            break IterationOutcome::exhausted(next, evaluations);
        }

        previous_scale = scale;
        previous_residual = current_residual;
        scale = next;
        current_residual = residual(scale, state)?;
        evaluations += 1;
    };

    reporter.report(Progress::TaskFinish);
    assembly.scale_radii(outcome.value);

    if outcome.converged {
        info!(
            scale = outcome.value,
            outer_radius = assembly.zones.outer_radius(),
            evaluations = outcome.iterations,
            "Critical geometry search converged."
        );
    } else {
        warn!(
            scale = outcome.value,
            evaluations = outcome.iterations,
            "Critical geometry search stopped before converging; using the last scale."
        );
    }
    Ok(outcome)
}
