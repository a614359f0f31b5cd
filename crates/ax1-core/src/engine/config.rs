use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Which eigenvalue the transport solver computes each cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SolverMode {
    /// Multiplication factor k.
    Multiplication,
    /// Inverse period α (μs⁻¹).
    InversePeriod,
    /// Inverse period, after first scaling the assembly radii so that α matches the target.
    GeometrySearch {
        alpha_target: f64,
        radius_tolerance: f64,
    },
}

impl SolverMode {
    pub fn name(&self) -> &'static str {
        match self {
            SolverMode::Multiplication => "k",
            SolverMode::InversePeriod => "alpha",
            SolverMode::GeometrySearch { .. } => "geometry-search",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OuterBoundary {
    #[default]
    Vacuum,
    Reflective,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransportConfig {
    pub mode: SolverMode,
    pub boundary: OuterBoundary,
    pub k_tolerance: f64,
    pub alpha_tolerance: f64,
    pub max_iterations: usize,
    /// Largest change of α allowed within a single solve after the first.
    pub alpha_step_limit: f64,
    /// Empirical calibration factor applied to the flux-weighted generation time.
    pub generation_time_scale: f64,
    /// Generation time (μs) used when the flux-weighted estimate is degenerate.
    pub fallback_generation_time: f64,
    pub cross_section_floor: f64,
    pub search_max_iterations: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            mode: SolverMode::InversePeriod,
            boundary: OuterBoundary::Vacuum,
            k_tolerance: 5.0e-6,
            alpha_tolerance: 5.0e-5,
            max_iterations: 200,
            alpha_step_limit: 0.02,
            generation_time_scale: 1.0,
            fallback_generation_time: 0.1,
            cross_section_floor: 1.0e-10,
            search_max_iterations: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SurfaceCondition {
    /// Velocity from a mirrored negative ghost pressure.
    #[default]
    Free,
    /// Velocity extrapolated linearly from the two inner boundaries.
    Extrapolated,
}

/// Clamps on boundary velocity and acceleration, active from `active_after` (μs) onwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityLimiter {
    pub active_after: f64,
    pub max_velocity: f64,
    pub max_acceleration: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HydroConfig {
    pub viscosity_coefficient: f64,
    pub viscous_cap_ratio: f64,
    pub eos_tolerance: f64,
    pub eos_max_iterations: usize,
    pub min_zone_width: f64,
    pub surface: SurfaceCondition,
    pub velocity_limiter: Option<VelocityLimiter>,
}

impl Default for HydroConfig {
    fn default() -> Self {
        Self {
            viscosity_coefficient: 2.0,
            viscous_cap_ratio: 10.0,
            eos_tolerance: 1.0e-6,
            eos_max_iterations: 20,
            min_zone_width: 1.0e-6,
            surface: SurfaceCondition::Free,
            velocity_limiter: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StabilityConfig {
    pub stability_constant: f64,
    pub w_limit: f64,
    pub dt_min: f64,
    pub dt_max: f64,
    pub t_end: f64,
    pub double_fraction: f64,
    pub doubling_countdown: usize,
    pub doubling_max_eigen_change: f64,
    pub doubling_max_power_ratio: f64,
    pub ns4_max: usize,
    pub ns4_increase_threshold: f64,
    pub ns4_decrease_threshold: f64,
    pub force_halve_threshold: f64,
    pub eigenvalue_floor: f64,
    pub energy_reset_fraction: f64,
    pub energy_bump_fraction: f64,
    pub runaway_factor: f64,
    /// Outer radius (cm) beyond which the assembly counts as disassembled. Defaults to
    /// `disassembly_factor` times the initial outer radius.
    pub disassembly_radius: Option<f64>,
    pub disassembly_factor: f64,
    pub max_cycles: usize,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            stability_constant: 3.0,
            w_limit: 0.3,
            dt_min: 1.0e-4,
            dt_max: 16.0,
            t_end: 200.0,
            double_fraction: 0.25,
            doubling_countdown: 3,
            doubling_max_eigen_change: 0.02,
            doubling_max_power_ratio: 2.0,
            ns4_max: 16,
            ns4_increase_threshold: 0.01,
            ns4_decrease_threshold: 0.05,
            force_halve_threshold: 0.2,
            eigenvalue_floor: 1.0e-3,
            energy_reset_fraction: 0.1,
            energy_bump_fraction: 1.0e-3,
            runaway_factor: 10.0,
            disassembly_radius: None,
            disassembly_factor: 3.0,
            max_cycles: 100_000,
        }
    }
}

impl StabilityConfig {
    pub fn resolve_disassembly_radius(&self, initial_outer_radius: f64) -> f64 {
        self.disassembly_radius
            .unwrap_or(self.disassembly_factor * initial_outer_radius)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub transport: TransportConfig,
    pub hydro: HydroConfig,
    pub stability: StabilityConfig,
    pub initial_dt: f64,
    pub initial_substeps: usize,
    /// Initial total power (10¹² erg/μs).
    pub initial_power: f64,
    /// Largest α·δt exponent used for energy deposition in one substep.
    pub max_exponent: f64,
    /// Cycles between spatial profile snapshots; zero writes only the first and last.
    pub profile_interval: usize,
}

#[derive(Default)]
pub struct SimulationConfigBuilder {
    transport: Option<TransportConfig>,
    hydro: Option<HydroConfig>,
    stability: Option<StabilityConfig>,
    mode: Option<SolverMode>,
    boundary: Option<OuterBoundary>,
    k_tolerance: Option<f64>,
    alpha_tolerance: Option<f64>,
    viscosity_coefficient: Option<f64>,
    stability_constant: Option<f64>,
    w_limit: Option<f64>,
    dt_initial: Option<f64>,
    dt_min: Option<f64>,
    dt_max: Option<f64>,
    t_end: Option<f64>,
    initial_substeps: Option<usize>,
    initial_power: Option<f64>,
    max_exponent: Option<f64>,
    profile_interval: Option<usize>,
}

impl SimulationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transport(mut self, config: TransportConfig) -> Self {
        self.transport = Some(config);
        self
    }
    pub fn hydro(mut self, config: HydroConfig) -> Self {
        self.hydro = Some(config);
        self
    }
    pub fn stability(mut self, config: StabilityConfig) -> Self {
        self.stability = Some(config);
        self
    }
    pub fn mode(mut self, mode: SolverMode) -> Self {
        self.mode = Some(mode);
        self
    }
    pub fn boundary(mut self, boundary: OuterBoundary) -> Self {
        self.boundary = Some(boundary);
        self
    }
    pub fn k_tolerance(mut self, tolerance: f64) -> Self {
        self.k_tolerance = Some(tolerance);
        self
    }
    pub fn alpha_tolerance(mut self, tolerance: f64) -> Self {
        self.alpha_tolerance = Some(tolerance);
        self
    }
    pub fn viscosity_coefficient(mut self, cvp: f64) -> Self {
        self.viscosity_coefficient = Some(cvp);
        self
    }
    pub fn stability_constant(mut self, csc: f64) -> Self {
        self.stability_constant = Some(csc);
        self
    }
    pub fn w_limit(mut self, limit: f64) -> Self {
        self.w_limit = Some(limit);
        self
    }
    pub fn dt_initial(mut self, dt: f64) -> Self {
        self.dt_initial = Some(dt);
        self
    }
    pub fn dt_min(mut self, dt: f64) -> Self {
        self.dt_min = Some(dt);
        self
    }
    pub fn dt_max(mut self, dt: f64) -> Self {
        self.dt_max = Some(dt);
        self
    }
    pub fn t_end(mut self, t_end: f64) -> Self {
        self.t_end = Some(t_end);
        self
    }
    pub fn initial_substeps(mut self, substeps: usize) -> Self {
        self.initial_substeps = Some(substeps);
        self
    }
    pub fn initial_power(mut self, power: f64) -> Self {
        self.initial_power = Some(power);
        self
    }
    pub fn max_exponent(mut self, exponent: f64) -> Self {
        self.max_exponent = Some(exponent);
        self
    }
    pub fn profile_interval(mut self, interval: usize) -> Self {
        self.profile_interval = Some(interval);
        self
    }

    pub fn build(self) -> Result<SimulationConfig, ConfigError> {
        let mut transport = self.transport.unwrap_or_default();
        let mut hydro = self.hydro.unwrap_or_default();
        let mut stability = self.stability.unwrap_or_default();

        if let Some(mode) = self.mode {
            transport.mode = mode;
        }
        if let Some(boundary) = self.boundary {
            transport.boundary = boundary;
        }
        if let Some(tol) = self.k_tolerance {
            transport.k_tolerance = tol;
        }
        if let Some(tol) = self.alpha_tolerance {
            transport.alpha_tolerance = tol;
        }
        if let Some(cvp) = self.viscosity_coefficient {
            hydro.viscosity_coefficient = cvp;
        }
        if let Some(csc) = self.stability_constant {
            stability.stability_constant = csc;
        }
        if let Some(limit) = self.w_limit {
            stability.w_limit = limit;
        }
        if let Some(dt) = self.dt_min {
            stability.dt_min = dt;
        }
        if let Some(dt) = self.dt_max {
            stability.dt_max = dt;
        }
        stability.t_end = self.t_end.ok_or(ConfigError::MissingParameter("t_end"))?;

        let config = SimulationConfig {
            transport,
            hydro,
            stability,
            initial_dt: self
                .dt_initial
                .ok_or(ConfigError::MissingParameter("dt_initial"))?,
            initial_substeps: self.initial_substeps.unwrap_or(1),
            initial_power: self.initial_power.unwrap_or(1.0e-6),
            max_exponent: self.max_exponent.unwrap_or(50.0),
            profile_interval: self.profile_interval.unwrap_or(0),
        };
        validate(&config)?;
        Ok(config)
    }
}

fn require_positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter {
            name,
            reason: format!("must be a positive finite number, got {value}"),
        })
    }
}

/// Accepts values in the half-open unit interval `(0, 1]`.
fn require_fraction(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter {
            name,
            reason: format!("must lie within (0, 1], got {value}"),
        })
    }
}

fn validate_hydro(h: &HydroConfig) -> Result<(), ConfigError> {
    require_positive("eos_tolerance", h.eos_tolerance)?;
    require_positive("viscous_cap_ratio", h.viscous_cap_ratio)?;
    require_positive("min_zone_width", h.min_zone_width)?;
    if h.viscosity_coefficient.is_nan() || h.viscosity_coefficient < 0.0 {
        return Err(ConfigError::InvalidParameter {
            name: "viscosity_coefficient",
            reason: format!("must be non-negative, got {}", h.viscosity_coefficient),
        });
    }
    if h.eos_max_iterations == 0 {
        return Err(ConfigError::InvalidParameter {
            name: "eos_max_iterations",
            reason: "at least one equation-of-state iteration is required".to_string(),
        });
    }
    if let Some(limiter) = &h.velocity_limiter {
        require_positive("max_velocity", limiter.max_velocity)?;
        require_positive("max_acceleration", limiter.max_acceleration)?;
        if !limiter.active_after.is_finite() || limiter.active_after < 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: "active_after",
                reason: format!(
                    "must be a non-negative finite time, got {}",
                    limiter.active_after
                ),
            });
        }
    }
    Ok(())
}

fn validate_stability(s: &StabilityConfig) -> Result<(), ConfigError> {
    require_positive("t_end", s.t_end)?;
    require_positive("dt_min", s.dt_min)?;
    require_positive("dt_max", s.dt_max)?;
    require_positive("w_limit", s.w_limit)?;
    require_positive("eigenvalue_floor", s.eigenvalue_floor)?;
    require_positive("disassembly_factor", s.disassembly_factor)?;
    if s.stability_constant.is_nan() || s.stability_constant < 0.0 {
        return Err(ConfigError::InvalidParameter {
            name: "stability_constant",
            reason: format!("must be non-negative, got {}", s.stability_constant),
        });
    }
    // The doubling threshold sits strictly below the W limit.
    if !(s.double_fraction > 0.0 && s.double_fraction < 1.0) {
        return Err(ConfigError::InvalidParameter {
            name: "double_fraction",
            reason: format!("must lie within (0, 1), got {}", s.double_fraction),
        });
    }
    require_fraction("energy_reset_fraction", s.energy_reset_fraction)?;
    require_fraction("energy_bump_fraction", s.energy_bump_fraction)?;
    if !s.runaway_factor.is_finite() || s.runaway_factor < 1.0 {
        return Err(ConfigError::InvalidParameter {
            name: "runaway_factor",
            reason: format!("must be a finite factor of at least 1, got {}", s.runaway_factor),
        });
    }
    if let Some(radius) = s.disassembly_radius {
        require_positive("disassembly_radius", radius)?;
    }
    if s.ns4_max == 0 {
        return Err(ConfigError::InvalidParameter {
            name: "ns4_max",
            reason: "at least one hydro substep per cycle is required".to_string(),
        });
    }
    Ok(())
}

fn validate(config: &SimulationConfig) -> Result<(), ConfigError> {
    let t = &config.transport;
    let h = &config.hydro;
    let s = &config.stability;

    validate_stability(s)?;
    validate_hydro(h)?;
    require_positive("dt_initial", config.initial_dt)?;
    if config.initial_dt < s.dt_min || config.initial_dt > s.dt_max {
        return Err(ConfigError::InvalidParameter {
            name: "dt_initial",
            reason: format!(
                "must lie within [dt_min, dt_max] = [{}, {}], got {}",
                s.dt_min, s.dt_max, config.initial_dt
            ),
        });
    }
    require_positive("k_tolerance", t.k_tolerance)?;
    require_positive("alpha_tolerance", t.alpha_tolerance)?;
    require_positive("alpha_step_limit", t.alpha_step_limit)?;
    require_positive("generation_time_scale", t.generation_time_scale)?;
    require_positive("fallback_generation_time", t.fallback_generation_time)?;
    require_positive("initial_power", config.initial_power)?;
    require_positive("max_exponent", config.max_exponent)?;
    if t.max_iterations == 0 {
        return Err(ConfigError::InvalidParameter {
            name: "max_iterations",
            reason: "at least one transport iteration is required".to_string(),
        });
    }
    if config.initial_substeps == 0 || config.initial_substeps > s.ns4_max {
        return Err(ConfigError::InvalidParameter {
            name: "initial_substeps",
            reason: format!(
                "must lie within [1, {}], got {}",
                s.ns4_max, config.initial_substeps
            ),
        });
    }
    if let SolverMode::GeometrySearch {
        radius_tolerance, ..
    } = t.mode
    {
        require_positive("radius_tolerance", radius_tolerance)?;
    }
    Ok(())
}
