use crate::cli::{CheckArgs, ModeChoice, RunArgs};
use crate::error::{CliError, Result};
use ax1::core::io::library::{LibraryError, MaterialLibrary};
use ax1::core::models::assembly::{Assembly, AssemblyBuilder};
use ax1::engine::config::{self as core_config, SimulationConfig, SimulationConfigBuilder};
use clap::ValueEnum;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

const DEFAULT_RADIUS_TOLERANCE: f64 = 1.0e-3;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
enum PartialBoundary {
    Vacuum,
    Reflective,
}

impl From<PartialBoundary> for core_config::OuterBoundary {
    fn from(p: PartialBoundary) -> Self {
        match p {
            PartialBoundary::Vacuum => core_config::OuterBoundary::Vacuum,
            PartialBoundary::Reflective => core_config::OuterBoundary::Reflective,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
enum PartialSurface {
    Free,
    Extrapolated,
}

impl From<PartialSurface> for core_config::SurfaceCondition {
    fn from(p: PartialSurface) -> Self {
        match p {
            PartialSurface::Free => core_config::SurfaceCondition::Free,
            PartialSurface::Extrapolated => core_config::SurfaceCondition::Extrapolated,
        }
    }
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialControl {
    mode: Option<ModeChoice>,
    boundary: Option<PartialBoundary>,
    t_end: Option<f64>,
    dt_initial: Option<f64>,
    dt_min: Option<f64>,
    dt_max: Option<f64>,
    csc: Option<f64>,
    cvp: Option<f64>,
    w_limit: Option<f64>,
    eps_alpha: Option<f64>,
    eps_k: Option<f64>,
    hydro_per_neutronics: Option<usize>,
    initial_power: Option<f64>,
    max_exponent: Option<f64>,
    alpha_target: Option<f64>,
    radius_tolerance: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialTransport {
    max_iterations: Option<usize>,
    alpha_step_limit: Option<f64>,
    generation_time_scale: Option<f64>,
    fallback_generation_time: Option<f64>,
    cross_section_floor: Option<f64>,
    search_max_iterations: Option<usize>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialVelocityLimiter {
    active_after: f64,
    max_velocity: f64,
    max_acceleration: f64,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialHydro {
    viscous_cap_ratio: Option<f64>,
    eos_tolerance: Option<f64>,
    eos_max_iterations: Option<usize>,
    min_zone_width: Option<f64>,
    surface: Option<PartialSurface>,
    velocity_limiter: Option<PartialVelocityLimiter>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialStability {
    double_fraction: Option<f64>,
    doubling_countdown: Option<usize>,
    ns4_max: Option<usize>,
    ns4_increase_threshold: Option<f64>,
    ns4_decrease_threshold: Option<f64>,
    force_halve_threshold: Option<f64>,
    runaway_factor: Option<f64>,
    disassembly_radius: Option<f64>,
    disassembly_factor: Option<f64>,
    max_cycles: Option<usize>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialOutput {
    profile_interval: Option<usize>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialGeometry {
    radii: Option<Vec<f64>>,
    materials: Option<Vec<String>>,
    densities: Option<Vec<f64>>,
    temperatures: Option<Vec<f64>>,
}

/// An input deck as read from TOML, before defaults and command-line overrides are applied.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PartialDeck {
    materials_file: Option<PathBuf>,
    control: Option<PartialControl>,
    transport: Option<PartialTransport>,
    hydro: Option<PartialHydro>,
    stability: Option<PartialStability>,
    output: Option<PartialOutput>,
    geometry: Option<PartialGeometry>,
    materials: Option<MaterialLibrary>,
}

/// Command-line values that take precedence over the deck.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides<'a> {
    pub mode: Option<ModeChoice>,
    pub t_end: Option<f64>,
    pub dt_max: Option<f64>,
    pub profile_interval: Option<usize>,
    pub set_values: &'a [String],
}

impl<'a> From<&'a RunArgs> for CliOverrides<'a> {
    fn from(args: &'a RunArgs) -> Self {
        Self {
            mode: args.mode,
            t_end: args.t_end,
            dt_max: args.dt_max,
            profile_interval: args.profile_interval,
            set_values: &args.set_values,
        }
    }
}

impl<'a> From<&'a CheckArgs> for CliOverrides<'a> {
    fn from(args: &'a CheckArgs) -> Self {
        Self {
            mode: args.mode,
            set_values: &args.set_values,
            ..Default::default()
        }
    }
}

/// The simulation settings and initial assembly described by a deck.
#[derive(Debug, Clone)]
pub struct ResolvedDeck {
    pub config: SimulationConfig,
    pub assembly: Assembly,
}

impl PartialDeck {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading deck from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Applies defaults and `overrides`, then builds the configuration and the assembly.
    ///
    /// A relative `materials-file` is resolved against `deck_dir`; materials defined inline
    /// in the deck replace same-named entries of that file.
    pub fn merge_with_cli(
        mut self,
        overrides: &CliOverrides,
        deck_dir: &Path,
    ) -> Result<ResolvedDeck> {
        self.apply_set_values(overrides.set_values)?;

        let control = self.control.take().unwrap_or_default();
        let transport = self.transport.take().unwrap_or_default();
        let hydro = self.hydro.take().unwrap_or_default();
        let stability = self.stability.take().unwrap_or_default();
        let output = self.output.take().unwrap_or_default();

        let mode = Self::merge_mode(overrides.mode.or(control.mode), &control)?;

        let mut builder = SimulationConfigBuilder::new()
            .transport(Self::merge_transport(transport))
            .hydro(Self::merge_hydro(hydro))
            .stability(Self::merge_stability(stability))
            .mode(mode);

        if let Some(boundary) = control.boundary {
            builder = builder.boundary(boundary.into());
        }
        if let Some(t_end) = overrides.t_end.or(control.t_end) {
            builder = builder.t_end(t_end);
        }
        if let Some(dt) = control.dt_initial {
            builder = builder.dt_initial(dt);
        }
        if let Some(dt) = control.dt_min {
            builder = builder.dt_min(dt);
        }
        if let Some(dt) = overrides.dt_max.or(control.dt_max) {
            builder = builder.dt_max(dt);
        }
        if let Some(csc) = control.csc {
            builder = builder.stability_constant(csc);
        }
        if let Some(cvp) = control.cvp {
            builder = builder.viscosity_coefficient(cvp);
        }
        if let Some(limit) = control.w_limit {
            builder = builder.w_limit(limit);
        }
        if let Some(eps) = control.eps_alpha {
            builder = builder.alpha_tolerance(eps);
        }
        if let Some(eps) = control.eps_k {
            builder = builder.k_tolerance(eps);
        }
        if let Some(substeps) = control.hydro_per_neutronics {
            builder = builder.initial_substeps(substeps);
        }
        if let Some(power) = control.initial_power {
            builder = builder.initial_power(power);
        }
        if let Some(exponent) = control.max_exponent {
            builder = builder.max_exponent(exponent);
        }
        if let Some(interval) = overrides.profile_interval.or(output.profile_interval) {
            builder = builder.profile_interval(interval);
        }

        let config = builder
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?;
        let assembly = self.build_assembly(deck_dir)?;

        Ok(ResolvedDeck { config, assembly })
    }

    fn merge_mode(
        choice: Option<ModeChoice>,
        control: &PartialControl,
    ) -> Result<core_config::SolverMode> {
        match choice.unwrap_or(ModeChoice::Alpha) {
            ModeChoice::K => Ok(core_config::SolverMode::Multiplication),
            ModeChoice::Alpha => Ok(core_config::SolverMode::InversePeriod),
            ModeChoice::GeometrySearch => {
                let alpha_target = control.alpha_target.ok_or_else(|| {
                    CliError::Config(
                        "`control.alpha-target` is required in geometry-search mode.".to_string(),
                    )
                })?;
                Ok(core_config::SolverMode::GeometrySearch {
                    alpha_target,
                    radius_tolerance: control
                        .radius_tolerance
                        .unwrap_or(DEFAULT_RADIUS_TOLERANCE),
                })
            }
        }
    }

    fn merge_transport(partial: PartialTransport) -> core_config::TransportConfig {
        let mut config = core_config::TransportConfig::default();
        if let Some(v) = partial.max_iterations {
            config.max_iterations = v;
        }
        if let Some(v) = partial.alpha_step_limit {
            config.alpha_step_limit = v;
        }
        if let Some(v) = partial.generation_time_scale {
            config.generation_time_scale = v;
        }
        if let Some(v) = partial.fallback_generation_time {
            config.fallback_generation_time = v;
        }
        if let Some(v) = partial.cross_section_floor {
            config.cross_section_floor = v;
        }
        if let Some(v) = partial.search_max_iterations {
            config.search_max_iterations = v;
        }
        config
    }

    fn merge_hydro(partial: PartialHydro) -> core_config::HydroConfig {
        let mut config = core_config::HydroConfig::default();
        if let Some(v) = partial.viscous_cap_ratio {
            config.viscous_cap_ratio = v;
        }
        if let Some(v) = partial.eos_tolerance {
            config.eos_tolerance = v;
        }
        if let Some(v) = partial.eos_max_iterations {
            config.eos_max_iterations = v;
        }
        if let Some(v) = partial.min_zone_width {
            config.min_zone_width = v;
        }
        if let Some(surface) = partial.surface {
            config.surface = surface.into();
        }
        config.velocity_limiter = partial
            .velocity_limiter
            .map(|p| core_config::VelocityLimiter {
                active_after: p.active_after,
                max_velocity: p.max_velocity,
                max_acceleration: p.max_acceleration,
            });
        config
    }

    fn merge_stability(partial: PartialStability) -> core_config::StabilityConfig {
        let mut config = core_config::StabilityConfig::default();
        if let Some(v) = partial.double_fraction {
            config.double_fraction = v;
        }
        if let Some(v) = partial.doubling_countdown {
            config.doubling_countdown = v;
        }
        if let Some(v) = partial.ns4_max {
            config.ns4_max = v;
        }
        if let Some(v) = partial.ns4_increase_threshold {
            config.ns4_increase_threshold = v;
        }
        if let Some(v) = partial.ns4_decrease_threshold {
            config.ns4_decrease_threshold = v;
        }
        if let Some(v) = partial.force_halve_threshold {
            config.force_halve_threshold = v;
        }
        if let Some(v) = partial.runaway_factor {
            config.runaway_factor = v;
        }
        if partial.disassembly_radius.is_some() {
            config.disassembly_radius = partial.disassembly_radius;
        }
        if let Some(v) = partial.disassembly_factor {
            config.disassembly_factor = v;
        }
        if let Some(v) = partial.max_cycles {
            config.max_cycles = v;
        }
        config
    }

    fn load_library(&mut self, deck_dir: &Path) -> Result<MaterialLibrary> {
        let mut library = match self.materials_file.take() {
            Some(file) => {
                let path = if file.is_absolute() {
                    file
                } else {
                    deck_dir.join(file)
                };
                debug!("Loading material library from file: {:?}", path);
                MaterialLibrary::load(&path).map_err(|e| library_error(e, &path))?
            }
            None => MaterialLibrary::default(),
        };
        if let Some(inline) = self.materials.take() {
            library.extend(inline);
        }
        Ok(library)
    }

    fn build_assembly(&mut self, deck_dir: &Path) -> Result<Assembly> {
        let library = self.load_library(deck_dir)?;
        let geometry = self.geometry.take().ok_or_else(|| {
            CliError::Config("`geometry` section is required.".to_string())
        })?;
        let zone_names = geometry.materials.ok_or_else(|| {
            CliError::Config("`geometry.materials` is required.".to_string())
        })?;

        let mut names: Vec<&str> = Vec::new();
        let mut indices = Vec::with_capacity(zone_names.len());
        for name in &zone_names {
            let index = match names.iter().position(|n| *n == name.as_str()) {
                Some(index) => index,
                None => {
                    names.push(name);
                    names.len() - 1
                }
            };
            indices.push(index);
        }

        let materials = names
            .iter()
            .map(|name| {
                library
                    .resolve(name)
                    .map_err(|e| CliError::Config(e.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        debug!(
            zones = indices.len(),
            materials = materials.len(),
            "Resolved zone materials."
        );

        let mut builder = AssemblyBuilder::new()
            .zone_materials(indices)
            .materials(materials);
        if let Some(radii) = geometry.radii {
            builder = builder.radii(radii);
        }
        if let Some(densities) = geometry.densities {
            builder = builder.densities(densities);
        }
        if let Some(temperatures) = geometry.temperatures {
            builder = builder.temperatures(temperatures);
        }
        builder.build().map_err(|e| CliError::Config(e.to_string()))
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value_str)) = kv_pair.split_once('=') else {
                return Err(CliError::Argument(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };
            let (key, value_str) = (key.trim(), value_str.trim());

            match key {
                "control.mode" => {
                    let mode = <ModeChoice as ValueEnum>::from_str(value_str, true).map_err(|_| {
                        CliError::Config(format!("Invalid mode for {}: {}", key, value_str))
                    })?;
                    self.control_mut().mode = Some(mode);
                }
                "control.t-end" => self.control_mut().t_end = Some(parse_value(key, value_str)?),
                "control.dt-initial" => {
                    self.control_mut().dt_initial = Some(parse_value(key, value_str)?)
                }
                "control.dt-min" => self.control_mut().dt_min = Some(parse_value(key, value_str)?),
                "control.dt-max" => self.control_mut().dt_max = Some(parse_value(key, value_str)?),
                "control.csc" => self.control_mut().csc = Some(parse_value(key, value_str)?),
                "control.cvp" => self.control_mut().cvp = Some(parse_value(key, value_str)?),
                "control.w-limit" => {
                    self.control_mut().w_limit = Some(parse_value(key, value_str)?)
                }
                "control.eps-alpha" => {
                    self.control_mut().eps_alpha = Some(parse_value(key, value_str)?)
                }
                "control.eps-k" => self.control_mut().eps_k = Some(parse_value(key, value_str)?),
                "control.hydro-per-neutronics" => {
                    self.control_mut().hydro_per_neutronics = Some(parse_value(key, value_str)?)
                }
                "control.initial-power" => {
                    self.control_mut().initial_power = Some(parse_value(key, value_str)?)
                }
                "control.alpha-target" => {
                    self.control_mut().alpha_target = Some(parse_value(key, value_str)?)
                }
                "control.radius-tolerance" => {
                    self.control_mut().radius_tolerance = Some(parse_value(key, value_str)?)
                }
                "transport.max-iterations" => {
                    self.transport
                        .get_or_insert_with(Default::default)
                        .max_iterations = Some(parse_value(key, value_str)?)
                }
                "transport.generation-time-scale" => {
                    self.transport
                        .get_or_insert_with(Default::default)
                        .generation_time_scale = Some(parse_value(key, value_str)?)
                }
                "hydro.min-zone-width" => {
                    self.hydro
                        .get_or_insert_with(Default::default)
                        .min_zone_width = Some(parse_value(key, value_str)?)
                }
                "stability.max-cycles" => {
                    self.stability
                        .get_or_insert_with(Default::default)
                        .max_cycles = Some(parse_value(key, value_str)?)
                }
                "stability.disassembly-radius" => {
                    self.stability
                        .get_or_insert_with(Default::default)
                        .disassembly_radius = Some(parse_value(key, value_str)?)
                }
                "output.profile-interval" => {
                    self.output
                        .get_or_insert_with(Default::default)
                        .profile_interval = Some(parse_value(key, value_str)?)
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }

    fn control_mut(&mut self) -> &mut PartialControl {
        self.control.get_or_insert_with(Default::default)
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid value for {}: {}", key, value)))
}

fn library_error(error: LibraryError, path: &Path) -> CliError {
    match error {
        LibraryError::UnknownMaterial(_) => CliError::Config(error.to_string()),
        LibraryError::Io { .. } | LibraryError::Toml { .. } => CliError::FileParsing {
            path: path.to_path_buf(),
            source: error.into(),
        },
    }
}
