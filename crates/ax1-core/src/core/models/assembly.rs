use super::material::Material;
use super::zone::{MAX_ZONES, ZoneState, clamp_density};
use crate::core::physics::geometry;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ModelError {
    #[error("Missing required assembly input: {0}")]
    MissingParameter(&'static str),

    #[error("Geometry must contain at least one zone")]
    EmptyGeometry,

    #[error("Geometry has {count} zones, which exceeds the maximum of {max}")]
    TooManyZones { count: usize, max: usize },

    #[error("Innermost radius must be 0.0, found {radius}")]
    CentreNotAtOrigin { radius: f64 },

    #[error("Radii must be strictly increasing and finite (boundary {boundary})")]
    NonMonotonicRadii { boundary: usize },

    #[error("Expected {expected} values for '{field}', found {found}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("At least one material must be defined")]
    NoMaterials,

    #[error("Zone {zone} refers to undefined material index {index}")]
    UnknownMaterial { zone: usize, index: usize },

    #[error("Material '{material}' has {found} energy groups, expected {expected}")]
    GroupMismatch {
        material: String,
        expected: usize,
        found: usize,
    },

    #[error("Material '{material}' is invalid: {reason}")]
    InvalidMaterial { material: String, reason: String },

    #[error("Zone {zone} has invalid {field}: {value}")]
    InvalidZoneValue {
        field: &'static str,
        zone: usize,
        value: f64,
    },
}

/// A fully initialised spherical assembly: the zone mesh and its material table.
#[derive(Debug, Clone, PartialEq)]
pub struct Assembly {
    pub zones: ZoneState,
    pub materials: Vec<Material>,
}

impl Assembly {
    #[inline]
    pub fn num_groups(&self) -> usize {
        self.materials.first().map_or(0, Material::num_groups)
    }

    #[inline]
    pub fn material_of(&self, zone: usize) -> &Material {
        &self.materials[self.zones.material[zone]]
    }

    /// Scales every radius by `factor` at fixed density and re-establishes the zone masses.
    pub fn scale_radii(&mut self, factor: f64) {
        let zones = &mut self.zones;
        for r in zones.radius.iter_mut() {
            *r *= factor;
        }
        zones.lagrangian_radius = zones.radius.clone();
        for i in 0..zones.num_zones() {
            let volume = zones.volume(i);
            zones.mass[i] = zones.density[i] * volume;
            zones.reference_density[i] = zones.density[i];
        }
    }
}

#[derive(Default)]
pub struct AssemblyBuilder {
    radii: Option<Vec<f64>>,
    zone_materials: Option<Vec<usize>>,
    densities: Option<Vec<f64>>,
    temperatures: Option<Vec<f64>>,
    materials: Vec<Material>,
}

impl AssemblyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Boundary radii from the centre (0.0) to the outer surface, in cm.
    pub fn radii(mut self, radii: Vec<f64>) -> Self {
        self.radii = Some(radii);
        self
    }
    pub fn zone_materials(mut self, indices: Vec<usize>) -> Self {
        self.zone_materials = Some(indices);
        self
    }
    pub fn densities(mut self, densities: Vec<f64>) -> Self {
        self.densities = Some(densities);
        self
    }
    pub fn temperatures(mut self, temperatures: Vec<f64>) -> Self {
        self.temperatures = Some(temperatures);
        self
    }
    pub fn material(mut self, material: Material) -> Self {
        self.materials.push(material);
        self
    }
    pub fn materials(mut self, materials: Vec<Material>) -> Self {
        self.materials.extend(materials);
        self
    }

    pub fn build(self) -> Result<Assembly, ModelError> {
        let radii = self.radii.ok_or(ModelError::MissingParameter("radii"))?;
        let zone_materials = self
            .zone_materials
            .ok_or(ModelError::MissingParameter("zone_materials"))?;
        let densities = self
            .densities
            .ok_or(ModelError::MissingParameter("densities"))?;
        let temperatures = self
            .temperatures
            .ok_or(ModelError::MissingParameter("temperatures"))?;

        validate_radii(&radii)?;
        let num_zones = radii.len() - 1;
        check_length("zone_materials", num_zones, zone_materials.len())?;
        check_length("densities", num_zones, densities.len())?;
        check_length("temperatures", num_zones, temperatures.len())?;
        validate_materials(&self.materials)?;

        for (zone, &index) in zone_materials.iter().enumerate() {
            if index >= self.materials.len() {
                return Err(ModelError::UnknownMaterial { zone, index });
            }
        }
        for (zone, &rho) in densities.iter().enumerate() {
            if !rho.is_finite() || rho <= 0.0 {
                return Err(ModelError::InvalidZoneValue {
                    field: "density",
                    zone,
                    value: rho,
                });
            }
        }
        for (zone, &theta) in temperatures.iter().enumerate() {
            if !theta.is_finite() || theta < 0.0 {
                return Err(ModelError::InvalidZoneValue {
                    field: "temperature",
                    zone,
                    value: theta,
                });
            }
        }

        let zones = initialise_zones(radii, zone_materials, densities, temperatures, &self.materials);
        Ok(Assembly {
            zones,
            materials: self.materials,
        })
    }
}

fn check_length(field: &'static str, expected: usize, found: usize) -> Result<(), ModelError> {
    if expected != found {
        return Err(ModelError::LengthMismatch {
            field,
            expected,
            found,
        });
    }
    Ok(())
}

#[inline]
fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn validate_radii(radii: &[f64]) -> Result<(), ModelError> {
    if radii.len() < 2 {
        return Err(ModelError::EmptyGeometry);
    }
    let count = radii.len() - 1;
    if count > MAX_ZONES {
        return Err(ModelError::TooManyZones {
            count,
            max: MAX_ZONES,
        });
    }
    if radii[0] != 0.0 {
        return Err(ModelError::CentreNotAtOrigin { radius: radii[0] });
    }
    for (b, pair) in radii.windows(2).enumerate() {
        if !pair[1].is_finite() || pair[1] <= pair[0] {
            return Err(ModelError::NonMonotonicRadii { boundary: b + 1 });
        }
    }
    Ok(())
}

fn validate_materials(materials: &[Material]) -> Result<(), ModelError> {
    let first = materials.first().ok_or(ModelError::NoMaterials)?;
    let expected = first.num_groups();

    for material in materials {
        let invalid = |reason: &str| ModelError::InvalidMaterial {
            material: material.name.clone(),
            reason: reason.to_string(),
        };

        let found = material.num_groups();
        if found == 0 || found != expected {
            return Err(ModelError::GroupMismatch {
                material: material.name.clone(),
                expected,
                found,
            });
        }
        if !is_positive(material.rolab) {
            return Err(invalid("rolab must be positive"));
        }
        let xs = &material.cross_sections;
        if xs.scatter.len() != found || xs.scatter.iter().any(|row| row.len() != found) {
            return Err(invalid("scattering matrix must be square in the group count"));
        }
        for group in &xs.groups {
            if !is_positive(group.velocity) {
                return Err(invalid("group velocity must be positive"));
            }
            if !is_positive(group.sigma_tr) {
                return Err(invalid("transport cross section must be positive"));
            }
            if group.nu_sigma_f < 0.0 || group.sigma_f < 0.0 || group.chi < 0.0 {
                return Err(invalid("fission data must be non-negative"));
            }
        }
        let cv = material.heat_capacity;
        if cv.a < 0.0 || cv.b < 0.0 || (cv.a == 0.0 && cv.b == 0.0) {
            return Err(invalid("heat capacity coefficients must be non-negative and not both zero"));
        }
    }
    Ok(())
}

fn initialise_zones(
    radius: Vec<f64>,
    material: Vec<usize>,
    densities: Vec<f64>,
    temperature: Vec<f64>,
    materials: &[Material],
) -> ZoneState {
    let num_zones = densities.len();
    let density: Vec<f64> = densities.into_iter().map(clamp_density).collect();
    let volumes = geometry::shell_volumes(&radius);

    let mass: Vec<f64> = density.iter().zip(&volumes).map(|(r, v)| r * v).collect();
    let atom_density = (0..num_zones)
        .map(|i| materials[material[i]].atom_density(density[i]))
        .collect();
    let internal_energy = (0..num_zones)
        .map(|i| materials[material[i]].heat_capacity.energy(temperature[i]))
        .collect();
    let hydrostatic_pressure: Vec<f64> = (0..num_zones)
        .map(|i| {
            materials[material[i]]
                .eos
                .hydrostatic_pressure(density[i], temperature[i])
        })
        .collect();
    let ghost_pressure = -hydrostatic_pressure.last().copied().unwrap_or(0.0);

    ZoneState {
        lagrangian_radius: radius.clone(),
        velocity: vec![0.0; radius.len()],
        radius,
        reference_density: density.clone(),
        density,
        atom_density,
        pressure: hydrostatic_pressure.clone(),
        hydrostatic_pressure,
        viscous_pressure: vec![0.0; num_zones],
        temperature,
        internal_energy,
        specific_volume_change: vec![0.0; num_zones],
        mass,
        material,
        ghost_pressure,
    }
}
