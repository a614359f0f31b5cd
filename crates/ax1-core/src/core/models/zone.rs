use crate::core::physics::geometry;

/// Largest number of radial zones an assembly may carry.
pub const MAX_ZONES: usize = 256;

pub const DENSITY_FLOOR: f64 = 1e-6;
pub const DENSITY_CEILING: f64 = 1e6;

#[inline]
pub fn clamp_density(density: f64) -> f64 {
    density.clamp(DENSITY_FLOOR, DENSITY_CEILING)
}

/// The radial mesh and every zone- and boundary-centred field the engines mutate.
///
/// Boundary-centred arrays (`radius`, `lagrangian_radius`, `velocity`) have length N+1,
/// with index 0 at the centre of the sphere. Zone-centred arrays have length N; zone `i`
/// lies between boundaries `i` and `i+1`.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneState {
    pub radius: Vec<f64>,
    /// Radii at which the zone masses were established.
    pub lagrangian_radius: Vec<f64>,
    pub velocity: Vec<f64>,

    pub density: Vec<f64>,
    /// Zone mass divided by its volume in the Lagrangian mesh.
    pub reference_density: Vec<f64>,
    pub atom_density: Vec<f64>,
    pub pressure: Vec<f64>,
    pub hydrostatic_pressure: Vec<f64>,
    pub viscous_pressure: Vec<f64>,
    pub temperature: Vec<f64>,
    pub internal_energy: Vec<f64>,
    /// Specific-volume change over the last hydrodynamic substep.
    pub specific_volume_change: Vec<f64>,
    pub mass: Vec<f64>,
    pub material: Vec<usize>,

    /// Pressure applied just outside the outer boundary.
    pub ghost_pressure: f64,
}

impl ZoneState {
    #[inline]
    pub fn num_zones(&self) -> usize {
        self.density.len()
    }

    #[inline]
    pub fn num_boundaries(&self) -> usize {
        self.radius.len()
    }

    #[inline]
    pub fn outer_radius(&self) -> f64 {
        self.radius.last().copied().unwrap_or(0.0)
    }

    #[inline]
    pub fn zone_width(&self, zone: usize) -> f64 {
        self.radius[zone + 1] - self.radius[zone]
    }

    #[inline]
    pub fn volume(&self, zone: usize) -> f64 {
        geometry::shell_volume(self.radius[zone], self.radius[zone + 1])
    }

    /// Mass attached to each boundary: half of each adjacent zone.
    pub fn boundary_masses(&self) -> Vec<f64> {
        let mut masses = vec![0.0; self.num_boundaries()];
        for (i, &m) in self.mass.iter().enumerate() {
            masses[i] += 0.5 * m;
            masses[i + 1] += 0.5 * m;
        }
        masses
    }

    /// Total internal energy, `Σ m·e` (10¹² erg).
    pub fn total_internal_energy(&self) -> f64 {
        self.mass
            .iter()
            .zip(&self.internal_energy)
            .map(|(m, e)| m * e)
            .sum()
    }

    /// Total kinetic energy of the boundary masses (10¹² erg).
    pub fn total_kinetic_energy(&self) -> f64 {
        self.boundary_masses()
            .iter()
            .zip(&self.velocity)
            .map(|(m, u)| 0.5 * m * u * u)
            .sum()
    }

    pub fn total_mass(&self) -> f64 {
        self.mass.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-12;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    fn two_zone_state() -> ZoneState {
        ZoneState {
            radius: vec![0.0, 1.0, 2.0],
            lagrangian_radius: vec![0.0, 1.0, 2.0],
            velocity: vec![0.0, 1.0, 2.0],
            density: vec![1.0, 1.0],
            reference_density: vec![1.0, 1.0],
            atom_density: vec![1.0, 1.0],
            pressure: vec![0.0, 0.0],
            hydrostatic_pressure: vec![0.0, 0.0],
            viscous_pressure: vec![0.0, 0.0],
            temperature: vec![0.0, 0.0],
            internal_energy: vec![3.0, 1.0],
            specific_volume_change: vec![0.0, 0.0],
            mass: vec![2.0, 4.0],
            material: vec![0, 0],
            ghost_pressure: 0.0,
        }
    }

    #[test]
    fn clamp_density_enforces_physical_band() {
        assert_eq!(clamp_density(0.0), DENSITY_FLOOR);
        assert_eq!(clamp_density(1e9), DENSITY_CEILING);
        assert_eq!(clamp_density(18.7), 18.7);
    }

    #[test]
    fn boundary_masses_split_zone_masses_evenly() {
        let zones = two_zone_state();
        assert_eq!(zones.boundary_masses(), vec![1.0, 3.0, 2.0]);
    }

    #[test]
    fn energy_totals_are_mass_weighted() {
        let zones = two_zone_state();
        assert!(f64_approx_equal(zones.total_internal_energy(), 10.0));
        assert!(f64_approx_equal(zones.total_kinetic_energy(), 0.5 * 3.0 + 0.5 * 2.0 * 4.0));
    }

    #[test]
    fn geometric_accessors_use_current_radii() {
        let zones = two_zone_state();
        assert_eq!(zones.num_zones(), 2);
        assert_eq!(zones.num_boundaries(), 3);
        assert_eq!(zones.outer_radius(), 2.0);
        assert_eq!(zones.zone_width(1), 1.0);
        assert!(f64_approx_equal(
            zones.volume(0) + zones.volume(1),
            geometry::shell_volume(0.0, 2.0)
        ));
    }
}
