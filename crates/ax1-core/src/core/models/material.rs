use crate::core::physics::eos::{HeatCapacity, LinearEos};

/// Microscopic constants of one energy group (barns, cm/μs).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupConstants {
    pub nu_sigma_f: f64,
    pub sigma_f: f64,
    pub sigma_tr: f64,
    pub chi: f64,
    pub velocity: f64,
}

/// Multigroup microscopic cross sections of a material.
///
/// `scatter[from][to]` holds the group-to-group transfer cross section. The absorption
/// cross section is whatever part of the transport cross section is not scattered.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossSections {
    pub groups: Vec<GroupConstants>,
    pub scatter: Vec<Vec<f64>>,
}

impl CrossSections {
    pub fn new(groups: Vec<GroupConstants>, scatter: Vec<Vec<f64>>) -> Self {
        Self { groups, scatter }
    }

    #[inline]
    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    #[inline]
    pub fn group(&self, g: usize) -> &GroupConstants {
        &self.groups[g]
    }

    #[inline]
    pub fn transfer(&self, from: usize, to: usize) -> f64 {
        self.scatter[from][to]
    }

    /// Total scattering out of group `g`, summed over destination groups.
    pub fn scatter_out(&self, g: usize) -> f64 {
        self.scatter[g].iter().sum()
    }

    pub fn absorption(&self, g: usize) -> f64 {
        self.groups[g].sigma_tr - self.scatter_out(g)
    }

    pub fn is_fissile(&self) -> bool {
        self.groups.iter().any(|c| c.nu_sigma_f > 0.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub eos: LinearEos,
    pub heat_capacity: HeatCapacity,
    pub cross_sections: CrossSections,
    /// Mass density per unit atom density; `n = ρ / rolab`.
    pub rolab: f64,
}

impl Material {
    #[inline]
    pub fn atom_density(&self, density: f64) -> f64 {
        density / self.rolab
    }

    #[inline]
    pub fn num_groups(&self) -> usize {
        self.cross_sections.num_groups()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_group_sections() -> CrossSections {
        let fast = GroupConstants {
            nu_sigma_f: 1.2,
            sigma_f: 0.48,
            sigma_tr: 6.0,
            chi: 1.0,
            velocity: 1000.0,
        };
        let slow = GroupConstants {
            nu_sigma_f: 2.0,
            sigma_f: 0.8,
            sigma_tr: 8.0,
            chi: 0.0,
            velocity: 300.0,
        };
        CrossSections::new(vec![fast, slow], vec![vec![4.0, 1.0], vec![0.0, 6.5]])
    }

    #[test]
    fn absorption_is_transport_minus_outscatter() {
        let xs = two_group_sections();
        assert_eq!(xs.scatter_out(0), 5.0);
        assert_eq!(xs.absorption(0), 1.0);
        assert_eq!(xs.absorption(1), 1.5);
    }

    #[test]
    fn transfer_reads_from_to_orientation() {
        let xs = two_group_sections();
        assert_eq!(xs.transfer(0, 1), 1.0);
        assert_eq!(xs.transfer(1, 0), 0.0);
    }

    #[test]
    fn is_fissile_detects_any_production() {
        let mut xs = two_group_sections();
        assert!(xs.is_fissile());
        for g in xs.groups.iter_mut() {
            g.nu_sigma_f = 0.0;
        }
        assert!(!xs.is_fissile());
    }

    #[test]
    fn atom_density_divides_by_rolab() {
        let material = Material {
            name: "core".to_string(),
            eos: LinearEos::new(0.0, 0.0, 0.0),
            heat_capacity: HeatCapacity::new(1.0, 0.0),
            cross_sections: two_group_sections(),
            rolab: 396.0,
        };
        assert_eq!(material.atom_density(792.0), 2.0);
        assert_eq!(material.num_groups(), 2);
    }
}
