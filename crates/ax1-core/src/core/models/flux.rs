use crate::core::physics::quadrature::{NUM_COMPONENTS, scalar_from_edges};

pub type AngularComponents = [f64; NUM_COMPONENTS];

/// Angular and scalar neutron flux for every group.
///
/// Angular components are stored per boundary (`ENN`), the scalar flux per zone.
#[derive(Debug, Clone, PartialEq)]
pub struct FluxField {
    num_groups: usize,
    num_zones: usize,
    angular: Vec<AngularComponents>,
    scalar: Vec<f64>,
}

impl FluxField {
    /// A spatially flat, isotropic flux with the given scalar value.
    pub fn uniform(num_groups: usize, num_zones: usize, scalar: f64) -> Self {
        let per_component = 0.5 * scalar;
        Self {
            num_groups,
            num_zones,
            angular: vec![[per_component; NUM_COMPONENTS]; num_groups * (num_zones + 1)],
            scalar: vec![scalar; num_groups * num_zones],
        }
    }

    #[inline]
    pub fn num_groups(&self) -> usize {
        self.num_groups
    }

    #[inline]
    pub fn num_zones(&self) -> usize {
        self.num_zones
    }

    #[inline]
    pub fn fits(&self, num_groups: usize, num_zones: usize) -> bool {
        self.num_groups == num_groups && self.num_zones == num_zones
    }

    #[inline]
    pub fn scalar(&self, group: usize, zone: usize) -> f64 {
        self.scalar[group * self.num_zones + zone]
    }

    #[inline]
    pub fn set_scalar(&mut self, group: usize, zone: usize, value: f64) {
        self.scalar[group * self.num_zones + zone] = value;
    }

    pub fn group_scalar(&self, group: usize) -> &[f64] {
        let start = group * self.num_zones;
        &self.scalar[start..start + self.num_zones]
    }

    #[inline]
    pub fn angular(&self, group: usize, boundary: usize) -> &AngularComponents {
        &self.angular[group * (self.num_zones + 1) + boundary]
    }

    #[inline]
    pub fn angular_mut(&mut self, group: usize, boundary: usize) -> &mut AngularComponents {
        &mut self.angular[group * (self.num_zones + 1) + boundary]
    }

    /// Rebuilds the scalar flux of one group from its angular edge values.
    pub fn collapse_group(&mut self, group: usize) {
        for zone in 0..self.num_zones {
            let value = scalar_from_edges(
                self.angular(group, zone),
                self.angular(group, zone + 1),
            );
            self.set_scalar(group, zone, value);
        }
    }

    /// True when the flux carries no usable shape: empty, all zero, or non-finite.
    pub fn is_degenerate(&self) -> bool {
        self.scalar.is_empty()
            || self.scalar.iter().any(|v| !v.is_finite())
            || self.scalar.iter().all(|&v| v <= 0.0)
    }

    pub fn first_non_finite(&self) -> Option<(usize, usize, f64)> {
        self.scalar
            .iter()
            .position(|v| !v.is_finite())
            .map(|idx| (idx / self.num_zones, idx % self.num_zones, self.scalar[idx]))
    }

    /// Multiplies every angular and scalar value by `factor`.
    pub fn scale(&mut self, factor: f64) {
        for components in self.angular.iter_mut() {
            for value in components.iter_mut() {
                *value *= factor;
            }
        }
        for value in self.scalar.iter_mut() {
            *value *= factor;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_flux_is_consistent_between_angular_and_scalar() {
        let mut flux = FluxField::uniform(2, 3, 4.0);
        flux.collapse_group(1);
        for zone in 0..3 {
            assert!((flux.scalar(1, zone) - 4.0).abs() < 1e-12);
        }
        assert_eq!(flux.angular(0, 3)[2], 2.0);
    }

    #[test]
    fn is_degenerate_flags_zero_and_non_finite_flux() {
        assert!(FluxField::uniform(1, 4, 0.0).is_degenerate());
        assert!(FluxField::uniform(1, 0, 1.0).is_degenerate());

        let mut flux = FluxField::uniform(1, 4, 1.0);
        assert!(!flux.is_degenerate());
        flux.set_scalar(0, 2, f64::NAN);
        assert!(flux.is_degenerate());
        assert_eq!(flux.first_non_finite().map(|(g, z, _)| (g, z)), Some((0, 2)));
    }

    #[test]
    fn scale_multiplies_all_components() {
        let mut flux = FluxField::uniform(1, 2, 1.0);
        flux.scale(3.0);
        assert_eq!(flux.scalar(0, 1), 3.0);
        assert_eq!(flux.angular(0, 0)[4], 1.5);
    }

    #[test]
    fn group_scalar_returns_contiguous_slice() {
        let mut flux = FluxField::uniform(2, 2, 1.0);
        flux.set_scalar(1, 0, 7.0);
        assert_eq!(flux.group_scalar(1), &[7.0, 1.0]);
        assert!(flux.fits(2, 2));
        assert!(!flux.fits(1, 2));
    }
}
