use serde::Deserialize;

/// Linear equation of state, `P = α·ρ + β·θ + τ` (megabar, g/cm³, keV).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinearEos {
    pub alpha: f64,
    pub beta: f64,
    pub tau: f64,
}

impl LinearEos {
    pub fn new(alpha: f64, beta: f64, tau: f64) -> Self {
        Self { alpha, beta, tau }
    }

    #[inline]
    pub fn pressure(&self, density: f64, temperature: f64) -> f64 {
        self.alpha * density + self.beta * temperature + self.tau
    }

    /// The EOS pressure clamped at zero; the material cannot sustain tension.
    #[inline]
    pub fn hydrostatic_pressure(&self, density: f64, temperature: f64) -> f64 {
        self.pressure(density, temperature).max(0.0)
    }
}

/// Specific-heat law `e = A·θ + ½·B·θ²` relating specific internal energy
/// (10¹² erg/g) to temperature (keV).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeatCapacity {
    pub a: f64,
    pub b: f64,
}

impl HeatCapacity {
    pub fn new(a: f64, b: f64) -> Self {
        Self { a, b }
    }

    #[inline]
    pub fn energy(&self, temperature: f64) -> f64 {
        self.a * temperature + 0.5 * self.b * temperature * temperature
    }

    /// Inverts the specific-heat law for the non-negative root.
    ///
    /// Uses the rationalised form `θ = 2e / (A + √(A² + 2Be))`, which stays accurate when
    /// `B·e` is small compared to `A²`. Non-positive energies map to zero temperature.
    #[inline]
    pub fn temperature(&self, energy: f64) -> f64 {
        if energy <= 0.0 {
            return 0.0;
        }
        let discriminant = self.a * self.a + 2.0 * self.b * energy;
        if discriminant <= 0.0 {
            return 0.0;
        }
        let denominator = self.a + discriminant.sqrt();
        if denominator <= 0.0 {
            return 0.0;
        }
        (2.0 * energy / denominator).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    #[test]
    fn linear_eos_reproduces_reference_pressure() {
        let eos = LinearEos::new(1.0, 0.5, 0.1);
        assert!(f64_approx_equal(eos.pressure(18.7, 0.3), 18.95));
        assert!(f64_approx_equal(eos.hydrostatic_pressure(18.7, 0.3), 18.95));
    }

    #[test]
    fn hydrostatic_pressure_is_clamped_at_zero() {
        let eos = LinearEos::new(0.02873, 278.46, -0.3946);
        assert!(eos.pressure(1.0, 0.0) < 0.0);
        assert_eq!(eos.hydrostatic_pressure(1.0, 0.0), 0.0);
    }

    #[test]
    fn temperature_inverts_energy_for_quadratic_law() {
        let cv = HeatCapacity::new(12.163, 5780.0);
        for &theta in &[0.0, 1e-4, 0.01, 0.3, 2.0] {
            let e = cv.energy(theta);
            assert!(f64_approx_equal(cv.temperature(e), theta));
        }
    }

    #[test]
    fn temperature_inverts_energy_for_linear_law() {
        let cv = HeatCapacity::new(2.0, 0.0);
        assert!(f64_approx_equal(cv.temperature(3.0), 1.5));
    }

    #[test]
    fn temperature_is_zero_for_non_positive_energy() {
        let cv = HeatCapacity::new(12.163, 5780.0);
        assert_eq!(cv.temperature(0.0), 0.0);
        assert_eq!(cv.temperature(-5.0), 0.0);
    }

    #[test]
    fn temperature_is_zero_without_heat_capacity() {
        let cv = HeatCapacity::new(0.0, 0.0);
        assert_eq!(cv.temperature(1.0), 0.0);
    }
}
