use crate::core::models::zone::ZoneState;

/// Below this |α·δt| the deposited energy is taken as `P·δt`.
const LINEAR_EXPONENT: f64 = 1e-8;

/// Fission energy released over one substep and the power at its end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubstepEnergy {
    /// 10¹² erg.
    pub energy: f64,
    /// 10¹² erg/μs.
    pub power: f64,
}

/// Integrates the point-kinetics power `P·e^{α t}` over a substep of length `dt`.
///
/// The exponent is clamped to `±max_exponent` so that a runaway α cannot overflow.
pub fn substep_energy(power: f64, alpha: f64, dt: f64, max_exponent: f64) -> SubstepEnergy {
    let exponent = (alpha * dt).clamp(-max_exponent, max_exponent);
    if exponent.abs() < LINEAR_EXPONENT {
        return SubstepEnergy {
            energy: power * dt,
            power,
        };
    }
    let growth = exponent.exp();
    SubstepEnergy {
        energy: power * dt * (growth - 1.0) / exponent,
        power: power * growth,
    }
}

/// Splits `energy` over the zones in proportion to fission rate times zone volume.
///
/// Falls back to a split by mass when the fission distribution carries no weight.
pub fn distribute(energy: f64, fission_density: &[f64], zones: &ZoneState) -> Vec<f64> {
    let weights: Vec<f64> = (0..zones.num_zones())
        .map(|i| fission_density.get(i).copied().unwrap_or(0.0).max(0.0) * zones.volume(i))
        .collect();
    let total: f64 = weights.iter().sum();
    if total > 0.0 && total.is_finite() {
        return weights.iter().map(|w| energy * w / total).collect();
    }

    let mass = zones.total_mass();
    zones.mass.iter().map(|m| energy * m / mass).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-12;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE * a.abs().max(b.abs()).max(1.0)
    }

    fn zones() -> ZoneState {
        ZoneState {
            radius: vec![0.0, 1.0, 2.0],
            lagrangian_radius: vec![0.0, 1.0, 2.0],
            velocity: vec![0.0; 3],
            density: vec![1.0, 1.0],
            reference_density: vec![1.0, 1.0],
            atom_density: vec![1.0, 1.0],
            pressure: vec![0.0; 2],
            hydrostatic_pressure: vec![0.0; 2],
            viscous_pressure: vec![0.0; 2],
            temperature: vec![0.0; 2],
            internal_energy: vec![0.0; 2],
            specific_volume_change: vec![0.0; 2],
            mass: vec![1.0, 3.0],
            material: vec![0, 0],
            ghost_pressure: 0.0,
        }
    }

    #[test]
    fn zero_alpha_deposits_constant_power() {
        let step = substep_energy(2.0, 0.0, 0.5, 50.0);
        assert_eq!(step.energy, 1.0);
        assert_eq!(step.power, 2.0);
    }

    #[test]
    fn positive_alpha_integrates_exponential_growth() {
        let step = substep_energy(1.0, 0.1, 10.0, 50.0);
        assert!(f64_approx_equal(step.energy, (1.0f64.exp() - 1.0) / 0.1));
        assert!(f64_approx_equal(step.power, 1.0f64.exp()));
    }

    #[test]
    fn negative_alpha_deposits_less_than_constant_power() {
        let step = substep_energy(1.0, -0.1, 10.0, 50.0);
        assert!(step.energy < 10.0);
        assert!(step.energy > 0.0);
        assert!(step.power < 1.0);
    }

    #[test]
    fn exponent_is_clamped() {
        let step = substep_energy(1.0, 1.0e6, 1.0, 50.0);
        assert!(step.power.is_finite());
        assert!(f64_approx_equal(step.power, 50.0f64.exp()));
    }

    #[test]
    fn distribute_follows_fission_rate_times_volume() {
        let zones = zones();
        // Volumes are in the ratio 1 : 7.
        let split = distribute(8.0, &[1.0, 1.0], &zones);
        assert!(f64_approx_equal(split[0], 1.0));
        assert!(f64_approx_equal(split[1], 7.0));
    }

    #[test]
    fn distribute_falls_back_to_mass_without_fission() {
        let zones = zones();
        let split = distribute(8.0, &[0.0, 0.0], &zones);
        assert!(f64_approx_equal(split[0], 2.0));
        assert!(f64_approx_equal(split[1], 6.0));
    }
}
