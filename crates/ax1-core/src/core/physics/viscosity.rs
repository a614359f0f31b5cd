/// Von Neumann–Richtmyer artificial viscosity `q = (C·ρ·Δr·V̇)² / V`.
///
/// `V` is the specific volume (1/ρ) and `V̇` its rate of change (cm³/g/μs). The term only
/// acts while the zone is being compressed (`V̇ < 0`) and vanishes for `C = 0`.
#[inline]
pub fn von_neumann_richtmyer(
    coefficient: f64,
    density: f64,
    zone_width: f64,
    specific_volume_rate: f64,
) -> f64 {
    if coefficient <= 0.0 || specific_volume_rate >= 0.0 || density <= 0.0 {
        return 0.0;
    }
    let specific_volume = 1.0 / density;
    let velocity_scale = coefficient * density * zone_width * specific_volume_rate;
    velocity_scale * velocity_scale / specific_volume
}

/// Limits the viscous pressure to `cap_ratio` times the hydrostatic magnitude.
#[inline]
pub fn capped(viscous: f64, hydrostatic: f64, cap_ratio: f64) -> f64 {
    viscous.clamp(0.0, cap_ratio * hydrostatic.abs())
}
