use std::f64::consts::PI;

const FOUR_THIRDS_PI: f64 = 4.0 * PI / 3.0;

/// Physical volume of the spherical shell between two radii (cm³).
#[inline]
pub fn shell_volume(inner: f64, outer: f64) -> f64 {
    FOUR_THIRDS_PI * (outer.powi(3) - inner.powi(3))
}

/// Shell volume with the solid angle divided out, `(r₊³ − r₋³)/3`. This is the volume
/// factor paired with [`reduced_area`] in the transport balance.
#[inline]
pub fn reduced_volume(inner: f64, outer: f64) -> f64 {
    (outer.powi(3) - inner.powi(3)) / 3.0
}

/// Surface area with the solid angle divided out, `r²`.
#[inline]
pub fn reduced_area(radius: f64) -> f64 {
    radius * radius
}

/// Shell volumes for a boundary-centred radius array of length N+1.
pub fn shell_volumes(radius: &[f64]) -> Vec<f64> {
    radius
        .windows(2)
        .map(|w| shell_volume(w[0], w[1]))
        .collect()
}
