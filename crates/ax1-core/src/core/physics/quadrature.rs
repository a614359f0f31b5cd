//! The S4 angular quadrature specialised for one-dimensional spherical geometry.
//!
//! Five components are carried per zone boundary. Component 0 is the starting direction
//! (μ = −1, zero weight) that seeds the angular redistribution; components 1..=4 are the
//! equal-weight Carlson S4 ordinates ordered from most inward to most outward.

pub const NUM_COMPONENTS: usize = 5;

/// The starting direction. Carries no weight in the scalar flux.
pub const STARTING_DIRECTION: usize = 0;

const MU_STEEP: f64 = 0.881_917_103_688_196_9;
const MU_SHALLOW: f64 = 1.0 / 3.0;

pub const MU: [f64; NUM_COMPONENTS] = [-1.0, -MU_STEEP, -MU_SHALLOW, MU_SHALLOW, MU_STEEP];

pub const WEIGHT: [f64; NUM_COMPONENTS] = [0.0, 0.5, 0.5, 0.5, 0.5];

/// Angular redistribution coefficients at the upper edge of each component,
/// `a[m+½] = a[m−½] − w[m]·μ[m]` with `a[½] = 0`.
pub const EDGE_COEFFICIENT: [f64; NUM_COMPONENTS] = [
    0.0,
    0.5 * MU_STEEP,
    0.5 * MU_STEEP + 0.5 * MU_SHALLOW,
    0.5 * MU_STEEP,
    0.0,
];

/// Components swept from the outer boundary towards the centre.
pub const INWARD: [usize; 3] = [0, 1, 2];
/// Components swept from the centre outwards.
pub const OUTWARD: [usize; 2] = [3, 4];

/// Reflection partner of each component about μ = 0. The starting direction reflects
/// onto the steepest outward ordinate.
pub const MIRROR: [usize; NUM_COMPONENTS] = [4, 4, 3, 2, 1];

#[inline]
pub fn lower_edge_coefficient(component: usize) -> f64 {
    if component == 0 {
        0.0
    } else {
        EDGE_COEFFICIENT[component - 1]
    }
}

#[inline]
pub fn upper_edge_coefficient(component: usize) -> f64 {
    EDGE_COEFFICIENT[component]
}

/// Weighted sum of the edge-averaged angular components of one zone.
#[inline]
pub fn scalar_from_edges(inner: &[f64; NUM_COMPONENTS], outer: &[f64; NUM_COMPONENTS]) -> f64 {
    (0..NUM_COMPONENTS)
        .map(|j| WEIGHT[j] * 0.5 * (inner[j] + outer[j]))
        .sum()
}
