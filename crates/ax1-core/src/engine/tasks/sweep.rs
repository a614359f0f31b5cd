use crate::core::models::flux::FluxField;
use crate::core::physics::geometry::{reduced_area, reduced_volume};
use crate::core::physics::quadrature::{
    INWARD, MIRROR, MU, OUTWARD, STARTING_DIRECTION, WEIGHT, lower_edge_coefficient,
    upper_edge_coefficient,
};
use crate::engine::config::OuterBoundary;

/// Per-zone shell geometry in the reduced (solid-angle free) form used by the balance.
struct Shell {
    width: f64,
    inner_area: f64,
    outer_area: f64,
    volume: f64,
}

impl Shell {
    #[inline]
    fn new(inner: f64, outer: f64) -> Self {
        Self {
            width: outer - inner,
            inner_area: reduced_area(inner),
            outer_area: reduced_area(outer),
            volume: reduced_volume(inner, outer),
        }
    }

    #[inline]
    fn area_change(&self) -> f64 {
        self.outer_area - self.inner_area
    }
}

/// Diamond-difference cell balance for one curved ordinate.
///
/// `upstream_area` is the area the direction enters through. Returns the cell-centre value.
#[inline]
fn ordinate_centre(
    shell: &Shell,
    component: usize,
    upstream_value: f64,
    angular_value: f64,
    total_xs: f64,
    source: f64,
) -> f64 {
    let mu = MU[component].abs();
    let w = WEIGHT[component];
    let a_minus = lower_edge_coefficient(component);
    let a_plus = upper_edge_coefficient(component);
    let downstream_area = if MU[component] < 0.0 {
        shell.inner_area
    } else {
        shell.outer_area
    };

    let numerator = mu * (shell.inner_area + shell.outer_area) * upstream_value
        + shell.area_change() * (a_plus + a_minus) / w * angular_value
        + 0.5 * shell.volume * source;
    let denominator = 2.0 * mu * downstream_area
        + 2.0 * shell.area_change() * a_plus / w
        + total_xs * shell.volume;
    (numerator / denominator).max(0.0)
}

/// Performs the inward and outward S4 sweeps of one group and refreshes its scalar flux.
///
/// `total_xs` and `source` are macroscopic per-zone values; the source is the isotropic
/// emission density integrated over angle (scattering plus fission).
pub(crate) fn sweep_group(
    flux: &mut FluxField,
    group: usize,
    radius: &[f64],
    total_xs: &[f64],
    source: &[f64],
    boundary: OuterBoundary,
) {
    let n = total_xs.len();

    let outgoing = *flux.angular(group, n);
    let surface = flux.angular_mut(group, n);
    for &j in &INWARD {
        surface[j] = match boundary {
            OuterBoundary::Vacuum => 0.0,
            OuterBoundary::Reflective => outgoing[MIRROR[j]],
        };
    }

    let mut angular = vec![0.0; n];

    for i in (0..n).rev() {
        let shell = Shell::new(radius[i], radius[i + 1]);
        let sigma = total_xs[i];
        let s = source[i];

        let upstream = flux.angular(group, i + 1)[STARTING_DIRECTION];
        let centre = ((2.0 * upstream + 0.5 * shell.width * s) / (2.0 + sigma * shell.width))
            .max(0.0);
        flux.angular_mut(group, i)[STARTING_DIRECTION] = (2.0 * centre - upstream).max(0.0);
        angular[i] = centre;

        for &j in &INWARD[1..] {
            let upstream = flux.angular(group, i + 1)[j];
            let centre = ordinate_centre(&shell, j, upstream, angular[i], sigma, s);
            flux.angular_mut(group, i)[j] = (2.0 * centre - upstream).max(0.0);
            angular[i] = (2.0 * centre - angular[i]).max(0.0);
        }
    }

    let centre = flux.angular_mut(group, 0);
    for &j in &OUTWARD {
        centre[j] = centre[MIRROR[j]];
    }

    for i in 0..n {
        let shell = Shell::new(radius[i], radius[i + 1]);
        for &j in &OUTWARD {
            let upstream = flux.angular(group, i)[j];
            let centre = ordinate_centre(&shell, j, upstream, angular[i], total_xs[i], source[i]);
            flux.angular_mut(group, i + 1)[j] = (2.0 * centre - upstream).max(0.0);
            angular[i] = (2.0 * centre - angular[i]).max(0.0);
        }
    }

    flux.collapse_group(group);
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-10;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    fn mesh(num_zones: usize, outer: f64) -> Vec<f64> {
        (0..=num_zones)
            .map(|i| outer * i as f64 / num_zones as f64)
            .collect()
    }

    #[test]
    fn flat_balanced_flux_is_a_fixed_point_with_reflective_boundary() {
        let n = 8;
        let radius = mesh(n, 5.0);
        let sigma = vec![2.0; n];
        let source = vec![2.0 * 3.0; n];
        let mut flux = FluxField::uniform(1, n, 3.0);

        sweep_group(&mut flux, 0, &radius, &sigma, &source, OuterBoundary::Reflective);

        for i in 0..n {
            assert!(f64_approx_equal(flux.scalar(0, i), 3.0));
        }
    }

    #[test]
    fn vacuum_boundary_depresses_flux_towards_the_surface() {
        let n = 10;
        let radius = mesh(n, 4.0);
        let sigma = vec![1.0; n];
        let source = vec![1.0; n];
        let mut flux = FluxField::uniform(1, n, 1.0);

        for _ in 0..50 {
            sweep_group(&mut flux, 0, &radius, &sigma, &source, OuterBoundary::Vacuum);
        }

        let phi = flux.group_scalar(0);
        assert!(phi[0] > phi[n - 1]);
        assert!(phi.iter().all(|&v| v > 0.0 && v < 1.0));
        for j in 0..3 {
            assert_eq!(flux.angular(0, n)[j], 0.0);
        }
    }

    #[test]
    fn centre_condition_mirrors_inward_components() {
        let n = 4;
        let radius = mesh(n, 2.0);
        let mut flux = FluxField::uniform(1, n, 1.0);
        sweep_group(&mut flux, 0, &radius, &vec![1.0; n], &vec![0.5; n], OuterBoundary::Vacuum);

        let centre = flux.angular(0, 0);
        assert_eq!(centre[3], centre[2]);
        assert_eq!(centre[4], centre[1]);
    }

    #[test]
    fn sweep_never_produces_negative_flux() {
        let n = 6;
        let radius = mesh(n, 30.0);
        let sigma = vec![5.0; n];
        let mut source = vec![0.0; n];
        source[n - 1] = 100.0;
        let mut flux = FluxField::uniform(1, n, 0.0);

        sweep_group(&mut flux, 0, &radius, &sigma, &source, OuterBoundary::Vacuum);

        for b in 0..=n {
            assert!(flux.angular(0, b).iter().all(|&v| v >= 0.0));
        }
        assert!(flux.group_scalar(0).iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn zero_source_in_vacuum_gives_zero_flux() {
        let n = 5;
        let radius = mesh(n, 3.0);
        let mut flux = FluxField::uniform(1, n, 1.0);
        sweep_group(&mut flux, 0, &radius, &vec![1.0; n], &vec![0.0; n], OuterBoundary::Vacuum);
        assert!(flux.group_scalar(0).iter().all(|&v| v == 0.0));
    }
}
