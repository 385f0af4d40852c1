//! Impedance regularization of contact constraints.
//!
//! Each contact is softened by an impedance that rises smoothly from a
//! minimum to a maximum as the penetration deepens. The impedance drives
//! both a reference acceleration (a Baumgarte-style stabilization term
//! pushing the point back toward the surface) and a regularization weight
//! that trades constraint rigidity for numerical conditioning: stiff
//! contacts are regularized weakly, compliant contacts strongly.

use crate::{detection::CollidablePoint, fph, parameters::ContactParameters};
use nalgebra::{DVector, Matrix3, Vector3};

/// Additive guard against division by a vanishing impedance.
const IMPEDANCE_EPSILON: fph = 1e-12;

/// Reference acceleration and regularization diagonal for a set of contacts.
#[derive(Clone, Debug)]
pub struct ContactRegularization {
    /// Concatenated per-contact reference accelerations (length `3k`).
    pub reference_acceleration: DVector<fph>,
    /// Diagonal of the regularization matrix (length `3k`).
    pub regularization_diagonal: DVector<fph>,
}

/// Evaluates the impedance transition curve for a signed constraint-frame
/// distance.
///
/// The normalized penetration `x = |distance| / width` is mapped through a
/// two-piece power curve that transitions monotonically from 0 at `x = 0`
/// to 1 at `x = 1`, crossing over at the configured midpoint. The result is
/// an impedance clipped to `[min_impedance, max_impedance]`; beyond the
/// curve's domain (`x > 1`) the impedance saturates at the maximum rather
/// than extrapolating.
pub fn impedance(parameters: &ContactParameters, distance: fph) -> fph {
    let min = parameters.min_impedance;
    let max = parameters.max_impedance;

    let x = distance.abs() / parameters.width;
    if x > 1.0 {
        return max;
    }

    let mid = parameters.midpoint;
    let power = parameters.power;

    let y = if x < mid {
        x.powf(power) / mid.powf(power - 1.0)
    } else {
        1.0 - (1.0 - x).powf(power) / (1.0 - mid).powf(power - 1.0)
    };

    clip(min + y * (max - min), min, max)
}

/// Derives the effective stiffness and damping gains `(K_f, D_f)`.
///
/// Non-positive stiffness/damping parameters are interpreted as direct
/// spring and damper coefficients of the corresponding magnitude. Positive
/// values select the alternative parameterization from the time constant
/// and damping ratio, which yields a critically-damped-style gain pair.
/// The two parameters switch branches independently.
pub fn stiffness_damping_gains(parameters: &ContactParameters) -> (fph, fph) {
    let max = parameters.max_impedance;

    let stiffness_gain = if parameters.stiffness <= 0.0 {
        -parameters.stiffness / max.powi(2)
    } else {
        1.0 / (max * parameters.time_constant * parameters.damping_ratio).powi(2)
    };

    let damping_gain = if parameters.damping <= 0.0 {
        -parameters.damping / max
    } else {
        2.0 / (max * parameters.time_constant)
    };

    (stiffness_gain, damping_gain)
}

/// Computes the reference acceleration and regularization diagonal for the
/// given contacts.
///
/// The impedance curve is evaluated componentwise over each point's gap
/// vector, and the per-axis regularization weights are contracted with the
/// inverse inertia tensor of the point's parent link. Inactive contacts
/// contribute exactly zero to both outputs, decoupling them from the system
/// without changing array shapes.
pub fn regularizers<I>(
    parameters: &ContactParameters,
    points: &[CollidablePoint],
    inertia_of_link: I,
) -> ContactRegularization
where
    I: Fn(usize) -> Matrix3<fph>,
{
    let (stiffness_gain, damping_gain) = stiffness_damping_gains(parameters);

    let friction_sq = parameters.friction_coef.powi(2);

    let mut reference_acceleration = DVector::zeros(3 * points.len());
    let mut regularization_diagonal = DVector::zeros(3 * points.len());

    for (index, point) in points.iter().enumerate() {
        let mut imp = Vector3::zeros();
        let mut acceleration = Vector3::zeros();

        for axis in 0..3 {
            let gap = point.gap[axis];
            imp[axis] = impedance(parameters, gap);
            acceleration[axis] =
                -(damping_gain * point.velocity[axis] + stiffness_gain * imp[axis] * gap);
        }

        let inverse_inertia = inertia_of_link(point.parent_link)
            .try_inverse()
            .unwrap_or_else(|| {
                log::warn!(
                    "Singular inertia tensor for link {}; dropping its contact regularization",
                    point.parent_link
                );
                Matrix3::zeros()
            });

        // Row-vector contraction of the per-axis weights with the inverse
        // inertia.
        let weights = imp.map(|xi| 2.0 * friction_sq * (1.0 - xi) / (xi + IMPEDANCE_EPSILON))
            * (1.0 + friction_sq);
        let regularization = inverse_inertia.transpose() * weights;

        let activation = point.activation();
        for axis in 0..3 {
            reference_acceleration[3 * index + axis] = acceleration[axis] * activation;
            regularization_diagonal[3 * index + axis] = regularization[axis] * activation;
        }
    }

    ContactRegularization {
        reference_acceleration,
        regularization_diagonal,
    }
}

fn clip(value: fph, lower: fph, upper: fph) -> fph {
    fph::min(fph::max(value, lower), upper)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::detect_contacts;
    use crate::terrain::FlatTerrain;
    use approx::assert_abs_diff_eq;
    use nalgebra::Point3;
    use proptest::prelude::*;

    fn curve_parameters() -> ContactParameters {
        ContactParameters {
            width: 1.0,
            midpoint: 0.5,
            power: 2.0,
            ..Default::default()
        }
    }

    #[test]
    fn impedance_saturates_beyond_the_transition_width() {
        let parameters = ContactParameters::default();
        // Depth of 1 mm against a width of 0.1 mm: far past saturation.
        assert_abs_diff_eq!(
            impedance(&parameters, -1e-3),
            parameters.max_impedance
        );
        assert_abs_diff_eq!(impedance(&parameters, 1e-3), parameters.max_impedance);
    }

    #[test]
    fn impedance_is_at_the_minimum_for_zero_distance() {
        let parameters = curve_parameters();
        assert_abs_diff_eq!(impedance(&parameters, 0.0), parameters.min_impedance);
    }

    proptest! {
        #[test]
        fn impedance_stays_strictly_inside_the_bounds(distance in 1e-3..0.999f64) {
            let parameters = curve_parameters();
            let imp = impedance(&parameters, distance);
            prop_assert!(imp > parameters.min_impedance);
            prop_assert!(imp < parameters.max_impedance);
        }

        #[test]
        fn impedance_is_symmetric_in_the_distance_sign(distance in 0.0..2.0f64) {
            let parameters = curve_parameters();
            prop_assert_eq!(
                impedance(&parameters, distance),
                impedance(&parameters, -distance)
            );
        }
    }

    #[test]
    fn gain_derivation_switches_branch_with_the_parameter_sign() {
        let derived = ContactParameters::default();
        let (k_derived, d_derived) = stiffness_damping_gains(&derived);
        assert_abs_diff_eq!(
            k_derived,
            1.0 / (0.95 * 0.01_f64).powi(2),
            epsilon = 1e-6
        );
        assert_abs_diff_eq!(d_derived, 2.0 / (0.95 * 0.01), epsilon = 1e-9);

        let direct = ContactParameters {
            stiffness: -1.0,
            damping: -1.0,
            ..Default::default()
        };
        let (k_direct, d_direct) = stiffness_damping_gains(&direct);
        assert_abs_diff_eq!(k_direct, 1.0 / 0.95_f64.powi(2), epsilon = 1e-12);
        assert_abs_diff_eq!(d_direct, 1.0 / 0.95, epsilon = 1e-12);

        for gain in [k_derived, d_derived, k_direct, d_direct] {
            assert!(gain.is_finite());
            assert!(gain >= 0.0);
        }
    }

    #[test]
    fn inactive_contacts_contribute_zero_regularizers() {
        let points = detect_contacts(
            &FlatTerrain::default(),
            &[Point3::new(0.0, 0.0, 0.01), Point3::new(1.0, 0.0, -1e-3)],
            &[Vector3::new(0.1, 0.0, -0.2), Vector3::new(0.0, 0.0, -0.2)],
            &[0, 0],
        );
        let regularization =
            regularizers(&ContactParameters::default(), &points, |_| Matrix3::identity());

        for axis in 0..3 {
            assert_eq!(regularization.reference_acceleration[axis], 0.0);
            assert_eq!(regularization.regularization_diagonal[axis], 0.0);
        }
        assert!(regularization.reference_acceleration[5] != 0.0);
        assert!(regularization.regularization_diagonal[5] != 0.0);
    }

    #[test]
    fn singular_inertia_drops_regularization_but_not_stabilization() {
        let points = detect_contacts(
            &FlatTerrain::default(),
            &[Point3::new(0.0, 0.0, -1e-3)],
            &[Vector3::zeros()],
            &[0],
        );
        let regularization =
            regularizers(&ContactParameters::default(), &points, |_| Matrix3::zeros());

        assert_eq!(regularization.regularization_diagonal[2], 0.0);
        assert!(regularization.reference_acceleration[2] != 0.0);
    }
}
