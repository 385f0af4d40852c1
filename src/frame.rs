//! Spatial contact forces and their frame transforms.

use crate::fph;
use approx::AbsDiffEq;
use nalgebra::{Isometry3, Matrix6, Vector3, Vector6};
use num_traits::Zero;
use std::ops::{Add, Mul};

/// A 6D contact force expressed in the world inertial frame.
///
/// The linear part is the contact force itself; the angular part is the
/// moment the force induces about the world origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpatialContactForce {
    /// Translational force component.
    pub linear: Vector3<fph>,
    /// Moment about the world origin.
    pub angular: Vector3<fph>,
}

impl SpatialContactForce {
    pub fn new(linear: Vector3<fph>, angular: Vector3<fph>) -> Self {
        Self { linear, angular }
    }
}

/// Maps a contact force from the mixed frame (located at the contact point,
/// aligned with the world axes) to the world inertial frame.
///
/// The dual adjoint of the contact pose is built with its rotational part
/// replaced by identity, so only the translation enters the correction, and
/// its transpose is applied to the force with a zero angular slot.
pub fn mixed_to_inertial(
    pose: &Isometry3<fph>,
    mixed_force: &Vector3<fph>,
) -> SpatialContactForce {
    let translation = pose.translation.vector;

    // Inverse velocity adjoint of the translation-only transform.
    let mut adjoint = Matrix6::identity();
    adjoint
        .fixed_view_mut::<3, 3>(0, 3)
        .copy_from(&(-translation.cross_matrix()));

    let mut mixed = Vector6::zeros();
    mixed.fixed_view_mut::<3, 1>(0, 0).copy_from(mixed_force);

    let inertial = adjoint.transpose() * mixed;

    SpatialContactForce::new(
        Vector3::new(inertial[0], inertial[1], inertial[2]),
        Vector3::new(inertial[3], inertial[4], inertial[5]),
    )
}

impl Default for SpatialContactForce {
    fn default() -> Self {
        Self::zero()
    }
}

impl Add for SpatialContactForce {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            linear: self.linear + rhs.linear,
            angular: self.angular + rhs.angular,
        }
    }
}

impl Mul<fph> for SpatialContactForce {
    type Output = Self;

    fn mul(self, rhs: fph) -> Self::Output {
        Self {
            linear: self.linear * rhs,
            angular: self.angular * rhs,
        }
    }
}

impl Zero for SpatialContactForce {
    fn zero() -> Self {
        Self {
            linear: Vector3::zeros(),
            angular: Vector3::zeros(),
        }
    }

    fn is_zero(&self) -> bool {
        self.linear == Vector3::zeros() && self.angular == Vector3::zeros()
    }
}

impl AbsDiffEq for SpatialContactForce {
    type Epsilon = fph;

    fn default_epsilon() -> Self::Epsilon {
        fph::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.linear.abs_diff_eq(&other.linear, epsilon)
            && self.angular.abs_diff_eq(&other.angular, epsilon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::Translation3;

    #[test]
    fn transform_at_the_origin_is_the_identity_on_the_force() {
        let pose = Isometry3::identity();
        let force = mixed_to_inertial(&pose, &Vector3::new(1.0, -2.0, 3.0));
        assert_abs_diff_eq!(force.linear, Vector3::new(1.0, -2.0, 3.0));
        assert_abs_diff_eq!(force.angular, Vector3::zeros());
    }

    #[test]
    fn translation_induces_the_cross_product_moment() {
        let pose = Isometry3::from_parts(
            Translation3::new(1.0, 2.0, 3.0),
            nalgebra::UnitQuaternion::identity(),
        );
        let force_vector = Vector3::new(0.0, 0.0, 10.0);
        let force = mixed_to_inertial(&pose, &force_vector);

        assert_abs_diff_eq!(force.linear, force_vector);
        assert_abs_diff_eq!(
            force.angular,
            Vector3::new(1.0, 2.0, 3.0).cross(&force_vector),
            epsilon = 1e-12
        );
    }

    #[test]
    fn rotation_of_the_pose_does_not_enter_the_transform() {
        let translation = Translation3::new(0.5, 0.0, -0.5);
        let rotated = Isometry3::from_parts(
            translation,
            nalgebra::UnitQuaternion::from_euler_angles(0.3, -1.1, 0.7),
        );
        let unrotated = Isometry3::from_parts(translation, nalgebra::UnitQuaternion::identity());

        let force_vector = Vector3::new(2.0, 1.0, -4.0);
        assert_abs_diff_eq!(
            mixed_to_inertial(&rotated, &force_vector),
            mixed_to_inertial(&unrotated, &force_vector),
            epsilon = 1e-12
        );
    }

    #[test]
    fn zero_is_the_additive_identity() {
        let force = SpatialContactForce::new(
            Vector3::new(1.0, 2.0, 3.0),
            Vector3::new(-1.0, 0.0, 1.0),
        );
        assert_eq!(force + SpatialContactForce::zero(), force);
        assert!(SpatialContactForce::zero().is_zero());
        assert!(!force.is_zero());
    }
}
