//! Interfaces to the rigid-body system the contact model operates on.
//!
//! The contact-force pipeline never sees a concrete rigid-body
//! implementation. It consumes the quantities below through these traits,
//! which a simulator implements on its model/state pair.

use crate::fph;
use nalgebra::{DMatrix, DVector, Isometry3, Matrix3};

/// The reference frame in which generalized velocities and the quantities
/// derived from them are expressed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VelocityRepresentation {
    /// World-fixed inertial frame.
    Inertial,
    /// Base body frame.
    Body,
    /// Frame located at the base body but aligned with the world axes.
    Mixed,
}

/// Provider of the free-floating dynamics quantities of the articulated
/// system.
pub trait RigidBodyDynamics {
    /// Number of generalized degrees of freedom `n`.
    fn dof_count(&self) -> usize;

    /// The free-floating mass matrix `M` (`n` by `n`, symmetric positive
    /// semi-definite, possibly near-singular).
    fn free_floating_mass_matrix(&self) -> DMatrix<fph>;

    /// The free-floating bias forces `h` (length `n`), containing the
    /// Coriolis, centrifugal and gravity terms.
    fn free_floating_bias_forces(&self) -> DVector<fph>;

    /// The generalized velocity `nu` (length `n`).
    fn generalized_velocity(&self) -> DVector<fph>;

    /// Runs the given action with the system switched to the given velocity
    /// representation, restoring the previous representation on exit.
    fn with_velocity_representation<R>(
        &mut self,
        representation: VelocityRepresentation,
        action: impl FnOnce(&mut Self) -> R,
    ) -> R
    where
        Self: Sized;
}

/// Provider of the contact kinematics of the collidable points.
pub trait ContactKinematics {
    /// Number of collidable points `k`.
    fn collidable_point_count(&self) -> usize;

    /// The stacked linear contact Jacobian (`3k` by `n`), three rows per
    /// collidable point, in the current velocity representation.
    fn contact_jacobian(&self) -> DMatrix<fph>;

    /// The time derivative of [`Self::contact_jacobian`] (`3k` by `n`).
    fn contact_jacobian_derivative(&self) -> DMatrix<fph>;

    /// The world pose of each collidable point's contact frame.
    fn contact_poses(&self) -> Vec<Isometry3<fph>>;

    /// The index of the link the given collidable point is attached to.
    fn parent_link(&self, point_index: usize) -> usize;
}

/// Provider of per-link inertial properties.
pub trait LinkInertias {
    /// The 3x3 inertia tensor of the link with the given index.
    fn link_inertia_tensor(&self, link_index: usize) -> Matrix3<fph>;
}
