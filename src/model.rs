//! Contact models and the quasi-rigid contact-force pipeline.

use crate::{
    assembly::{assemble_contact_problem, mask_inactive_rows},
    detection::detect_contacts,
    fph,
    frame::{SpatialContactForce, mixed_to_inertial},
    impedance::regularizers,
    parameters::{ContactParameters, QuasiRigidState},
    solver::{LbfgsMinimizer, Minimizer, solve_contact_forces},
    system::{ContactKinematics, LinkInertias, RigidBodyDynamics, VelocityRepresentation},
    terrain::{FlatTerrain, Terrain},
};
use nalgebra::{Point3, Vector3};
use num_traits::Zero;

/// Parameter set of a contact model.
pub trait ContactModelParameters {
    /// Whether every parameter lies in its admissible range. Construction
    /// does not validate; this is the only place violations surface.
    fn valid(&self) -> bool;
}

/// Per-step state of a contact model. Stateless models use a unit marker.
pub trait ContactModelState {
    /// Whether the state is internally consistent.
    fn valid(&self) -> bool {
        true
    }
}

/// A model turning the kinematic contact state of an articulated body into
/// per-point contact forces.
pub trait ContactModel {
    /// Configuration of the model.
    type Parameters: ContactModelParameters;
    /// State carried to the next step.
    type State: ContactModelState;

    /// Computes the world-frame contact force acting on each collidable
    /// point, given the points' world positions and velocities, together
    /// with the state to carry forward.
    fn compute_contact_forces<S>(
        &self,
        positions: &[Point3<fph>],
        velocities: &[Vector3<fph>],
        system: &mut S,
    ) -> (Vec<SpatialContactForce>, Self::State)
    where
        S: RigidBodyDynamics + ContactKinematics + LinkInertias;
}

/// The quasi-rigid contact model.
///
/// Contacts are treated as soft constraints whose rigidity is governed by a
/// penetration-dependent impedance: the resulting forces come from a single
/// regularized least-squares solve over all active contacts rather than from
/// hard complementarity conditions. The model is memoryless and the
/// computation is a pure function of its inputs; numeric edge cases
/// (singular mass matrices, vanishing impedances, non-converging
/// minimization) degrade gracefully instead of failing.
#[derive(Clone, Debug)]
pub struct QuasiRigidContacts<T: Terrain = FlatTerrain, M: Minimizer = LbfgsMinimizer> {
    parameters: ContactParameters,
    terrain: T,
    minimizer: M,
}

impl QuasiRigidContacts {
    /// Creates the model over flat terrain at zero height with the default
    /// minimizer.
    pub fn new(parameters: ContactParameters) -> Self {
        Self::with_terrain(parameters, FlatTerrain::default())
    }
}

impl<T: Terrain> QuasiRigidContacts<T> {
    /// Creates the model over the given terrain with the default minimizer.
    pub fn with_terrain(parameters: ContactParameters, terrain: T) -> Self {
        Self::with_terrain_and_minimizer(parameters, terrain, LbfgsMinimizer::default())
    }
}

impl<T: Terrain, M: Minimizer> QuasiRigidContacts<T, M> {
    /// Creates the model over the given terrain with the given minimization
    /// strategy.
    pub fn with_terrain_and_minimizer(
        parameters: ContactParameters,
        terrain: T,
        minimizer: M,
    ) -> Self {
        Self {
            parameters,
            terrain,
            minimizer,
        }
    }

    pub fn parameters(&self) -> &ContactParameters {
        &self.parameters
    }

    pub fn terrain(&self) -> &T {
        &self.terrain
    }
}

impl Default for QuasiRigidContacts {
    fn default() -> Self {
        Self::new(ContactParameters::default())
    }
}

impl<T: Terrain, M: Minimizer> ContactModel for QuasiRigidContacts<T, M> {
    type Parameters = ContactParameters;
    type State = QuasiRigidState;

    fn compute_contact_forces<S>(
        &self,
        positions: &[Point3<fph>],
        velocities: &[Vector3<fph>],
        system: &mut S,
    ) -> (Vec<SpatialContactForce>, Self::State)
    where
        S: RigidBodyDynamics + ContactKinematics + LinkInertias,
    {
        let point_count = system.collidable_point_count();
        debug_assert_eq!(positions.len(), point_count);
        debug_assert_eq!(velocities.len(), point_count);

        let parent_links: Vec<usize> = (0..point_count)
            .map(|index| system.parent_link(index))
            .collect();
        let points = detect_contacts(&self.terrain, positions, velocities, &parent_links);

        let active_count = points.iter().filter(|point| point.is_active()).count();
        log::trace!(
            "Computing contact forces for {point_count} collidable points ({active_count} active)"
        );

        let (mass_matrix, bias_forces, generalized_velocity, mut jacobian, mut jacobian_derivative, poses) =
            system.with_velocity_representation(VelocityRepresentation::Mixed, |system| {
                (
                    system.free_floating_mass_matrix(),
                    system.free_floating_bias_forces(),
                    system.generalized_velocity(),
                    system.contact_jacobian(),
                    system.contact_jacobian_derivative(),
                    system.contact_poses(),
                )
            });
        debug_assert_eq!(poses.len(), point_count);

        mask_inactive_rows(&mut jacobian, &points);
        mask_inactive_rows(&mut jacobian_derivative, &points);

        let regularization = regularizers(&self.parameters, &points, |link| {
            system.link_inertia_tensor(link)
        });

        let problem = assemble_contact_problem(
            &mass_matrix,
            &bias_forces,
            &generalized_velocity,
            &jacobian,
            &jacobian_derivative,
            &regularization.reference_acceleration,
            &regularization.regularization_diagonal,
        );

        let solution = solve_contact_forces(&problem, &self.minimizer);

        let forces = points
            .iter()
            .enumerate()
            .map(|(index, point)| {
                if !point.is_active() {
                    return SpatialContactForce::zero();
                }
                let mixed_force = Vector3::new(
                    solution[3 * index],
                    solution[3 * index + 1],
                    solution[3 * index + 2],
                );
                mixed_to_inertial(&poses[index], &mixed_force)
            })
            .collect();

        (forces, QuasiRigidState)
    }
}
