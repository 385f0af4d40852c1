//! Quasi-rigid terrain contact forces for articulated rigid-body systems.
//!
//! Given the world positions and velocities of a set of collidable points
//! fixed to the links of an articulated body, this crate computes one 3D
//! contact force per point against a terrain surface using an
//! impedance-regularized soft-constraint model. The pipeline detects which
//! points penetrate the terrain, derives a per-contact impedance and
//! regularization from the penetration state, assembles a regularized
//! Delassus system from the free-floating mass matrix and contact Jacobians,
//! minimizes the resulting least-squares objective, and maps the solved
//! mixed-frame forces to the world inertial frame.
//!
//! The rigid-body model itself, its mass matrix and Jacobian computation, and
//! the terrain data are external collaborators, abstracted behind the traits
//! in [`system`] and [`terrain`]. The model carries no state between steps.

pub mod assembly;
pub mod detection;
pub mod frame;
pub mod impedance;
pub mod model;
pub mod parameters;
pub mod solver;
pub mod system;
pub mod terrain;

pub use detection::CollidablePoint;
pub use frame::SpatialContactForce;
pub use model::{ContactModel, ContactModelParameters, ContactModelState, QuasiRigidContacts};
pub use parameters::{ContactParameters, QuasiRigidState};
pub use solver::{LbfgsConfig, LbfgsMinimizer, Minimizer};
pub use system::{ContactKinematics, LinkInertias, RigidBodyDynamics, VelocityRepresentation};
pub use terrain::{FlatTerrain, PlaneTerrain, Terrain};

/// Floating point type used for contact force computation.
#[allow(non_camel_case_types)]
pub type fph = f64;
