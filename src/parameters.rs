//! Configuration of the quasi-rigid contact model.

use crate::{
    fph,
    model::{ContactModelParameters, ContactModelState},
};
use approx::AbsDiffEq;
use bytemuck::{Pod, Zeroable};
use std::hash::{Hash, Hasher};

/// Parameters controlling the impedance shape, stiffness/damping and friction
/// of the quasi-rigid contact model.
///
/// Construction never validates; callers that need to reject bad values must
/// invoke [`Self::valid`] explicitly. Equality and hashing are bit-for-bit
/// over all fields, so a parameter set can key a cache or memoization table.
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
#[repr(C)]
#[derive(Copy, Clone, Debug, Zeroable, Pod)]
pub struct ContactParameters {
    /// Time constant of the contact dynamics, used to derive the effective
    /// stiffness and damping gains when [`Self::stiffness`] and
    /// [`Self::damping`] are not given directly.
    pub time_constant: fph,
    /// Adimensional damping ratio entering the derived stiffness gain.
    pub damping_ratio: fph,
    /// Minimum impedance of a contact, reached for vanishing penetration.
    pub min_impedance: fph,
    /// Maximum impedance of a contact, reached at full saturation.
    pub max_impedance: fph,
    /// Penetration depth over which the impedance transitions from minimum to
    /// maximum.
    pub width: fph,
    /// Midpoint of the impedance transition, as a fraction of the width.
    pub midpoint: fph,
    /// Power exponent shaping the impedance transition curve.
    pub power: fph,
    /// Direct spring coefficient. Non-positive values are interpreted as a
    /// spring constant of the corresponding magnitude; positive values select
    /// the time-constant parameterization instead.
    pub stiffness: fph,
    /// Direct damper coefficient, with the same sign convention as
    /// [`Self::stiffness`].
    pub damping: fph,
    /// Friction coefficient of the contact.
    pub friction_coef: fph,
}

/// The (absent) state of the quasi-rigid contact model.
///
/// The model is memoryless: nothing is carried between steps. This marker
/// exists so the model satisfies the same contract as stateful contact
/// models and can be swapped for one without special-casing.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct QuasiRigidState;

impl ContactParameters {
    /// Whether every parameter lies in its admissible range: all fields
    /// non-negative, impedance bounds ordered and within [0, 1].
    pub fn valid(&self) -> bool {
        self.time_constant >= 0.0
            && self.damping_ratio >= 0.0
            && self.min_impedance >= 0.0
            && self.max_impedance <= 1.0
            && self.min_impedance <= self.max_impedance
            && self.width >= 0.0
            && self.midpoint >= 0.0
            && self.power >= 0.0
            && self.stiffness >= 0.0
            && self.damping >= 0.0
            && self.friction_coef >= 0.0
    }
}

impl Default for ContactParameters {
    fn default() -> Self {
        Self {
            time_constant: 0.01,
            damping_ratio: 1.0,
            min_impedance: 0.9,
            max_impedance: 0.95,
            width: 1e-4,
            midpoint: 0.0,
            power: 0.0,
            stiffness: 0.0,
            damping: 0.0,
            friction_coef: 0.5,
        }
    }
}

impl PartialEq for ContactParameters {
    fn eq(&self, other: &Self) -> bool {
        bytemuck::bytes_of(self) == bytemuck::bytes_of(other)
    }
}

impl Eq for ContactParameters {}

impl Hash for ContactParameters {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write(bytemuck::bytes_of(self));
    }
}

impl AbsDiffEq for ContactParameters {
    type Epsilon = fph;

    fn default_epsilon() -> Self::Epsilon {
        fph::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.time_constant.abs_diff_eq(&other.time_constant, epsilon)
            && self.damping_ratio.abs_diff_eq(&other.damping_ratio, epsilon)
            && self.min_impedance.abs_diff_eq(&other.min_impedance, epsilon)
            && self.max_impedance.abs_diff_eq(&other.max_impedance, epsilon)
            && self.width.abs_diff_eq(&other.width, epsilon)
            && self.midpoint.abs_diff_eq(&other.midpoint, epsilon)
            && self.power.abs_diff_eq(&other.power, epsilon)
            && self.stiffness.abs_diff_eq(&other.stiffness, epsilon)
            && self.damping.abs_diff_eq(&other.damping, epsilon)
            && self.friction_coef.abs_diff_eq(&other.friction_coef, epsilon)
    }
}

impl ContactModelParameters for ContactParameters {
    fn valid(&self) -> bool {
        ContactParameters::valid(self)
    }
}

impl ContactModelState for QuasiRigidState {}
