//! Assembly of the regularized contact-force optimization problem.

use crate::{detection::CollidablePoint, fph};
use nalgebra::{DMatrix, DVector, Dyn, SVD};

/// Singular values below this threshold are treated as zero when solving
/// against the mass matrix.
const SINGULAR_VALUE_EPSILON: fph = 1e-12;

/// The linear system defining the contact-force least-squares problem
/// `min_x ||matrix * x + offset||^2`.
#[derive(Clone, Debug)]
pub struct ContactProblem {
    /// Regularized Delassus operator `G + R` (`3k` by `3k`).
    pub matrix: DMatrix<fph>,
    /// Free contact acceleration minus reference acceleration (length `3k`).
    pub offset: DVector<fph>,
}

/// Zeroes the three Jacobian rows of every inactive contact, removing its
/// coupling to the system while preserving the array shape.
pub fn mask_inactive_rows(jacobian: &mut DMatrix<fph>, points: &[CollidablePoint]) {
    let ncols = jacobian.ncols();
    for (index, point) in points.iter().enumerate() {
        if !point.is_active() {
            jacobian.view_mut((3 * index, 0), (3, ncols)).fill(0.0);
        }
    }
}

/// Assembles the optimization problem from the system matrices.
///
/// The Delassus operator `G = J * M^+ * J^T` and the free contact
/// acceleration `J * M^+ * (-h) + J_dot * nu` are computed through
/// least-squares solves against the mass matrix, which remains well defined
/// when `M` is singular or ill-conditioned. The Jacobian and its derivative
/// are expected with inactive rows already masked.
pub fn assemble_contact_problem(
    mass_matrix: &DMatrix<fph>,
    bias_forces: &DVector<fph>,
    generalized_velocity: &DVector<fph>,
    jacobian: &DMatrix<fph>,
    jacobian_derivative: &DMatrix<fph>,
    reference_acceleration: &DVector<fph>,
    regularization_diagonal: &DVector<fph>,
) -> ContactProblem {
    let svd = mass_matrix.clone().svd(true, true);

    let mass_solved_jacobian = solve_for_matrix(&svd, &jacobian.transpose());
    let delassus = jacobian * mass_solved_jacobian;

    let free_acceleration = jacobian * solve_for_vector(&svd, &-bias_forces)
        + jacobian_derivative * generalized_velocity;

    let matrix = delassus + DMatrix::from_diagonal(regularization_diagonal);
    let offset = free_acceleration - reference_acceleration;

    ContactProblem { matrix, offset }
}

fn solve_for_matrix(svd: &SVD<fph, Dyn, Dyn>, rhs: &DMatrix<fph>) -> DMatrix<fph> {
    svd.solve(rhs, SINGULAR_VALUE_EPSILON).unwrap_or_else(|error| {
        log::warn!("Mass matrix least-squares solve failed ({error}); using zero solution");
        DMatrix::zeros(rhs.nrows(), rhs.ncols())
    })
}

fn solve_for_vector(svd: &SVD<fph, Dyn, Dyn>, rhs: &DVector<fph>) -> DVector<fph> {
    svd.solve(rhs, SINGULAR_VALUE_EPSILON).unwrap_or_else(|error| {
        log::warn!("Mass matrix least-squares solve failed ({error}); using zero solution");
        DVector::zeros(rhs.nrows())
    })
}
