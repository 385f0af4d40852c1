//! Minimization of the contact-force objective.

use crate::{assembly::ContactProblem, fph};
use anyhow::{Result, bail};
use nalgebra::DVector;
use std::collections::VecDeque;
use std::fmt;

/// Update pairs with curvature below this threshold are not stored.
const CURVATURE_EPSILON: fph = 1e-16;

/// A black-box unconstrained minimization strategy.
///
/// Implementations must be deterministic given the callbacks and the initial
/// guess, and must always return an iterate; non-convergence is expressed by
/// returning the best iterate found, never by failing.
pub trait Minimizer: fmt::Debug {
    /// Minimizes the objective starting from the given initial guess.
    fn minimize(
        &self,
        objective: &dyn Fn(&DVector<fph>) -> fph,
        gradient: &dyn Fn(&DVector<fph>) -> DVector<fph>,
        initial_guess: DVector<fph>,
    ) -> DVector<fph>;
}

/// Configuration parameters for the [`LbfgsMinimizer`].
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
#[derive(Clone, Debug)]
pub struct LbfgsConfig {
    /// Maximum number of quasi-Newton iterations.
    pub max_iterations: usize,
    /// Gradient-norm threshold below which the solve is considered
    /// converged.
    pub tolerance: fph,
    /// Number of recent update pairs retained for the Hessian approximation.
    pub history_size: usize,
    /// Maximum number of backtracking steps in a single line search.
    pub max_line_search_steps: usize,
    /// Upper bound on the line search step size.
    pub max_step_size: fph,
    /// Sufficient-decrease coefficient of the Armijo acceptance condition.
    pub sufficient_decrease_coef: fph,
}

/// A limited-memory BFGS minimizer with a bounded backtracking line search.
///
/// The solve runs to convergence or to the iteration cap. A failed line
/// search abandons the search and terminates the solve with the best
/// iterate found so far; it never surfaces an error.
#[derive(Clone, Debug, Default)]
pub struct LbfgsMinimizer {
    config: LbfgsConfig,
}

impl Default for LbfgsConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-10,
            history_size: 10,
            max_line_search_steps: 100,
            max_step_size: 100.0,
            sufficient_decrease_coef: 1e-4,
        }
    }
}

impl LbfgsConfig {
    /// Checks the configuration for values that would make the solve
    /// degenerate.
    ///
    /// # Errors
    /// Returns an error if any of the configuration parameters are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            bail!("Invalid iteration cap for contact force minimization: 0");
        }
        if self.history_size == 0 {
            bail!("Invalid history size for contact force minimization: 0");
        }
        if self.max_line_search_steps == 0 {
            bail!("Invalid line search step cap for contact force minimization: 0");
        }
        if self.tolerance <= 0.0 {
            bail!(
                "Invalid tolerance for contact force minimization: {}",
                self.tolerance
            );
        }
        if self.max_step_size <= 0.0 {
            bail!(
                "Invalid maximum step size for contact force minimization: {}",
                self.max_step_size
            );
        }
        if self.sufficient_decrease_coef <= 0.0 || self.sufficient_decrease_coef >= 1.0 {
            bail!(
                "Invalid sufficient-decrease coefficient for contact force minimization: {}",
                self.sufficient_decrease_coef
            );
        }
        Ok(())
    }
}

impl LbfgsMinimizer {
    /// Creates a new minimizer with the given configuration parameters.
    ///
    /// # Errors
    /// Returns an error if any of the configuration parameters are invalid.
    pub fn new(config: LbfgsConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &LbfgsConfig {
        &self.config
    }
}

impl Minimizer for LbfgsMinimizer {
    fn minimize(
        &self,
        objective: &dyn Fn(&DVector<fph>) -> fph,
        gradient: &dyn Fn(&DVector<fph>) -> DVector<fph>,
        initial_guess: DVector<fph>,
    ) -> DVector<fph> {
        let config = &self.config;

        let mut x = initial_guess;
        let mut value = objective(&x);
        let mut grad = gradient(&x);

        let mut best_x = x.clone();
        let mut best_value = value;

        // (s, y, 1 / (s . y)) update pairs, oldest first.
        let mut history: VecDeque<(DVector<fph>, DVector<fph>, fph)> =
            VecDeque::with_capacity(config.history_size);

        for iteration in 0..config.max_iterations {
            if grad.norm() <= config.tolerance {
                log::debug!("Contact force minimization converged after {iteration} iterations");
                return best_x;
            }

            let mut direction = -two_loop_direction(&history, &grad);
            let mut descent = grad.dot(&direction);
            if descent >= 0.0 {
                // The approximate Hessian failed to produce a descent
                // direction; restart from steepest descent.
                direction = -&grad;
                descent = grad.dot(&direction);
                if descent >= 0.0 {
                    return best_x;
                }
            }

            let Some((next_x, next_value)) = backtracking_line_search(
                objective,
                &x,
                value,
                &direction,
                descent,
                config,
            ) else {
                log::debug!(
                    "Line search failed at iteration {iteration}; returning the best iterate"
                );
                return best_x;
            };

            let next_grad = gradient(&next_x);
            let step = &next_x - &x;
            let grad_change = &next_grad - &grad;
            let curvature = step.dot(&grad_change);
            if curvature > CURVATURE_EPSILON {
                if history.len() == config.history_size {
                    history.pop_front();
                }
                history.push_back((step, grad_change, 1.0 / curvature));
            }

            x = next_x;
            value = next_value;
            grad = next_grad;

            if value < best_value {
                best_value = value;
                best_x = x.clone();
            }
        }

        log::debug!(
            "Contact force minimization stopped at the iteration cap of {}",
            config.max_iterations
        );
        best_x
    }
}

/// Computes the two-loop recursion estimate of the Newton direction
/// (without the leading sign flip).
fn two_loop_direction(
    history: &VecDeque<(DVector<fph>, DVector<fph>, fph)>,
    grad: &DVector<fph>,
) -> DVector<fph> {
    let mut q = grad.clone();

    let mut alphas = Vec::with_capacity(history.len());
    for (step, grad_change, rho) in history.iter().rev() {
        let alpha = rho * step.dot(&q);
        q -= alpha * grad_change;
        alphas.push(alpha);
    }

    let scale = history
        .back()
        .map_or(1.0, |(step, grad_change, _)| {
            step.dot(grad_change) / grad_change.dot(grad_change)
        });
    let mut direction = scale * q;

    for ((step, grad_change, rho), alpha) in history.iter().zip(alphas.iter().rev()) {
        let beta = rho * grad_change.dot(&direction);
        direction += (alpha - beta) * step;
    }

    direction
}

/// Backtracks from the bounded initial step until the Armijo condition
/// accepts a candidate, or gives up after the configured number of steps.
fn backtracking_line_search(
    objective: &dyn Fn(&DVector<fph>) -> fph,
    x: &DVector<fph>,
    value: fph,
    direction: &DVector<fph>,
    descent: fph,
    config: &LbfgsConfig,
) -> Option<(DVector<fph>, fph)> {
    let mut step_size = fph::min(1.0, config.max_step_size);

    for _ in 0..config.max_line_search_steps {
        let candidate = x + step_size * direction;
        let candidate_value = objective(&candidate);

        if candidate_value <= value + config.sufficient_decrease_coef * step_size * descent {
            return Some((candidate, candidate_value));
        }
        step_size *= 0.5;
    }

    None
}

/// Solves the contact-force least-squares problem `min_x ||A x + b||^2`
/// from a zero initial guess, returning the stacked mixed-frame forces.
pub fn solve_contact_forces(problem: &ContactProblem, minimizer: &dyn Minimizer) -> DVector<fph> {
    let matrix = &problem.matrix;
    let transposed = matrix.transpose();
    let offset = &problem.offset;

    let objective = |x: &DVector<fph>| (matrix * x + offset).norm_squared();
    let gradient = |x: &DVector<fph>| 2.0 * (&transposed * (matrix * x + offset));

    minimizer.minimize(&objective, &gradient, DVector::zeros(offset.len()))
}
