//! # Constrained Minimizer
//!
//! $$
//! \min_{\mathbf x}\ f(\Pi(\mathbf x)) + \lambda\Big(\|\mathbf x-\Pi(\mathbf x)\|^2 + \sum_k h_k(\Pi(\mathbf x))^2\Big)
//! $$
//!
//! Box-bounded, equality-constrained minimization behind the [`Minimizer`]
//! trait. [`NelderMeadMinimizer`] projects onto the bounds and penalizes
//! constraint residuals, then runs argmin's Nelder-Mead with a hard iteration cap.

use argmin::core::CostFunction;
use argmin::core::Executor;
use argmin::core::State;
use argmin::core::TerminationReason;
use argmin::solver::neldermead::NelderMead;
use impl_new_derive::ImplNew;
use tracing::debug;

/// Scalar function of the decision vector.
pub type Objective = Box<dyn Fn(&[f64]) -> f64 + Send + Sync>;

/// Cost assigned to points where the objective is not finite.
const NON_FINITE_COST: f64 = 1e10;

/// A minimization problem with box bounds and equality constraints `h(x) = 0`.
pub struct ConstrainedProblem {
  pub objective: Objective,
  pub bounds: Vec<(f64, f64)>,
  pub equalities: Vec<Objective>,
  pub initial_guess: Vec<f64>,
}

impl ConstrainedProblem {
  /// Unbounded, unconstrained problem starting from `initial_guess`.
  pub fn new<F>(objective: F, initial_guess: Vec<f64>) -> Self
  where
    F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
  {
    let n = initial_guess.len();
    Self {
      objective: Box::new(objective),
      bounds: vec![(f64::NEG_INFINITY, f64::INFINITY); n],
      equalities: Vec::new(),
      initial_guess,
    }
  }

  /// Long-only fully-invested weights: `0 <= w_i <= 1`, `sum(w) = 1`, starting from `1/n`.
  pub fn long_only_simplex<F>(objective: F, n: usize) -> Self
  where
    F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
  {
    let x0 = if n == 0 {
      Vec::new()
    } else {
      vec![1.0 / n as f64; n]
    };
    Self::new(objective, x0)
      .with_bounds(vec![(0.0, 1.0); n])
      .with_equality(|w: &[f64]| w.iter().sum::<f64>() - 1.0)
  }

  pub fn with_bounds(mut self, bounds: Vec<(f64, f64)>) -> Self {
    self.bounds = bounds;
    self
  }

  pub fn with_equality<F>(mut self, h: F) -> Self
  where
    F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
  {
    self.equalities.push(Box::new(h));
    self
  }

  pub fn dim(&self) -> usize {
    self.initial_guess.len()
  }

  /// Clamp `x` into the bounds.
  pub fn project(&self, x: &[f64]) -> Vec<f64> {
    x.iter()
      .enumerate()
      .map(|(i, &v)| {
        let (lo, hi) = self
          .bounds
          .get(i)
          .copied()
          .unwrap_or((f64::NEG_INFINITY, f64::INFINITY));
        v.clamp(lo, hi)
      })
      .collect()
  }
}

/// Outcome of a minimization; `converged` is false whenever the solver stopped
/// for any reason other than meeting its tolerance.
#[derive(Clone, Debug, PartialEq)]
pub struct Minimization {
  pub solution: Vec<f64>,
  pub objective_value: f64,
  pub iterations: u64,
  pub converged: bool,
}

/// Anything able to solve a [`ConstrainedProblem`].
pub trait Minimizer {
  fn minimize(&self, problem: ConstrainedProblem) -> Minimization;
}

/// Penalized Nelder-Mead over the bound-projected decision vector.
#[derive(Clone, Copy, Debug, PartialEq, ImplNew)]
pub struct NelderMeadMinimizer {
  /// Hard cap on solver iterations.
  pub max_iters: u64,
  /// Standard deviation of simplex costs at which the solver is converged.
  pub sd_tolerance: f64,
  /// Weight of the squared constraint residuals.
  pub penalty: f64,
}

impl Default for NelderMeadMinimizer {
  fn default() -> Self {
    Self {
      max_iters: 2000,
      sd_tolerance: 1e-10,
      penalty: 1e4,
    }
  }
}

struct PenalizedCost {
  problem: ConstrainedProblem,
  penalty: f64,
}

impl PenalizedCost {
  fn eval(&self, x: &[f64]) -> f64 {
    let projected = self.problem.project(x);
    let f = (self.problem.objective)(&projected);
    if !f.is_finite() {
      return NON_FINITE_COST;
    }

    let bound_dist: f64 = x
      .iter()
      .zip(projected.iter())
      .map(|(a, b)| (a - b).powi(2))
      .sum();
    let residuals: f64 = self
      .problem
      .equalities
      .iter()
      .map(|h| h(&projected).powi(2))
      .sum();

    f + self.penalty * (bound_dist + residuals)
  }
}

impl CostFunction for PenalizedCost {
  type Param = Vec<f64>;
  type Output = f64;

  fn cost(&self, x: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
    Ok(self.eval(x))
  }
}

/// Initial simplex around `x0`, stepping inward when a vertex would leave the box.
fn initial_simplex(x0: &[f64], bounds: &[(f64, f64)]) -> Vec<Vec<f64>> {
  let n = x0.len();
  let step = (0.5 / n.max(1) as f64).max(0.05);
  let mut simplex = Vec::with_capacity(n + 1);
  simplex.push(x0.to_vec());

  for i in 0..n {
    let mut point = x0.to_vec();
    let hi = bounds.get(i).map(|b| b.1).unwrap_or(f64::INFINITY);
    if point[i] + step <= hi {
      point[i] += step;
    } else {
      point[i] -= step;
    }
    simplex.push(point);
  }

  simplex
}

impl Minimizer for NelderMeadMinimizer {
  fn minimize(&self, problem: ConstrainedProblem) -> Minimization {
    let n = problem.dim();
    let x0 = problem.project(&problem.initial_guess);
    let simplex = initial_simplex(&x0, &problem.bounds);
    let bounds = problem.bounds.clone();

    let cost = PenalizedCost {
      problem,
      penalty: self.penalty,
    };
    let fallback_value = cost.eval(&x0);

    let unconverged = |solution: Vec<f64>, value: f64| Minimization {
      solution,
      objective_value: value,
      iterations: 0,
      converged: false,
    };

    if n == 0 {
      return unconverged(Vec::new(), fallback_value);
    }

    let solver = match NelderMead::new(simplex).with_sd_tolerance(self.sd_tolerance) {
      Ok(solver) => solver,
      Err(_) => return unconverged(x0, fallback_value),
    };

    match Executor::new(cost, solver)
      .configure(|state| state.max_iters(self.max_iters))
      .run()
    {
      Ok(res) => {
        let iterations = res.state().get_iter();
        let converged = matches!(
          res.state().get_termination_reason(),
          Some(TerminationReason::SolverConverged)
        );
        let objective_value = res.state().get_best_cost();
        let best = res.state.best_param.unwrap_or(x0);
        let solution = best
          .iter()
          .zip(bounds.iter())
          .map(|(&v, &(lo, hi))| v.clamp(lo, hi))
          .collect();

        debug!(iterations, converged, objective_value, "nelder-mead finished");

        Minimization {
          solution,
          objective_value,
          iterations,
          converged,
        }
      }
      Err(_) => unconverged(x0, fallback_value),
    }
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;

  use super::*;

  #[test]
  fn finds_interior_minimum_on_simplex() {
    let problem = ConstrainedProblem::long_only_simplex(
      |w: &[f64]| (w[0] - 0.3).powi(2) + (w[1] - 0.7).powi(2),
      2,
    );
    let res = NelderMeadMinimizer::default().minimize(problem);

    assert!(res.converged);
    assert_abs_diff_eq!(res.solution[0], 0.3, epsilon = 1e-4);
    assert_abs_diff_eq!(res.solution[1], 0.7, epsilon = 1e-4);
  }

  #[test]
  fn respects_upper_bounds() {
    let problem = ConstrainedProblem::new(|w: &[f64]| -w[0], vec![0.5, 0.5])
      .with_bounds(vec![(0.0, 0.6), (0.0, 1.0)])
      .with_equality(|w: &[f64]| w[0] + w[1] - 1.0);
    let res = NelderMeadMinimizer::default().minimize(problem);

    assert!(res.solution[0] <= 0.6);
    assert_abs_diff_eq!(res.solution[0], 0.6, epsilon = 1e-3);
    assert_abs_diff_eq!(res.solution[1], 0.4, epsilon = 1e-3);
  }

  #[test]
  fn iteration_cap_reports_non_convergence() {
    let problem = ConstrainedProblem::long_only_simplex(
      |w: &[f64]| w.iter().enumerate().map(|(i, x)| (i as f64 + 1.0) * x * x).sum(),
      5,
    );
    let res = NelderMeadMinimizer::new(2, 1e-14, 1e4).minimize(problem);

    assert!(!res.converged);
    assert!(res.iterations <= 2);
    assert_eq!(res.solution.len(), 5);
  }

  #[test]
  fn empty_problem_is_not_converged() {
    let problem = ConstrainedProblem::long_only_simplex(|_: &[f64]| 0.0, 0);
    let res = NelderMeadMinimizer::default().minimize(problem);
    assert!(!res.converged);
    assert!(res.solution.is_empty());
  }
}
