//! # Constrained Solver
//!
//! $$
//! \min_{x} f(x)\quad\text{s.t.}\quad \ell\le x\le u,\ \ \mathbf{1}^\top x=b
//! $$
//!
//! Capability interface between portfolio objectives and a concrete
//! constrained nonlinear solver.

use std::fmt::Display;

use argmin::core::CostFunction;
use argmin::core::Gradient;

use crate::error::Result;

/// Coordinates within this distance of a bound are placed on it.
const SNAP: f64 = 1e-12;

/// Smooth objective with an available gradient.
///
/// Blanket-implemented for every argmin problem over `Vec<f64>`.
pub trait SmoothObjective:
  CostFunction<Param = Vec<f64>, Output = f64> + Gradient<Param = Vec<f64>, Gradient = Vec<f64>>
{
}

impl<T> SmoothObjective for T where
  T: CostFunction<Param = Vec<f64>, Output = f64> + Gradient<Param = Vec<f64>, Gradient = Vec<f64>>
{
}

/// A solver for box-bounded problems with one linear budget equality.
pub trait ConstrainedSolver {
  /// Minimize `problem` over `constraints` starting from `x0`.
  ///
  /// Non-convergence is reported through [`SolverReport::termination`]; the
  /// `Err` branch is reserved for malformed input.
  fn solve<P: SmoothObjective>(
    &self,
    problem: P,
    constraints: &Constraints,
    x0: &[f64],
  ) -> Result<SolverReport>;
}

/// Stopping rule shared by solver implementations.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolverConfig {
  /// Bound on the projected-gradient residual `||P(x - grad f) - x||_inf`.
  pub tolerance: f64,
  /// Iteration cap.
  pub max_iters: u64,
}

impl Default for SolverConfig {
  fn default() -> Self {
    Self {
      tolerance: 1e-8,
      max_iters: 1000,
    }
  }
}

/// Feasible set `{ lower <= x <= upper, sum(x) = budget }`.
#[derive(Clone, Debug, PartialEq)]
pub struct Constraints {
  pub lower: Vec<f64>,
  pub upper: Vec<f64>,
  pub budget: f64,
}

impl Constraints {
  /// Weights in `[0, 1]` summing to one.
  pub fn long_only(n: usize) -> Self {
    Self {
      lower: vec![0.0; n],
      upper: vec![1.0; n],
      budget: 1.0,
    }
  }

  pub fn dim(&self) -> usize {
    self.lower.len()
  }

  /// Whether the set is non-empty and well formed.
  pub fn is_consistent(&self) -> bool {
    if self.lower.len() != self.upper.len() || !self.budget.is_finite() {
      return false;
    }
    let bounds_ok = self
      .lower
      .iter()
      .zip(&self.upper)
      .all(|(l, u)| l.is_finite() && u.is_finite() && l <= u);
    let lo: f64 = self.lower.iter().sum();
    let hi: f64 = self.upper.iter().sum();

    bounds_ok && lo <= self.budget && self.budget <= hi
  }

  /// Whether `x` lies in the set up to `tol`.
  pub fn contains(&self, x: &[f64], tol: f64) -> bool {
    x.len() == self.dim()
      && x
        .iter()
        .zip(self.lower.iter().zip(&self.upper))
        .all(|(xi, (l, u))| *xi >= l - tol && *xi <= u + tol)
      && (x.iter().sum::<f64>() - self.budget).abs() <= tol
  }

  /// Euclidean projection onto the set.
  ///
  /// The projection is `clamp(y - tau, lower, upper)` for the multiplier `tau`
  /// that meets the budget; `tau` is found by bisection. Coordinates left within
  /// rounding of a bound are snapped onto it and the budget residue goes to an
  /// interior coordinate, so active bounds hold exactly. Requires
  /// [`Constraints::is_consistent`].
  pub fn project(&self, y: &[f64]) -> Vec<f64> {
    let n = self.dim();
    if n == 0 {
      return Vec::new();
    }

    let shifted = |tau: f64| -> Vec<f64> {
      y.iter()
        .zip(self.lower.iter().zip(&self.upper))
        .map(|(yi, (l, u))| (yi - tau).clamp(*l, *u))
        .collect()
    };

    // every coordinate at its upper bound at `lo`, at its lower bound at `hi`
    let mut lo = y
      .iter()
      .zip(&self.upper)
      .map(|(yi, u)| yi - u)
      .fold(f64::INFINITY, f64::min);
    let mut hi = y
      .iter()
      .zip(&self.lower)
      .map(|(yi, l)| yi - l)
      .fold(f64::NEG_INFINITY, f64::max);

    for _ in 0..200 {
      let mid = 0.5 * (lo + hi);
      if mid <= lo || mid >= hi {
        break;
      }
      if shifted(mid).iter().sum::<f64>() > self.budget {
        lo = mid;
      } else {
        hi = mid;
      }
    }

    let mut x = shifted(0.5 * (lo + hi));
    for (xi, (l, u)) in x.iter_mut().zip(self.lower.iter().zip(&self.upper)) {
      if (*xi - l).abs() <= SNAP {
        *xi = *l;
      } else if (u - *xi).abs() <= SNAP {
        *xi = *u;
      }
    }

    let residual = self.budget - x.iter().sum::<f64>();
    if residual != 0.0 {
      let fits = |i: &usize| {
        let xi = x[*i] + residual;
        xi >= self.lower[*i] && xi <= self.upper[*i]
      };
      let interior = |i: &usize| x[*i] > self.lower[*i] && x[*i] < self.upper[*i];
      let slack = (0..n)
        .filter(|i| interior(i) && fits(i))
        .max_by(|&a, &b| x[a].total_cmp(&x[b]))
        .or_else(|| (0..n).filter(fits).max_by(|&a, &b| x[a].total_cmp(&x[b])));
      if let Some(i) = slack {
        x[i] += residual;
      }
    }

    x
  }

  /// Projected-gradient residual `||P(x - g) - x||_inf`.
  pub fn stationarity(&self, x: &[f64], g: &[f64]) -> f64 {
    let trial: Vec<f64> = x.iter().zip(g).map(|(xi, gi)| xi - gi).collect();
    self
      .project(&trial)
      .iter()
      .zip(x)
      .map(|(p, xi)| (p - xi).abs())
      .fold(0.0, f64::max)
  }
}

/// Why a solver stopped.
#[derive(Clone, Debug, PartialEq)]
pub enum Termination {
  Converged,
  MaxItersReached,
  /// No step along the projected direction decreased the objective.
  LineSearchFailed,
  /// The objective or its gradient could not be evaluated.
  ObjectiveFailed(String),
  /// Bounds and budget admit no point.
  Infeasible,
  /// The run ended for a reason outside the stopping rule.
  Stopped(String),
}

impl Display for Termination {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Termination::Converged => write!(f, "optimization terminated successfully"),
      Termination::MaxItersReached => write!(f, "iteration limit reached"),
      Termination::LineSearchFailed => {
        write!(f, "positive directional derivative in line search")
      }
      Termination::ObjectiveFailed(msg) => write!(f, "objective evaluation failed: {msg}"),
      Termination::Infeasible => write!(f, "constraints are inconsistent"),
      Termination::Stopped(reason) => write!(f, "solver stopped: {reason}"),
    }
  }
}

/// Outcome of [`ConstrainedSolver::solve`].
#[derive(Clone, Debug, PartialEq)]
pub struct SolverReport {
  /// Last accepted iterate.
  pub x: Vec<f64>,
  /// Objective value at `x`.
  pub cost: f64,
  pub iterations: u64,
  /// Projected-gradient residual at `x`.
  pub residual: f64,
  pub termination: Termination,
}

impl SolverReport {
  pub fn is_success(&self) -> bool {
    self.termination == Termination::Converged
  }
}
