//! # Projected Gradient
//!
//! $$
//! x_{k+1}=P\big(x_k+\lambda_k(P(x_k-\alpha_k\nabla f(x_k))-x_k)\big),\qquad
//! \alpha_{k+1}=\frac{s_k^\top s_k}{s_k^\top y_k}
//! $$
//!
//! Spectral projected-gradient descent as an argmin [`Solver`], with an Armijo
//! [`BacktrackingLineSearch`] along the projected direction. Every iterate
//! stays feasible because the projection onto the constraint set is exact.

use anyhow::anyhow;
use argmin::core::CostFunction;
use argmin::core::Executor;
use argmin::core::Gradient;
use argmin::core::IterState;
use argmin::core::LineSearch;
use argmin::core::OptimizationResult;
use argmin::core::Problem;
use argmin::core::Solver;
use argmin::core::State;
use argmin::core::TerminationReason;
use argmin::core::TerminationStatus;
use argmin::core::KV;
use argmin::solver::linesearch::condition::ArmijoCondition;
use argmin::solver::linesearch::BacktrackingLineSearch;
use impl_new_derive::ImplNew;
use tracing::debug;

use super::solver::ConstrainedSolver;
use super::solver::Constraints;
use super::solver::SmoothObjective;
use super::solver::SolverConfig;
use super::solver::SolverReport;
use super::solver::Termination;
use crate::error::PortfolioError;
use crate::error::Result;

const ARMIJO: f64 = 1e-4;
const BACKTRACK: f64 = 0.5;
/// `0.5^40` is about `1e-12`.
const MAX_BACKTRACKS: u64 = 40;
const MIN_SPECTRAL_STEP: f64 = 1e-10;
const MAX_SPECTRAL_STEP: f64 = 1e10;
const LINE_SEARCH_FAILED: &str = "no Armijo step along the projected direction";

type ArgminResult<T> = std::result::Result<T, argmin::core::Error>;
type Iterate = IterState<Vec<f64>, Vec<f64>, (), (), (), f64>;
type Backtracking = BacktrackingLineSearch<Vec<f64>, Vec<f64>, ArmijoCondition<f64>, f64>;

/// Default [`ConstrainedSolver`]: runs [`SpectralProjection`] through an argmin
/// [`Executor`].
#[derive(ImplNew, Clone, Copy, Debug, Default, PartialEq)]
pub struct ProjectedGradient {
  pub config: SolverConfig,
}

/// argmin [`Solver`] taking spectral projected-gradient steps inside a
/// [`Constraints`] set.
///
/// Each iteration projects `x - alpha * grad`, backtracks along the direction
/// to that point and re-projects the accepted step. Terminates once the
/// projected-gradient residual drops to `tolerance`.
#[derive(Clone, Debug)]
pub struct SpectralProjection {
  constraints: Constraints,
  tolerance: f64,
  linesearch: Backtracking,
  step: f64,
  residual: f64,
}

impl SpectralProjection {
  pub fn new(constraints: Constraints, tolerance: f64) -> ArgminResult<Self> {
    let linesearch: Backtracking = BacktrackingLineSearch::new(ArmijoCondition::new(ARMIJO)?).rho(BACKTRACK)?;

    Ok(Self {
      constraints,
      tolerance,
      linesearch,
      step: 1.0,
      residual: f64::INFINITY,
    })
  }

  /// Projected-gradient residual at the last accepted iterate.
  pub fn residual(&self) -> f64 {
    self.residual
  }

  /// Armijo backtracking from `x` along `dir`; `None` when every trial step is
  /// rejected.
  fn line_search<O: SmoothObjective>(
    &mut self,
    problem: &mut Problem<O>,
    x: &[f64],
    grad: &[f64],
    cost: f64,
    dir: Vec<f64>,
  ) -> ArgminResult<Option<Vec<f64>>> {
    self.linesearch.search_direction(dir);
    let inner = problem
      .take_problem()
      .ok_or_else(|| anyhow!("objective taken by a previous line search"))?;

    let OptimizationResult {
      problem: mut line_problem,
      state: mut line_state,
      ..
    } = Executor::new(Rejecting(inner), self.linesearch.clone())
      .configure(|state| {
        state
          .param(x.to_vec())
          .gradient(grad.to_vec())
          .cost(cost)
          .max_iters(MAX_BACKTRACKS)
      })
      .ctrlc(false)
      .run()?;

    problem.problem = line_problem.take_problem().map(|Rejecting(inner)| inner);
    problem.consume_func_counts(line_problem);

    let accepted = matches!(
      line_state.get_termination_reason(),
      Some(TerminationReason::SolverConverged)
    );
    Ok(if accepted { line_state.take_param() } else { None })
  }
}

impl<O: SmoothObjective> Solver<O, Iterate> for SpectralProjection {
  const NAME: &'static str = "Spectral projected gradient";

  fn init(&mut self, problem: &mut Problem<O>, mut state: Iterate) -> ArgminResult<(Iterate, Option<KV>)> {
    let x0 = state
      .take_param()
      .ok_or_else(|| anyhow!("spectral projected gradient needs a starting point"))?;
    let x = self.constraints.project(&x0);
    let (cost, grad) = evaluate(problem, &x)?;

    self.residual = self.constraints.stationarity(&x, &grad);
    self.step = if self.residual > 0.0 {
      (1.0 / self.residual).clamp(MIN_SPECTRAL_STEP, MAX_SPECTRAL_STEP)
    } else {
      1.0
    };

    Ok((state.param(x).gradient(grad).cost(cost), None))
  }

  fn next_iter(&mut self, problem: &mut Problem<O>, mut state: Iterate) -> ArgminResult<(Iterate, Option<KV>)> {
    let x = state
      .take_param()
      .ok_or_else(|| anyhow!("iterate missing from solver state"))?;
    let grad = state
      .take_gradient()
      .ok_or_else(|| anyhow!("gradient missing from solver state"))?;
    let cost = state.get_cost();

    let trial: Vec<f64> = x
      .iter()
      .zip(&grad)
      .map(|(xi, gi)| xi - self.step * gi)
      .collect();
    let dir = sub(&self.constraints.project(&trial), &x);

    let accepted = if dot(&grad, &dir) < 0.0 {
      self.line_search(problem, &x, &grad, cost, dir)?
    } else {
      None
    };

    let Some(candidate) = accepted else {
      // no further decrease is representable; accept a near-stationary point
      let reason = if self.residual <= self.tolerance.sqrt() {
        TerminationReason::SolverConverged
      } else {
        TerminationReason::SolverExit(LINE_SEARCH_FAILED.to_string())
      };
      return Ok((state.param(x).gradient(grad).cost(cost).terminate_with(reason), None));
    };

    let x_new = self.constraints.project(&candidate);
    let (cost_new, grad_new) = evaluate(problem, &x_new)?;

    let s = sub(&x_new, &x);
    let y = sub(&grad_new, &grad);
    let sy = dot(&s, &y);
    self.step = if sy > 0.0 {
      (dot(&s, &s) / sy).clamp(MIN_SPECTRAL_STEP, MAX_SPECTRAL_STEP)
    } else {
      MAX_SPECTRAL_STEP
    };
    self.residual = self.constraints.stationarity(&x_new, &grad_new);

    Ok((state.param(x_new).gradient(grad_new).cost(cost_new), None))
  }

  fn terminate(&mut self, _state: &Iterate) -> TerminationStatus {
    if self.residual <= self.tolerance {
      TerminationStatus::Terminated(TerminationReason::SolverConverged)
    } else {
      TerminationStatus::NotTerminated
    }
  }
}

/// Reports an undefined objective value as `+inf` so the line search backs off
/// from it instead of aborting.
struct Rejecting<O>(O);

impl<O> CostFunction for Rejecting<O>
where
  O: CostFunction<Param = Vec<f64>, Output = f64>,
{
  type Param = Vec<f64>;
  type Output = f64;

  fn cost(&self, x: &Self::Param) -> ArgminResult<Self::Output> {
    Ok(match self.0.cost(x) {
      Ok(cost) if cost.is_finite() => cost,
      _ => f64::INFINITY,
    })
  }
}

impl<O> Gradient for Rejecting<O>
where
  O: Gradient<Param = Vec<f64>, Gradient = Vec<f64>>,
{
  type Param = Vec<f64>;
  type Gradient = Vec<f64>;

  fn gradient(&self, x: &Self::Param) -> ArgminResult<Self::Gradient> {
    self.0.gradient(x)
  }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
  a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn sub(a: &[f64], b: &[f64]) -> Vec<f64> {
  a.iter().zip(b).map(|(x, y)| x - y).collect()
}

fn evaluate<O: SmoothObjective>(problem: &mut Problem<O>, x: &Vec<f64>) -> ArgminResult<(f64, Vec<f64>)> {
  let cost = problem.cost(x)?;
  if !cost.is_finite() {
    return Err(anyhow!("non-finite objective value {cost}"));
  }
  let grad = problem.gradient(x)?;
  if grad.len() != x.len() || grad.iter().any(|g| !g.is_finite()) {
    return Err(anyhow!("non-finite gradient"));
  }
  Ok((cost, grad))
}

fn termination(reason: Option<&TerminationReason>) -> Termination {
  match reason {
    Some(TerminationReason::SolverConverged) => Termination::Converged,
    Some(TerminationReason::MaxItersReached) => Termination::MaxItersReached,
    Some(TerminationReason::SolverExit(msg)) if msg == LINE_SEARCH_FAILED => {
      Termination::LineSearchFailed
    }
    Some(other) => Termination::Stopped(other.text().to_string()),
    None => Termination::Stopped("no termination reason recorded".to_string()),
  }
}

impl ConstrainedSolver for ProjectedGradient {
  fn solve<P: SmoothObjective>(
    &self,
    problem: P,
    constraints: &Constraints,
    x0: &[f64],
  ) -> Result<SolverReport> {
    if x0.len() != constraints.dim() {
      return Err(PortfolioError::DimensionMismatch {
        expected: constraints.dim(),
        found: x0.len(),
      });
    }

    if !constraints.is_consistent() {
      return Ok(SolverReport {
        x: x0.to_vec(),
        cost: f64::NAN,
        iterations: 0,
        residual: f64::NAN,
        termination: Termination::Infeasible,
      });
    }

    let solver = SpectralProjection::new(constraints.clone(), self.config.tolerance)
      .map_err(|e| PortfolioError::OptimizationFailed(e.to_string()))?;

    let run = Executor::new(problem, solver)
      .configure(|state| state.param(x0.to_vec()).max_iters(self.config.max_iters))
      .ctrlc(false)
      .run();

    let report = match run {
      Ok(OptimizationResult {
        solver, mut state, ..
      }) => SolverReport {
        termination: termination(state.get_termination_reason()),
        x: state
          .take_param()
          .unwrap_or_else(|| constraints.project(x0)),
        cost: state.get_cost(),
        iterations: state.get_iter(),
        residual: solver.residual(),
      },
      Err(err) => SolverReport {
        x: constraints.project(x0),
        cost: f64::NAN,
        iterations: 0,
        residual: f64::NAN,
        termination: Termination::ObjectiveFailed(err.to_string()),
      },
    };

    debug!(
      iterations = report.iterations,
      residual = report.residual,
      cost = report.cost,
      termination = %report.termination,
      "projected gradient finished"
    );

    Ok(report)
  }
}
