//! # Portfolio Optimizer
//!
//! $$
//! \max_{\mathbf w\in\Delta}\frac{\mathbf w^\top\mu-r_f}{\sqrt{\mathbf w^\top\Sigma\mathbf w}},
//! \qquad \min_{\mathbf w\in\Delta}\sqrt{\mathbf w^\top\Sigma\mathbf w}
//! $$
//!
//! Max-Sharpe and min-volatility allocations over the long-only simplex,
//! started from equal weights.

use ndarray::Array1;
use ndarray::Array2;
use ndarray::ArrayView1;
use ndarray::ArrayView2;
use tracing::info;
use tracing::warn;

use super::objective::moments;
use super::objective::NegativeSharpe;
use super::objective::PortfolioVolatility;
use super::projected::ProjectedGradient;
use super::solver::ConstrainedSolver;
use super::solver::Constraints;
use super::solver::SmoothObjective;
use super::types::Allocation;
use super::types::Objective;
use super::types::OptimalPortfolios;
use super::types::Performance;
use crate::analytics::AssetAnalytics;
use crate::analytics::AssetSeries;
use crate::error::PortfolioError;
use crate::error::Result;
use crate::panel::position;

/// Feasibility slack accepted on returned weights.
const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Optimizer over annualized returns and covariance.
///
/// Holds no state beyond its inputs; each call is a pure function of
/// `(mu, Sigma, r_f)` and the solver configuration.
#[derive(Clone, Debug)]
pub struct PortfolioOptimizer<S = ProjectedGradient> {
  tickers: Vec<String>,
  annualized_returns: Array1<f64>,
  covariance: Array2<f64>,
  risk_free_rate: f64,
  solver: S,
}

impl PortfolioOptimizer<ProjectedGradient> {
  /// Take annualized returns, covariance and risk-free rate from `analytics`.
  pub fn new(analytics: &AssetAnalytics) -> Result<Self> {
    Self::from_parts(
      analytics.tickers().to_vec(),
      analytics.annualized_return().values().to_owned(),
      analytics.covariance()?.to_owned(),
      analytics.risk_free_rate(),
    )
  }

  pub fn from_parts(
    tickers: Vec<String>,
    annualized_returns: Array1<f64>,
    covariance: Array2<f64>,
    risk_free_rate: f64,
  ) -> Result<Self> {
    let n = tickers.len();
    if n == 0 {
      return Err(PortfolioError::insufficient("asset universe", 1, 0));
    }
    if annualized_returns.len() != n {
      return Err(PortfolioError::DimensionMismatch {
        expected: n,
        found: annualized_returns.len(),
      });
    }
    if covariance.nrows() != n || covariance.ncols() != n {
      return Err(PortfolioError::DimensionMismatch {
        expected: n,
        found: if covariance.nrows() != n {
          covariance.nrows()
        } else {
          covariance.ncols()
        },
      });
    }

    Ok(Self {
      tickers,
      annualized_returns,
      covariance,
      risk_free_rate,
      solver: ProjectedGradient::default(),
    })
  }
}

impl<S: ConstrainedSolver> PortfolioOptimizer<S> {
  /// Swap the constrained solver.
  pub fn with_solver<T: ConstrainedSolver>(self, solver: T) -> PortfolioOptimizer<T> {
    PortfolioOptimizer {
      tickers: self.tickers,
      annualized_returns: self.annualized_returns,
      covariance: self.covariance,
      risk_free_rate: self.risk_free_rate,
      solver,
    }
  }

  pub fn tickers(&self) -> &[String] {
    &self.tickers
  }

  pub fn risk_free_rate(&self) -> f64 {
    self.risk_free_rate
  }

  pub fn annualized_returns(&self) -> ArrayView1<'_, f64> {
    self.annualized_returns.view()
  }

  pub fn covariance(&self) -> ArrayView2<'_, f64> {
    self.covariance.view()
  }

  pub fn solver(&self) -> &S {
    &self.solver
  }

  /// Expected return, volatility and Sharpe ratio of `weights`.
  pub fn performance(&self, weights: &[f64]) -> Result<Performance> {
    if weights.len() != self.tickers.len() {
      return Err(PortfolioError::DimensionMismatch {
        expected: self.tickers.len(),
        found: weights.len(),
      });
    }

    let (expected_return, volatility) = self.moments(weights);
    let sharpe_ratio = self
      .sharpe_ratio(expected_return, volatility)
      .ok_or_else(|| PortfolioError::zero_volatility("portfolio"))?;

    Ok(Performance {
      expected_return,
      volatility,
      sharpe_ratio,
    })
  }

  /// [`PortfolioOptimizer::performance`] for ticker-keyed weights.
  pub fn performance_of(&self, weights: &AssetSeries) -> Result<Performance> {
    if weights.len() != self.tickers.len() {
      return Err(PortfolioError::DimensionMismatch {
        expected: self.tickers.len(),
        found: weights.len(),
      });
    }

    let mut ordered = vec![0.0; self.tickers.len()];
    for (ticker, w) in weights.iter() {
      let i = position(&self.tickers, ticker)
        .ok_or_else(|| PortfolioError::UnknownTicker(ticker.to_string()))?;
      ordered[i] = w;
    }

    self.performance(&ordered)
  }

  /// `1/n` in every asset; also the solver's starting point.
  pub fn equal_weights(&self) -> AssetSeries {
    let n = self.tickers.len();
    AssetSeries::from_parts(&self.tickers, Array1::from_elem(n, 1.0 / n as f64))
  }

  /// Weights maximizing the Sharpe ratio.
  pub fn maximize_sharpe(&self) -> Result<Allocation> {
    let problem = NegativeSharpe::new(
      self.annualized_returns.view(),
      self.covariance.view(),
      self.risk_free_rate,
    );
    self.run(Objective::MaxSharpe, problem)
  }

  /// Weights minimizing portfolio volatility.
  pub fn minimize_volatility(&self) -> Result<Allocation> {
    let problem = PortfolioVolatility::new(self.covariance.view());
    self.run(Objective::MinVolatility, problem)
  }

  /// Both allocations, solved on two worker threads.
  pub fn optimal_portfolios(&self) -> Result<OptimalPortfolios>
  where
    S: Sync,
  {
    let (max_sharpe, min_volatility) =
      rayon::join(|| self.maximize_sharpe(), || self.minimize_volatility());

    Ok(OptimalPortfolios {
      max_sharpe: max_sharpe?,
      min_volatility: min_volatility?,
    })
  }

  /// `(w · mu, sigma_p)` of dimension-checked weights.
  fn moments(&self, weights: &[f64]) -> (f64, f64) {
    let (expected_return, _, variance) = moments(
      ArrayView1::from(weights),
      self.annualized_returns.view(),
      self.covariance.view(),
    );
    (expected_return, variance.sqrt())
  }

  fn sharpe_ratio(&self, expected_return: f64, volatility: f64) -> Option<f64> {
    (volatility > 0.0).then(|| (expected_return - self.risk_free_rate) / volatility)
  }

  fn run<P: SmoothObjective>(&self, objective: Objective, problem: P) -> Result<Allocation> {
    let n = self.tickers.len();
    let constraints = Constraints::long_only(n);
    let x0 = vec![1.0 / n as f64; n];

    let report = self.solver.solve(problem, &constraints, &x0)?;
    if !report.is_success() {
      warn!(
        %objective,
        iterations = report.iterations,
        residual = report.residual,
        termination = %report.termination,
        "optimization failed"
      );
      return Err(PortfolioError::OptimizationFailed(
        report.termination.to_string(),
      ));
    }

    if !constraints.contains(&report.x, WEIGHT_TOLERANCE) {
      warn!(%objective, weights = ?report.x, "solution violates constraints");
      return Err(PortfolioError::OptimizationFailed(format!(
        "{objective} solution violates the long-only budget constraints"
      )));
    }

    let (expected_return, volatility) = self.moments(&report.x);
    let sharpe_ratio = self.sharpe_ratio(expected_return, volatility);
    info!(
      %objective,
      iterations = report.iterations,
      expected_return,
      volatility,
      sharpe_ratio = ?sharpe_ratio,
      "optimized portfolio"
    );

    Ok(Allocation {
      objective,
      weights: AssetSeries::from_parts(&self.tickers, Array1::from(report.x)),
      expected_return,
      volatility,
      sharpe_ratio,
      iterations: report.iterations,
    })
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_relative_eq;
  use ndarray::array;
  use tracing_test::traced_test;

  use super::*;
  use crate::optimize::solver::SolverConfig;
  use crate::panel::tests::dates;
  use crate::panel::tests::tickers;
  use crate::panel::PricePanel;

  fn two_uncorrelated(mu: Array1<f64>, rf: f64) -> PortfolioOptimizer {
    PortfolioOptimizer::from_parts(
      tickers(&["AAA", "BBB"]),
      mu,
      array![[0.04, 0.0], [0.0, 0.09]],
      rf,
    )
    .unwrap()
  }

  fn assert_on_simplex(weights: &AssetSeries) {
    assert_relative_eq!(weights.sum(), 1.0, epsilon = 1e-6);
    assert!(weights.values().iter().all(|w| (-1e-9..=1.0 + 1e-9).contains(w)));
  }

  #[test]
  fn performance_of_equal_weights() {
    let opt = two_uncorrelated(array![0.10, 0.20], 0.03);
    let perf = opt.performance(&[0.5, 0.5]).unwrap();

    assert_relative_eq!(perf.expected_return, 0.15, epsilon = 1e-12);
    assert_relative_eq!(perf.volatility, (0.25 * 0.04 + 0.25 * 0.09_f64).sqrt(), epsilon = 1e-12);
    assert_relative_eq!(perf.sharpe_ratio, 0.12 / perf.volatility, epsilon = 1e-12);
    assert_eq!(perf, opt.performance(&[0.5, 0.5]).unwrap());
    assert_eq!(opt.performance_of(&opt.equal_weights()).unwrap(), perf);
  }

  #[test]
  fn performance_rejects_bad_inputs() {
    let opt = two_uncorrelated(array![0.10, 0.20], 0.03);

    assert!(matches!(
      opt.performance(&[1.0]),
      Err(PortfolioError::DimensionMismatch { .. })
    ));

    let foreign = AssetSeries::new(tickers(&["AAA", "ZZZ"]), array![0.5, 0.5]).unwrap();
    assert_eq!(
      opt.performance_of(&foreign),
      Err(PortfolioError::UnknownTicker("ZZZ".to_string()))
    );

    let flat = PortfolioOptimizer::from_parts(tickers(&["F"]), array![0.0], array![[0.0]], 0.0).unwrap();
    assert!(matches!(
      flat.performance(&[1.0]),
      Err(PortfolioError::DivisionUndefined { .. })
    ));
  }

  #[test]
  fn max_sharpe_finds_tangency_portfolio() {
    let opt = two_uncorrelated(array![0.10, 0.20], 0.0);
    let alloc = opt.maximize_sharpe().unwrap();

    // w ~ Sigma^-1 mu = [2.5, 2.222..]
    let total = 2.5 + 0.2 / 0.09;
    assert_on_simplex(&alloc.weights);
    assert_relative_eq!(alloc.weights.get("AAA").unwrap(), 2.5 / total, epsilon = 1e-4);
    assert_relative_eq!(
      alloc.sharpe_ratio.unwrap(),
      (0.25_f64 + 0.04 / 0.09).sqrt(),
      epsilon = 1e-6
    );
  }

  #[test]
  fn max_sharpe_drops_assets_below_risk_free() {
    let opt = two_uncorrelated(array![0.02, 0.15], 0.03);
    let alloc = opt.maximize_sharpe().unwrap();

    assert_on_simplex(&alloc.weights);
    assert_relative_eq!(alloc.weights.get("AAA").unwrap(), 0.0, epsilon = 1e-6);
    assert_relative_eq!(alloc.weights.get("BBB").unwrap(), 1.0, epsilon = 1e-6);
  }

  #[test]
  fn min_volatility_weights_inverse_variance() {
    let opt = two_uncorrelated(array![0.10, 0.20], 0.03);
    let alloc = opt.minimize_volatility().unwrap();

    let total = 1.0 / 0.04 + 1.0 / 0.09;
    assert_on_simplex(&alloc.weights);
    assert_relative_eq!(alloc.weights.get("AAA").unwrap(), 25.0 / total, epsilon = 1e-4);
    assert!(alloc.volatility <= opt.performance(&[0.5, 0.5]).unwrap().volatility);
  }

  #[test]
  fn symmetric_assets_get_equal_weights() {
    let opt = PortfolioOptimizer::from_parts(
      tickers(&["A", "B", "C"]),
      array![0.08, 0.08, 0.08],
      Array2::from_diag(&array![0.0225, 0.0225, 0.0225]),
      0.03,
    )
    .unwrap();
    let alloc = opt.minimize_volatility().unwrap();

    for w in alloc.weights.values() {
      assert_relative_eq!(*w, 1.0 / 3.0, epsilon = 1e-3);
    }
  }

  #[test]
  fn single_asset_takes_everything() {
    let opt =
      PortfolioOptimizer::from_parts(tickers(&["ONLY"]), array![0.08], array![[0.0225]], 0.03)
        .unwrap();

    let sharpe = opt.maximize_sharpe().unwrap();
    let minvol = opt.minimize_volatility().unwrap();
    assert_eq!(sharpe.weights.values().to_vec(), vec![1.0]);
    assert_eq!(minvol.weights.values().to_vec(), vec![1.0]);
    assert_relative_eq!(minvol.volatility, 0.15, epsilon = 1e-12);
  }

  #[test]
  fn single_asset_panel_volatility_matches_asset() {
    let prices = array![[100.0], [101.0], [99.5], [102.0], [103.1]];
    let panel = PricePanel::new(dates(5), tickers(&["SPY"]), prices).unwrap();
    let analytics = AssetAnalytics::from_panel(&panel).unwrap();
    let opt = PortfolioOptimizer::new(&analytics).unwrap();

    let alloc = opt.minimize_volatility().unwrap();
    let vol = analytics.annualized_volatility().unwrap().get("SPY").unwrap();
    assert_eq!(alloc.weights.get("SPY"), Some(1.0));
    assert_relative_eq!(alloc.volatility, vol, max_relative = 1e-9);
  }

  #[test]
  fn optimal_portfolios_runs_both_objectives() {
    let opt = PortfolioOptimizer::from_parts(
      tickers(&["A", "B", "C"]),
      array![0.08, 0.12, 0.05],
      array![[0.04, 0.006, 0.0], [0.006, 0.09, 0.01], [0.0, 0.01, 0.02]],
      0.02,
    )
    .unwrap();
    let both = opt.optimal_portfolios().unwrap();

    assert_on_simplex(&both.max_sharpe.weights);
    assert_on_simplex(&both.min_volatility.weights);
    let best = both.max_sharpe.performance().unwrap();
    let safest = both.min_volatility.performance().unwrap();
    assert!(best.sharpe_ratio >= safest.sharpe_ratio - 1e-9);
    assert!(safest.volatility <= best.volatility + 1e-9);
    assert_eq!(both.max_sharpe, opt.maximize_sharpe().unwrap());
  }

  #[test]
  #[traced_test]
  fn iteration_cap_surfaces_as_optimization_failure() {
    let opt = two_uncorrelated(array![0.10, 0.20], 0.0).with_solver(ProjectedGradient::new(
      SolverConfig {
        tolerance: 1e-8,
        max_iters: 0,
      },
    ));

    assert_eq!(
      opt.maximize_sharpe(),
      Err(PortfolioError::OptimizationFailed(
        "iteration limit reached".to_string()
      ))
    );
    assert!(logs_contain("optimization failed"));
  }

  #[test]
  fn riskless_asset_wins_min_volatility_without_sharpe() {
    let prices = array![[100.0, 100.0], [110.0, 100.0], [121.0, 100.0], [115.0, 100.0]];
    let panel = PricePanel::new(dates(4), tickers(&["UP", "FLAT"]), prices).unwrap();
    let analytics = AssetAnalytics::from_panel(&panel).unwrap();
    let opt = PortfolioOptimizer::new(&analytics).unwrap();

    let alloc = opt.minimize_volatility().unwrap();
    assert_eq!(alloc.weights.values().to_vec(), vec![0.0, 1.0]);
    assert_eq!(alloc.volatility, 0.0);
    assert_eq!(alloc.expected_return, 0.0);
    assert_eq!(alloc.sharpe_ratio, None);
    assert!(matches!(
      alloc.performance(),
      Err(PortfolioError::DivisionUndefined { .. })
    ));
    assert!(matches!(
      opt.performance_of(&alloc.weights),
      Err(PortfolioError::DivisionUndefined { .. })
    ));
  }

  #[test]
  fn all_constant_assets_cannot_maximize_sharpe() {
    let opt = PortfolioOptimizer::from_parts(
      tickers(&["X", "Y"]),
      array![0.0, 0.0],
      Array2::zeros((2, 2)),
      0.03,
    )
    .unwrap();

    assert!(matches!(
      opt.maximize_sharpe(),
      Err(PortfolioError::OptimizationFailed(ref msg)) if msg.contains("volatility is zero")
    ));
  }

  #[test]
  fn rejects_mismatched_inputs() {
    let err = PortfolioOptimizer::from_parts(tickers(&["A", "B"]), array![0.1], array![[0.04]], 0.0);
    assert!(matches!(err, Err(PortfolioError::DimensionMismatch { .. })));
  }
}
