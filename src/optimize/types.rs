//! # Allocations
//!
//! $$
//! R_p=\mathbf w^\top\mu,\qquad \sigma_p=\sqrt{\mathbf w^\top\Sigma\mathbf w},\qquad S_p=\frac{R_p-r_f}{\sigma_p}
//! $$
//!
//! What an optimization run asks for and what it hands back.

use std::fmt::Display;

use crate::analytics::AssetSeries;
use crate::error::PortfolioError;
use crate::error::Result;

/// Optimization targets supported by [`super::PortfolioOptimizer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Objective {
  /// Maximize `(E[R_p] - r_f) / sigma_p`.
  MaxSharpe,
  /// Minimize `sigma_p`.
  MinVolatility,
}

impl Display for Objective {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Objective::MaxSharpe => write!(f, "max-sharpe"),
      Objective::MinVolatility => write!(f, "min-volatility"),
    }
  }
}

/// Expected return, volatility and Sharpe ratio of a weighted portfolio.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Performance {
  /// `w · mu` (annualized when `mu` is).
  pub expected_return: f64,
  /// `sqrt(w' Sigma w)`.
  pub volatility: f64,
  /// `(expected_return - risk_free) / volatility`.
  pub sharpe_ratio: f64,
}

/// Output of an optimization run.
#[derive(Clone, Debug, PartialEq)]
pub struct Allocation {
  pub objective: Objective,
  /// Ticker-keyed weights, each in `[0, 1]`, summing to one.
  pub weights: AssetSeries,
  pub expected_return: f64,
  pub volatility: f64,
  /// `None` for a riskless portfolio.
  pub sharpe_ratio: Option<f64>,
  /// Solver iterations spent.
  pub iterations: u64,
}

impl Allocation {
  /// Fails with [`crate::PortfolioError::DivisionUndefined`] when the
  /// portfolio is riskless.
  pub fn performance(&self) -> Result<Performance> {
    let sharpe_ratio = self
      .sharpe_ratio
      .ok_or_else(|| PortfolioError::zero_volatility(format!("{} portfolio", self.objective)))?;

    Ok(Performance {
      expected_return: self.expected_return,
      volatility: self.volatility,
      sharpe_ratio,
    })
  }
}

/// Both optimized portfolios of one asset universe.
#[derive(Clone, Debug, PartialEq)]
pub struct OptimalPortfolios {
  pub max_sharpe: Allocation,
  pub min_volatility: Allocation,
}
