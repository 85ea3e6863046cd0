//! # Asset Metrics
//!
//! Flat per-ticker summary row, the shape persistence and dashboards consume.

/// Summary statistics for one asset.
#[derive(Clone, Debug, PartialEq)]
pub struct AssetMetrics {
  pub ticker: String,
  /// Final cumulative growth factor.
  pub cumulative_return: f64,
  pub annualized_return: f64,
  /// `None` with fewer than two return rows.
  pub annualized_volatility: Option<f64>,
  /// `None` when the volatility is zero or unavailable.
  pub sharpe_ratio: Option<f64>,
  pub max_drawdown: f64,
}
