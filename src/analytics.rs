//! # Analytics
//!
//! $$
//! \hat\mu_a = 252\,\bar r_a,\qquad \hat\sigma_a=\sqrt{252}\,s_a,\qquad \Sigma = 252\,\widehat{\operatorname{Cov}}(r)
//! $$
//!
//! Per-asset return/risk statistics and ticker-indexed matrices computed from a
//! cached daily return series.

pub mod calculator;
pub mod metrics;
pub mod series;

pub use calculator::AssetAnalytics;
pub use metrics::AssetMetrics;
pub use series::AssetSeries;
pub use series::TickerMatrix;
