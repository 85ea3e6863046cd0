//! # portfolio-rs
//!
//! $$
//! \mathbf{w}^\*=\arg\max_{\mathbf{w}\in\Delta} \frac{\mathbf{w}^\top\mu-r_f}{\sqrt{\mathbf{w}^\top\Sigma\mathbf{w}}}
//! $$
//!
//! Per-asset return/risk statistics from a historical price panel and a
//! long-only, fully-invested mean-variance optimizer built on top of them.

pub mod analytics;
pub mod error;
pub mod io;
pub mod optimize;
pub mod panel;

pub use analytics::AssetAnalytics;
pub use analytics::AssetMetrics;
pub use analytics::AssetSeries;
pub use analytics::TickerMatrix;
pub use error::PortfolioError;
pub use error::Result;
pub use optimize::Allocation;
pub use optimize::OptimalPortfolios;
pub use optimize::Performance;
pub use optimize::PortfolioOptimizer;
pub use panel::PricePanel;
pub use panel::ReturnSeries;

/// Trading days used to annualize daily statistics.
pub const TRADING_DAYS: f64 = 252.0;

/// Annualized risk-free rate used when none is supplied.
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.03;
