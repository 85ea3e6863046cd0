//! # Optimize
//!
//! $$
//! \sigma_p^2 = \mathbf{w}^\top \Sigma \mathbf{w},\qquad \mathbf{w}\in\Delta=\{\mathbf{w}\ge 0,\ \mathbf{1}^\top\mathbf{w}=1\}
//! $$
//!
//! Long-only, fully-invested mean-variance optimization and portfolio
//! performance evaluation.

pub mod objective;
pub mod optimizer;
pub mod projected;
pub mod solver;
pub mod types;

pub use objective::FiniteDifference;
pub use objective::NegativeSharpe;
pub use objective::PortfolioVolatility;
pub use optimizer::PortfolioOptimizer;
pub use projected::ProjectedGradient;
pub use projected::SpectralProjection;
pub use solver::ConstrainedSolver;
pub use solver::Constraints;
pub use solver::SmoothObjective;
pub use solver::SolverConfig;
pub use solver::SolverReport;
pub use solver::Termination;
pub use types::Allocation;
pub use types::Objective;
pub use types::OptimalPortfolios;
pub use types::Performance;
