//! # Errors
//!
//! Typed failures of the analytics and optimization pipeline.

use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised by panel construction, statistics and optimization.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PortfolioError {
  /// Fewer priced periods than the computation needs.
  #[error("insufficient data: {what} needs at least {required} rows, got {available}")]
  InsufficientData {
    what: &'static str,
    required: usize,
    available: usize,
  },

  /// A denominator (volatility) is exactly zero.
  #[error("division undefined: zero volatility for {subject}")]
  DivisionUndefined { subject: String },

  /// The constrained solver did not report success.
  #[error("optimization failed: {0}")]
  OptimizationFailed(String),

  /// Price matrix shape does not match the dates/tickers supplied with it.
  #[error("shape mismatch: expected {expected:?} (dates, tickers), got {found:?}")]
  ShapeMismatch {
    expected: (usize, usize),
    found: (usize, usize),
  },

  #[error("duplicate ticker: {0}")]
  DuplicateTicker(String),

  /// Panel dates must be strictly increasing.
  #[error("dates are not strictly increasing at {0}")]
  UnorderedDates(NaiveDate),

  #[error("non-positive price {price} for {ticker} on {date}")]
  NonPositivePrice {
    ticker: String,
    date: NaiveDate,
    price: f64,
  },

  /// Vector or matrix lengths disagree with the number of assets.
  #[error("dimension mismatch: expected {expected}, got {found}")]
  DimensionMismatch { expected: usize, found: usize },

  #[error("unknown ticker: {0}")]
  UnknownTicker(String),
}

impl PortfolioError {
  pub(crate) fn insufficient(what: &'static str, required: usize, available: usize) -> Self {
    Self::InsufficientData {
      what,
      required,
      available,
    }
  }

  pub(crate) fn zero_volatility(subject: impl Into<String>) -> Self {
    Self::DivisionUndefined {
      subject: subject.into(),
    }
  }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, PortfolioError>;
