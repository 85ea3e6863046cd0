//! # Ticker-indexed containers
//!
//! $$
//! a \mapsto x_a,\qquad (a,b)\mapsto M_{ab}
//! $$
//!
//! Scalar-per-asset mappings and square ticker × ticker matrices.

use ndarray::Array1;
use ndarray::Array2;
use ndarray::ArrayView1;
use ndarray::ArrayView2;

use crate::error::PortfolioError;
use crate::error::Result;
use crate::panel::position;

/// One scalar per ticker, in panel column order.
#[derive(Clone, Debug, PartialEq)]
pub struct AssetSeries {
  tickers: Vec<String>,
  values: Array1<f64>,
}

impl AssetSeries {
  pub fn new(tickers: Vec<String>, values: Array1<f64>) -> Result<Self> {
    if tickers.len() != values.len() {
      return Err(PortfolioError::DimensionMismatch {
        expected: tickers.len(),
        found: values.len(),
      });
    }
    Ok(Self { tickers, values })
  }

  pub(crate) fn from_parts(tickers: &[String], values: Array1<f64>) -> Self {
    debug_assert_eq!(tickers.len(), values.len());
    Self {
      tickers: tickers.to_vec(),
      values,
    }
  }

  /// Value for `ticker`, if present.
  pub fn get(&self, ticker: &str) -> Option<f64> {
    position(&self.tickers, ticker).map(|i| self.values[i])
  }

  pub fn tickers(&self) -> &[String] {
    &self.tickers
  }

  pub fn values(&self) -> ArrayView1<'_, f64> {
    self.values.view()
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  pub fn sum(&self) -> f64 {
    self.values.sum()
  }

  /// `(ticker, value)` pairs in column order.
  pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
    self
      .tickers
      .iter()
      .map(String::as_str)
      .zip(self.values.iter().copied())
  }
}

/// Square matrix indexed by ticker on both axes.
#[derive(Clone, Debug, PartialEq)]
pub struct TickerMatrix {
  tickers: Vec<String>,
  values: Array2<f64>,
}

impl TickerMatrix {
  pub fn new(tickers: Vec<String>, values: Array2<f64>) -> Result<Self> {
    let n = tickers.len();
    if values.dim() != (n, n) {
      return Err(PortfolioError::DimensionMismatch {
        expected: n,
        found: if values.nrows() != n {
          values.nrows()
        } else {
          values.ncols()
        },
      });
    }
    Ok(Self { tickers, values })
  }

  pub(crate) fn from_parts(tickers: &[String], values: Array2<f64>) -> Self {
    Self {
      tickers: tickers.to_vec(),
      values,
    }
  }

  /// Entry at (`row`, `col`).
  pub fn get(&self, row: &str, col: &str) -> Option<f64> {
    let i = position(&self.tickers, row)?;
    let j = position(&self.tickers, col)?;
    Some(self.values[[i, j]])
  }

  pub fn tickers(&self) -> &[String] {
    &self.tickers
  }

  pub fn values(&self) -> ArrayView2<'_, f64> {
    self.values.view()
  }

  pub fn diagonal(&self) -> AssetSeries {
    AssetSeries::from_parts(&self.tickers, self.values.diag().to_owned())
  }

  /// Symmetric within `tol` relative to the larger magnitude of each pair.
  ///
  /// `NaN` pairs (undefined correlation) count as symmetric.
  pub fn is_symmetric(&self, tol: f64) -> bool {
    let n = self.tickers.len();
    (0..n).all(|i| {
      (i + 1..n).all(|j| {
        let (a, b) = (self.values[[i, j]], self.values[[j, i]]);
        (a.is_nan() && b.is_nan()) || (a - b).abs() <= tol * a.abs().max(b.abs()).max(1.0)
      })
    })
  }
}
