//! # Price Panel
//!
//! $$
//! r_{t,a}=\frac{P_{t,a}}{P_{t-1,a}}-1,\qquad G_{t,a}=\prod_{s\le t}(1+r_{s,a})
//! $$
//!
//! Date-indexed price tables and the return frames derived from them.

use std::collections::HashSet;

use chrono::NaiveDate;
use ndarray::s;
use ndarray::Array2;
use ndarray::ArrayView1;
use ndarray::ArrayView2;
use ndarray::Axis;

use crate::error::PortfolioError;
use crate::error::Result;

/// Adjusted close prices, one row per date and one column per ticker.
///
/// Missing observations are stored as `NaN`. Rows where every ticker is
/// missing are dropped at construction.
#[derive(Clone, Debug, PartialEq)]
pub struct PricePanel {
  dates: Vec<NaiveDate>,
  tickers: Vec<String>,
  prices: Array2<f64>,
}

impl PricePanel {
  /// Build a panel, validating shape, ticker uniqueness, date order and prices.
  ///
  /// A present price must be a finite positive number.
  pub fn new(dates: Vec<NaiveDate>, tickers: Vec<String>, prices: Array2<f64>) -> Result<Self> {
    let expected = (dates.len(), tickers.len());
    if prices.dim() != expected {
      return Err(PortfolioError::ShapeMismatch {
        expected,
        found: prices.dim(),
      });
    }

    let mut seen = HashSet::with_capacity(tickers.len());
    for ticker in &tickers {
      if !seen.insert(ticker.as_str()) {
        return Err(PortfolioError::DuplicateTicker(ticker.clone()));
      }
    }

    for pair in dates.windows(2) {
      if pair[1] <= pair[0] {
        return Err(PortfolioError::UnorderedDates(pair[1]));
      }
    }

    for ((row, col), &price) in prices.indexed_iter() {
      if !price.is_nan() && !(price.is_finite() && price > 0.0) {
        return Err(PortfolioError::NonPositivePrice {
          ticker: tickers[col].clone(),
          date: dates[row],
          price,
        });
      }
    }

    let keep: Vec<usize> = (0..dates.len())
      .filter(|&i| prices.row(i).iter().any(|p| !p.is_nan()))
      .collect();

    if keep.len() == dates.len() {
      return Ok(Self {
        dates,
        tickers,
        prices,
      });
    }

    Ok(Self {
      dates: keep.iter().map(|&i| dates[i]).collect(),
      prices: prices.select(Axis(0), &keep),
      tickers,
    })
  }

  pub fn dates(&self) -> &[NaiveDate] {
    &self.dates
  }

  pub fn tickers(&self) -> &[String] {
    &self.tickers
  }

  /// Borrow the price matrix (dates × tickers).
  pub fn prices(&self) -> ArrayView2<'_, f64> {
    self.prices.view()
  }

  /// Number of dated rows.
  pub fn len(&self) -> usize {
    self.dates.len()
  }

  pub fn is_empty(&self) -> bool {
    self.dates.is_empty()
  }

  pub fn n_assets(&self) -> usize {
    self.tickers.len()
  }

  /// Price history of one ticker.
  pub fn column(&self, ticker: &str) -> Option<ArrayView1<'_, f64>> {
    position(&self.tickers, ticker).map(|j| self.prices.column(j))
  }
}

/// Date-indexed frame of per-ticker values derived from a [`PricePanel`].
///
/// Holds daily simple returns or, after [`ReturnSeries::cumulative_growth`],
/// cumulative growth factors.
#[derive(Clone, Debug, PartialEq)]
pub struct ReturnSeries {
  dates: Vec<NaiveDate>,
  tickers: Vec<String>,
  values: Array2<f64>,
}

impl ReturnSeries {
  /// Period-over-period relative change of every column.
  ///
  /// The first date has no prior price and never appears. Any row holding an
  /// undefined return (missing price today or yesterday) is dropped whole.
  pub fn from_prices(panel: &PricePanel) -> Self {
    if panel.len() < 2 {
      return Self {
        dates: Vec::new(),
        tickers: panel.tickers.clone(),
        values: Array2::zeros((0, panel.n_assets())),
      };
    }

    let prev = panel.prices.slice(s![..-1, ..]);
    let next = panel.prices.slice(s![1.., ..]);
    let raw = &next / &prev - 1.0;

    let keep: Vec<usize> = raw
      .outer_iter()
      .enumerate()
      .filter(|(_, row)| row.iter().all(|r| r.is_finite()))
      .map(|(i, _)| i)
      .collect();

    Self {
      dates: keep.iter().map(|&i| panel.dates[i + 1]).collect(),
      tickers: panel.tickers.clone(),
      values: raw.select(Axis(0), &keep),
    }
  }

  /// Running product of `1 + r` down each column.
  ///
  /// The first row is the first period's growth factor, not 1.
  pub fn cumulative_growth(&self) -> Self {
    let mut values = self.values.mapv(|r| 1.0 + r);
    values.accumulate_axis_inplace(Axis(0), |&prev, curr| *curr *= prev);

    Self {
      dates: self.dates.clone(),
      tickers: self.tickers.clone(),
      values,
    }
  }

  pub fn dates(&self) -> &[NaiveDate] {
    &self.dates
  }

  pub fn tickers(&self) -> &[String] {
    &self.tickers
  }

  /// Borrow the value matrix (dates × tickers).
  pub fn values(&self) -> ArrayView2<'_, f64> {
    self.values.view()
  }

  pub fn len(&self) -> usize {
    self.dates.len()
  }

  pub fn is_empty(&self) -> bool {
    self.dates.is_empty()
  }

  pub fn column(&self, ticker: &str) -> Option<ArrayView1<'_, f64>> {
    position(&self.tickers, ticker).map(|j| self.values.column(j))
  }
}

pub(crate) fn position(tickers: &[String], ticker: &str) -> Option<usize> {
  tickers.iter().position(|t| t == ticker)
}

#[cfg(test)]
pub(crate) mod tests {
  use approx::assert_relative_eq;
  use ndarray::array;

  use super::*;

  pub(crate) fn dates(n: usize) -> Vec<NaiveDate> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    (0..n as u64)
      .map(|i| start + chrono::Days::new(i))
      .collect()
  }

  pub(crate) fn tickers(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn rejects_shape_mismatch() {
    let err = PricePanel::new(dates(2), tickers(&["A"]), array![[1.0, 2.0], [1.0, 2.0]]);
    assert!(matches!(err, Err(PortfolioError::ShapeMismatch { .. })));
  }

  #[test]
  fn rejects_duplicate_tickers_and_bad_dates() {
    let dup = PricePanel::new(dates(1), tickers(&["A", "A"]), array![[1.0, 2.0]]);
    assert_eq!(dup, Err(PortfolioError::DuplicateTicker("A".into())));

    let mut d = dates(2);
    d.swap(0, 1);
    let unordered = PricePanel::new(d, tickers(&["A"]), array![[1.0], [2.0]]);
    assert!(matches!(unordered, Err(PortfolioError::UnorderedDates(_))));
  }

  #[test]
  fn rejects_non_positive_prices() {
    let err = PricePanel::new(dates(2), tickers(&["A"]), array![[1.0], [0.0]]);
    assert!(matches!(
      err,
      Err(PortfolioError::NonPositivePrice { ref ticker, .. }) if ticker == "A"
    ));
  }

  #[test]
  fn drops_fully_missing_rows() {
    let prices = array![[100.0, 50.0], [f64::NAN, f64::NAN], [110.0, f64::NAN]];
    let panel = PricePanel::new(dates(3), tickers(&["A", "B"]), prices).unwrap();

    assert_eq!(panel.len(), 2);
    assert_eq!(panel.dates()[1], dates(3)[2]);
    assert!(panel.column("B").unwrap()[1].is_nan());
  }

  #[test]
  fn returns_have_one_fewer_row() {
    let prices = array![[100.0, 100.0], [110.0, 100.0], [121.0, 100.0]];
    let panel = PricePanel::new(dates(3), tickers(&["A", "B"]), prices).unwrap();
    let returns = ReturnSeries::from_prices(&panel);

    assert_eq!(returns.len(), panel.len() - 1);
    assert_eq!(returns.dates(), &panel.dates()[1..]);
    let a = returns.column("A").unwrap();
    assert_relative_eq!(a[0], 0.10, epsilon = 1e-12);
    assert_relative_eq!(a[1], 0.10, epsilon = 1e-12);
    assert!(returns.column("B").unwrap().iter().all(|&r| r == 0.0));
  }

  #[test]
  fn returns_drop_rows_with_undefined_values() {
    let prices = array![[100.0, 10.0], [101.0, f64::NAN], [102.0, 11.0], [103.0, 12.0]];
    let panel = PricePanel::new(dates(4), tickers(&["A", "B"]), prices).unwrap();
    let returns = ReturnSeries::from_prices(&panel);

    assert_eq!(returns.len(), 1);
    assert_eq!(returns.dates()[0], dates(4)[3]);
  }

  #[test]
  fn cumulative_growth_matches_running_product() {
    let prices = array![[100.0], [95.0], [104.5], [99.0]];
    let panel = PricePanel::new(dates(4), tickers(&["A"]), prices).unwrap();
    let returns = ReturnSeries::from_prices(&panel);
    let growth = returns.cumulative_growth();

    let mut acc = 1.0;
    for (r, g) in returns.column("A").unwrap().iter().zip(growth.column("A").unwrap()) {
      acc *= 1.0 + r;
      assert_eq!(acc, *g);
    }
    assert_relative_eq!(growth.column("A").unwrap()[2], 0.99, epsilon = 1e-12);
  }

  #[test]
  fn single_row_panel_has_no_returns() {
    let panel = PricePanel::new(dates(1), tickers(&["A"]), array![[100.0]]).unwrap();
    assert!(ReturnSeries::from_prices(&panel).is_empty());
  }
}
