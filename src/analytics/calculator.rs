//! # Asset Analytics
//!
//! $$
//! \mathrm{MDD}_a=\max_t \frac{\max_{s\le t}G_{s,a}-G_{t,a}}{\max_{s\le t}G_{s,a}}
//! $$
//!
//! Immutable return/risk calculator over a cleaned price panel.

use ndarray::Array1;
use ndarray::Array2;
use ndarray::ArrayView1;
use ndarray::ArrayView2;
use ndarray::Axis;
use ndarray_stats::CorrelationExt;
use tracing::debug;

use super::metrics::AssetMetrics;
use super::series::AssetSeries;
use super::series::TickerMatrix;
use crate::error::PortfolioError;
use crate::error::Result;
use crate::panel::position;
use crate::panel::PricePanel;
use crate::panel::ReturnSeries;
use crate::DEFAULT_RISK_FREE_RATE;
use crate::TRADING_DAYS;

/// Return/risk statistics of a price panel.
///
/// The daily return series and the annualized covariance matrix are computed
/// once at construction; every statistic is a read-only function of them.
#[derive(Clone, Debug)]
pub struct AssetAnalytics {
  returns: ReturnSeries,
  risk_free_rate: f64,
  /// `None` when fewer than two return rows exist.
  covariance: Option<Array2<f64>>,
}

impl AssetAnalytics {
  /// Derive daily returns from `panel` and cache them with the covariance matrix.
  pub fn new(panel: &PricePanel, risk_free_rate: f64) -> Result<Self> {
    if panel.len() < 2 {
      return Err(PortfolioError::insufficient("price panel", 2, panel.len()));
    }

    let returns = ReturnSeries::from_prices(panel);
    if returns.is_empty() {
      return Err(PortfolioError::insufficient("daily returns", 1, 0));
    }

    let covariance = if returns.len() >= 2 {
      Some(sample_covariance(returns.values())? * TRADING_DAYS)
    } else {
      None
    };

    debug!(
      assets = panel.n_assets(),
      periods = returns.len(),
      risk_free_rate,
      "computed daily returns"
    );

    Ok(Self {
      returns,
      risk_free_rate,
      covariance,
    })
  }

  /// [`AssetAnalytics::new`] with [`DEFAULT_RISK_FREE_RATE`].
  pub fn from_panel(panel: &PricePanel) -> Result<Self> {
    Self::new(panel, DEFAULT_RISK_FREE_RATE)
  }

  pub fn risk_free_rate(&self) -> f64 {
    self.risk_free_rate
  }

  pub fn tickers(&self) -> &[String] {
    self.returns.tickers()
  }

  pub fn n_assets(&self) -> usize {
    self.returns.tickers().len()
  }

  /// Cached daily simple returns.
  pub fn daily_returns(&self) -> &ReturnSeries {
    &self.returns
  }

  /// Cumulative growth factor per asset.
  pub fn cumulative_returns(&self) -> ReturnSeries {
    self.returns.cumulative_growth()
  }

  /// Mean daily return × 252.
  pub fn annualized_return(&self) -> AssetSeries {
    let values = self.returns.values();
    let mean = values.sum_axis(Axis(0)) / values.nrows() as f64;
    AssetSeries::from_parts(self.tickers(), mean * TRADING_DAYS)
  }

  /// Sample standard deviation of daily returns × √252.
  pub fn annualized_volatility(&self) -> Result<AssetSeries> {
    self.require_variance("annualized volatility")?;
    let std = self.returns.values().std_axis(Axis(0), 1.0);
    Ok(AssetSeries::from_parts(
      self.tickers(),
      std * TRADING_DAYS.sqrt(),
    ))
  }

  /// `(annualized return − r_f) / annualized volatility` per asset.
  ///
  /// Fails with [`PortfolioError::DivisionUndefined`] naming the first asset
  /// whose volatility is exactly zero.
  pub fn sharpe_ratio(&self) -> Result<AssetSeries> {
    let ret = self.annualized_return();
    let vol = self.annualized_volatility()?;

    let mut sharpe = Array1::zeros(self.n_assets());
    for (i, ticker) in self.tickers().iter().enumerate() {
      sharpe[i] = sharpe_of(ret.values()[i], vol.values()[i], self.risk_free_rate)
        .ok_or_else(|| PortfolioError::zero_volatility(ticker.as_str()))?;
    }

    Ok(AssetSeries::from_parts(self.tickers(), sharpe))
  }

  /// Sharpe ratio of a single asset.
  pub fn sharpe_ratio_of(&self, ticker: &str) -> Result<f64> {
    let i = position(self.tickers(), ticker)
      .ok_or_else(|| PortfolioError::UnknownTicker(ticker.to_string()))?;
    let ret = self.annualized_return().values()[i];
    let vol = self.annualized_volatility()?.values()[i];

    sharpe_of(ret, vol, self.risk_free_rate).ok_or_else(|| PortfolioError::zero_volatility(ticker))
  }

  /// Largest fall of the cumulative growth factor below its running maximum.
  ///
  /// The running maximum starts at the first growth factor and spans the whole
  /// history, so a loss in the very first period is not a drawdown.
  pub fn max_drawdown(&self) -> AssetSeries {
    let growth = self.cumulative_returns();
    let mdd = growth
      .values()
      .axis_iter(Axis(1))
      .map(column_drawdown)
      .collect::<Array1<f64>>();

    AssetSeries::from_parts(self.tickers(), mdd)
  }

  /// Pearson correlation of daily returns. Zero-variance assets yield `NaN`.
  pub fn correlation_matrix(&self) -> Result<TickerMatrix> {
    self.require_variance("correlation matrix")?;
    let corr = self
      .returns
      .values()
      .t()
      .pearson_correlation()
      .map_err(|_| PortfolioError::insufficient("correlation matrix", 2, self.returns.len()))?;

    Ok(TickerMatrix::from_parts(self.tickers(), corr))
  }

  /// Sample covariance of daily returns × 252.
  pub fn covariance_matrix(&self) -> Result<TickerMatrix> {
    Ok(TickerMatrix::from_parts(
      self.tickers(),
      self.covariance()?.to_owned(),
    ))
  }

  pub(crate) fn covariance(&self) -> Result<ArrayView2<'_, f64>> {
    self
      .covariance
      .as_ref()
      .map(|c| c.view())
      .ok_or_else(|| PortfolioError::insufficient("covariance matrix", 2, self.returns.len()))
  }

  /// One summary row per asset. Volatility and Sharpe are `None` when there
  /// are fewer than two return rows.
  pub fn asset_metrics(&self) -> Vec<AssetMetrics> {
    let growth = self.cumulative_returns();
    let ret = self.annualized_return();
    let vol = self.annualized_volatility().ok();
    let mdd = self.max_drawdown();
    let last = growth.values().nrows() - 1;

    self
      .tickers()
      .iter()
      .enumerate()
      .map(|(i, ticker)| {
        let volatility = vol.as_ref().map(|v| v.values()[i]);
        AssetMetrics {
          ticker: ticker.clone(),
          cumulative_return: growth.values()[[last, i]],
          annualized_return: ret.values()[i],
          annualized_volatility: volatility,
          sharpe_ratio: volatility.and_then(|v| sharpe_of(ret.values()[i], v, self.risk_free_rate)),
          max_drawdown: mdd.values()[i],
        }
      })
      .collect()
  }

  fn require_variance(&self, what: &'static str) -> Result<()> {
    if self.returns.len() < 2 {
      return Err(PortfolioError::insufficient(what, 2, self.returns.len()));
    }
    Ok(())
  }
}

fn sample_covariance(returns: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
  returns
    .t()
    .cov(1.0)
    .map_err(|_| PortfolioError::insufficient("covariance matrix", 2, returns.nrows()))
}

fn sharpe_of(ret: f64, vol: f64, risk_free_rate: f64) -> Option<f64> {
  if vol == 0.0 {
    None
  } else {
    Some((ret - risk_free_rate) / vol)
  }
}

fn column_drawdown(growth: ArrayView1<'_, f64>) -> f64 {
  let mut peak = f64::NEG_INFINITY;
  let mut worst = 0.0_f64;
  for &g in growth {
    peak = peak.max(g);
    worst = worst.max((peak - g) / peak);
  }
  worst
}
