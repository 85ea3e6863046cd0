//! # Portfolio Objectives
//!
//! $$
//! -\nabla S(\mathbf w)=-\frac{\mu}{\sigma_p}+\frac{(\mu^\top\mathbf w-r_f)\,\Sigma\mathbf w}{\sigma_p^3},
//! \qquad \nabla\sigma_p(\mathbf w)=\frac{\Sigma\mathbf w}{\sigma_p}
//! $$
//!
//! argmin cost functions with analytic gradients for the two optimization
//! targets, plus a forward-difference gradient for cost-only problems.

use anyhow::anyhow;
use argmin::core::CostFunction;
use argmin::core::Gradient;
use ndarray::Array1;
use ndarray::ArrayView1;
use ndarray::ArrayView2;

/// `(Sigma w, w' Sigma w)`, with rounding below zero clipped.
pub(crate) fn quadratic_form(w: ArrayView1<'_, f64>, cov: ArrayView2<'_, f64>) -> (Array1<f64>, f64) {
  let sigma_w = cov.dot(&w);
  let variance = w.dot(&sigma_w).max(0.0);
  (sigma_w, variance)
}

/// `(w · mu, Sigma w, w' Sigma w)` in one pass over the covariance matrix.
pub(crate) fn moments(
  w: ArrayView1<'_, f64>,
  mu: ArrayView1<'_, f64>,
  cov: ArrayView2<'_, f64>,
) -> (f64, Array1<f64>, f64) {
  let (sigma_w, variance) = quadratic_form(w, cov);
  (w.dot(&mu), sigma_w, variance)
}

/// Negative Sharpe ratio of the portfolio.
#[derive(Clone, Debug)]
pub struct NegativeSharpe<'a> {
  mu: ArrayView1<'a, f64>,
  cov: ArrayView2<'a, f64>,
  risk_free_rate: f64,
}

impl<'a> NegativeSharpe<'a> {
  pub fn new(mu: ArrayView1<'a, f64>, cov: ArrayView2<'a, f64>, risk_free_rate: f64) -> Self {
    Self {
      mu,
      cov,
      risk_free_rate,
    }
  }
}

impl CostFunction for NegativeSharpe<'_> {
  type Param = Vec<f64>;
  type Output = f64;

  fn cost(&self, x: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
    let (ret, _, variance) = moments(ArrayView1::from(x.as_slice()), self.mu, self.cov);
    if variance == 0.0 {
      return Err(anyhow!("portfolio volatility is zero"));
    }
    Ok(-(ret - self.risk_free_rate) / variance.sqrt())
  }
}

impl Gradient for NegativeSharpe<'_> {
  type Param = Vec<f64>;
  type Gradient = Vec<f64>;

  fn gradient(&self, x: &Self::Param) -> Result<Self::Gradient, argmin::core::Error> {
    let (ret, sigma_w, variance) = moments(ArrayView1::from(x.as_slice()), self.mu, self.cov);
    if variance == 0.0 {
      return Err(anyhow!("portfolio volatility is zero"));
    }
    let vol = variance.sqrt();
    let excess = ret - self.risk_free_rate;
    let grad = &sigma_w * (excess / (variance * vol)) - &self.mu / vol;
    Ok(grad.to_vec())
  }
}

/// Portfolio volatility `sqrt(w' Sigma w)`.
#[derive(Clone, Debug)]
pub struct PortfolioVolatility<'a> {
  cov: ArrayView2<'a, f64>,
}

impl<'a> PortfolioVolatility<'a> {
  pub fn new(cov: ArrayView2<'a, f64>) -> Self {
    Self { cov }
  }
}

impl CostFunction for PortfolioVolatility<'_> {
  type Param = Vec<f64>;
  type Output = f64;

  fn cost(&self, x: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
    let (_, variance) = quadratic_form(ArrayView1::from(x.as_slice()), self.cov);
    Ok(variance.sqrt())
  }
}

impl Gradient for PortfolioVolatility<'_> {
  type Param = Vec<f64>;
  type Gradient = Vec<f64>;

  /// Zero at a riskless portfolio, which is the global minimum of `sigma_p`.
  fn gradient(&self, x: &Self::Param) -> Result<Self::Gradient, argmin::core::Error> {
    let (sigma_w, variance) = quadratic_form(ArrayView1::from(x.as_slice()), self.cov);
    if variance == 0.0 {
      return Ok(vec![0.0; x.len()]);
    }
    Ok((sigma_w / variance.sqrt()).to_vec())
  }
}

/// Supplies a forward-difference gradient for a cost-only problem.
#[derive(Clone, Debug)]
pub struct FiniteDifference<P> {
  inner: P,
  eps: f64,
}

impl<P> FiniteDifference<P> {
  pub fn new(inner: P) -> Self {
    Self { inner, eps: 1e-8 }
  }

  pub fn with_eps(mut self, eps: f64) -> Self {
    self.eps = eps;
    self
  }
}

impl<P> CostFunction for FiniteDifference<P>
where
  P: CostFunction<Param = Vec<f64>, Output = f64>,
{
  type Param = Vec<f64>;
  type Output = f64;

  fn cost(&self, x: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
    self.inner.cost(x)
  }
}

impl<P> Gradient for FiniteDifference<P>
where
  P: CostFunction<Param = Vec<f64>, Output = f64>,
{
  type Param = Vec<f64>;
  type Gradient = Vec<f64>;

  fn gradient(&self, x: &Self::Param) -> Result<Self::Gradient, argmin::core::Error> {
    let f0 = self.inner.cost(x)?;
    let mut grad = vec![0.0; x.len()];
    let mut bumped = x.clone();

    for i in 0..x.len() {
      bumped[i] += self.eps;
      grad[i] = (self.inner.cost(&bumped)? - f0) / self.eps;
      bumped[i] = x[i];
    }

    Ok(grad)
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_relative_eq;
  use ndarray::array;

  use super::*;

  #[test]
  fn sharpe_gradient_matches_finite_difference() {
    let mu = array![0.08, 0.12, 0.05];
    let cov = array![[0.04, 0.006, 0.0], [0.006, 0.09, 0.01], [0.0, 0.01, 0.02]];
    let problem = NegativeSharpe::new(mu.view(), cov.view(), 0.02);
    let w = vec![0.5, 0.3, 0.2];

    let analytic = problem.gradient(&w).unwrap();
    let numeric = FiniteDifference::new(problem.clone()).gradient(&w).unwrap();
    for (a, n) in analytic.iter().zip(&numeric) {
      assert_relative_eq!(*a, *n, epsilon = 1e-5);
    }
  }

  #[test]
  fn volatility_gradient_matches_finite_difference() {
    let cov = array![[0.04, 0.006], [0.006, 0.09]];
    let problem = PortfolioVolatility::new(cov.view());
    let w = vec![0.7, 0.3];

    let analytic = problem.gradient(&w).unwrap();
    let numeric = FiniteDifference::new(problem.clone()).gradient(&w).unwrap();
    for (a, n) in analytic.iter().zip(&numeric) {
      assert_relative_eq!(*a, *n, epsilon = 1e-5);
    }
  }

  #[test]
  fn volatility_and_sharpe_share_the_quadratic_form() {
    let mu = array![0.08, 0.12];
    let cov = array![[0.04, 0.006], [0.006, 0.09]];
    let w = vec![0.25, 0.75];

    let (ret, sigma_w, variance) = moments(ArrayView1::from(w.as_slice()), mu.view(), cov.view());
    assert_relative_eq!(ret, 0.11, epsilon = 1e-12);
    assert_relative_eq!(sigma_w[0], 0.0145, epsilon = 1e-12);
    assert_relative_eq!(sigma_w[1], 0.069, epsilon = 1e-12);
    assert_relative_eq!(variance, 0.055375, epsilon = 1e-12);

    let vol = PortfolioVolatility::new(cov.view()).cost(&w).unwrap();
    assert_relative_eq!(vol, variance.sqrt(), epsilon = 1e-15);
    let sharpe = NegativeSharpe::new(mu.view(), cov.view(), 0.0).cost(&w).unwrap();
    assert_relative_eq!(sharpe, -ret / vol, epsilon = 1e-12);
  }

  #[test]
  fn riskless_portfolio() {
    let mu = array![0.05];
    let cov = array![[0.0]];

    assert!(NegativeSharpe::new(mu.view(), cov.view(), 0.0)
      .cost(&vec![1.0])
      .is_err());

    let vol = PortfolioVolatility::new(cov.view());
    assert_eq!(vol.cost(&vec![1.0]).unwrap(), 0.0);
    assert_eq!(vol.gradient(&vec![1.0]).unwrap(), vec![0.0]);
  }
}
