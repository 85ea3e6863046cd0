use std::hint::black_box;

use criterion::criterion_group;
use criterion::criterion_main;
use criterion::BenchmarkId;
use criterion::Criterion;
use ndarray::Array1;
use ndarray::Array2;
use portfolio_rs::PortfolioOptimizer;

/// One-factor universe: `Sigma = beta beta' * 0.02 + diag(idio)`.
fn universe(n: usize) -> PortfolioOptimizer {
  let tickers = (0..n).map(|i| format!("A{i:03}")).collect();
  let beta = Array1::from_shape_fn(n, |i| 0.6 + 0.8 * (i as f64) / (n as f64));
  let idio = Array1::from_shape_fn(n, |i| 0.01 + 0.03 * ((i * 7 % n) as f64) / (n as f64));
  let mu = Array1::from_shape_fn(n, |i| 0.03 + 0.1 * beta[i] + 0.02 * ((i * 3 % 5) as f64) / 5.0);

  let mut cov = Array2::from_shape_fn((n, n), |(i, j)| 0.02 * beta[i] * beta[j]);
  cov.diag_mut().zip_mut_with(&idio, |c, d| *c += d);

  PortfolioOptimizer::from_parts(tickers, mu, cov, 0.03).unwrap()
}

fn bench_objectives(c: &mut Criterion) {
  let mut group = c.benchmark_group("Optimizer");

  for &n in &[5, 20, 100] {
    let optimizer = universe(n);

    group.bench_with_input(BenchmarkId::new("max_sharpe", n), &optimizer, |b, opt| {
      b.iter(|| black_box(opt.maximize_sharpe().unwrap()));
    });

    group.bench_with_input(BenchmarkId::new("min_volatility", n), &optimizer, |b, opt| {
      b.iter(|| black_box(opt.minimize_volatility().unwrap()));
    });

    group.bench_with_input(BenchmarkId::new("both", n), &optimizer, |b, opt| {
      b.iter(|| black_box(opt.optimal_portfolios().unwrap()));
    });
  }

  group.finish();
}

criterion_group!(benches, bench_objectives);
criterion_main!(benches);
