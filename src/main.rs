use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use portfolio_rs::io::read_price_csv;
use portfolio_rs::io::write_price_csv;
use portfolio_rs::optimize::ProjectedGradient;
use portfolio_rs::optimize::SolverConfig;
use portfolio_rs::Allocation;
use portfolio_rs::AssetAnalytics;
use portfolio_rs::PortfolioOptimizer;
use portfolio_rs::TickerMatrix;
use portfolio_rs::DEFAULT_RISK_FREE_RATE;
use prettytable::row;
use prettytable::Cell;
use prettytable::Row;
use prettytable::Table;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Return/risk statistics and optimal long-only allocations for a price CSV.
#[derive(Parser, Debug)]
#[command(name = "portfolio-rs", version, about)]
struct Args {
  /// CSV with a `date` column followed by one adjusted-close column per ticker.
  prices: PathBuf,

  /// Annualized risk-free rate.
  #[arg(long, default_value_t = DEFAULT_RISK_FREE_RATE)]
  risk_free_rate: f64,

  /// Projected-gradient residual at which the solver stops.
  #[arg(long, default_value_t = SolverConfig::default().tolerance)]
  tolerance: f64,

  /// Solver iteration cap.
  #[arg(long, default_value_t = SolverConfig::default().max_iters)]
  max_iters: u64,

  /// Write the cleaned price panel to this CSV.
  #[arg(long)]
  save: Option<PathBuf>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
    .init();

  let args = Args::parse();

  let panel = read_price_csv(&args.prices)?;
  info!(
    rows = panel.len(),
    assets = panel.n_assets(),
    "loaded price panel"
  );

  let analytics = AssetAnalytics::new(&panel, args.risk_free_rate)?;
  print_metrics(&analytics);

  println!("\nCorrelation matrix");
  print_matrix(analytics.correlation_matrix());
  println!("\nCovariance matrix (annualized)");
  print_matrix(analytics.covariance_matrix());

  match PortfolioOptimizer::new(&analytics) {
    Ok(optimizer) => {
      let optimizer = optimizer.with_solver(ProjectedGradient::new(SolverConfig {
        tolerance: args.tolerance,
        max_iters: args.max_iters,
      }));

      println!("\nEqual-weight portfolio");
      match optimizer.performance_of(&optimizer.equal_weights()) {
        Ok(perf) => print_performance(perf.expected_return, perf.volatility, Some(perf.sharpe_ratio)),
        Err(err) => println!("  n/a ({err})"),
      }

      print_allocation("Maximum Sharpe portfolio", optimizer.maximize_sharpe());
      print_allocation("Minimum volatility portfolio", optimizer.minimize_volatility());
    }
    Err(err) => println!("\nOptimization failed: {err}"),
  }

  if let Some(out) = &args.save {
    write_price_csv(&panel, out)?;
    info!(path = %out.display(), "saved price panel");
  }

  Ok(())
}

fn print_metrics(analytics: &AssetAnalytics) {
  let mut table = Table::new();
  table.set_titles(row![
    "Ticker",
    "Cumulative",
    "Ann. return",
    "Ann. volatility",
    "Sharpe",
    "Max drawdown"
  ]);

  for m in analytics.asset_metrics() {
    table.add_row(row![
      m.ticker,
      format!("{:.4}", m.cumulative_return),
      format!("{:.2}%", m.annualized_return * 100.0),
      or_na(m.annualized_volatility, |v| format!("{:.2}%", v * 100.0)),
      or_na(m.sharpe_ratio, |s| format!("{s:.4}")),
      format!("{:.2}%", m.max_drawdown * 100.0)
    ]);
  }

  table.printstd();
}

fn or_na(value: Option<f64>, fmt: impl Fn(f64) -> String) -> String {
  value.map_or_else(|| "n/a".to_string(), fmt)
}

fn print_matrix(matrix: portfolio_rs::Result<TickerMatrix>) {
  let matrix = match matrix {
    Ok(matrix) => matrix,
    Err(err) => {
      println!("  n/a ({err})");
      return;
    }
  };

  let mut table = Table::new();

  let mut titles = vec![Cell::new("")];
  titles.extend(matrix.tickers().iter().map(|t| Cell::new(t)));
  table.set_titles(Row::new(titles));

  for (ticker, values) in matrix.tickers().iter().zip(matrix.values().outer_iter()) {
    let mut cells = vec![Cell::new(ticker)];
    cells.extend(values.iter().map(|v| Cell::new(&format!("{v:.4}"))));
    table.add_row(Row::new(cells));
  }

  table.printstd();
}

fn print_performance(expected_return: f64, volatility: f64, sharpe_ratio: Option<f64>) {
  println!(
    "  expected return {:.2}%  volatility {:.2}%  sharpe {}",
    expected_return * 100.0,
    volatility * 100.0,
    or_na(sharpe_ratio, |s| format!("{s:.4}"))
  );
}

fn print_allocation(title: &str, allocation: portfolio_rs::Result<Allocation>) {
  let allocation = match allocation {
    Ok(allocation) => allocation,
    Err(err) => {
      println!("\n{title}\nOptimization failed: {err}");
      return;
    }
  };

  println!("\n{title} ({} iterations)", allocation.iterations);

  let mut table = Table::new();
  table.set_titles(row!["Ticker", "Weight"]);
  for (ticker, w) in allocation.weights.iter() {
    let rounded = (w * 1e4).round() / 1e4;
    table.add_row(row![ticker, format!("{:.2}%", rounded * 100.0)]);
  }
  table.printstd();

  print_performance(
    allocation.expected_return,
    allocation.volatility,
    allocation.sharpe_ratio,
  );
}
