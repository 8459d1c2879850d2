use std::collections::BTreeMap;

use anyhow::Context;
use chrono::NaiveDate;
use portfolio_rs::PortfolioEngine;
use portfolio_rs::PriceHistory;
use portfolio_rs::PriceSeries;
use portfolio_rs::StrategyConfig;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::Distribution;
use rand_distr::Normal;
use tracing_subscriber::EnvFilter;

/// `(symbol, drift, volatility, market cap in bn)`
const UNIVERSE: [(&str, f64, f64, f64); 6] = [
  ("ALPHA", 0.11, 0.22, 850.0),
  ("BRAVO", 0.07, 0.14, 420.0),
  ("CHARLIE", 0.16, 0.38, 120.0),
  ("DELTA", 0.04, 0.09, 610.0),
  ("ECHO", 0.09, 0.27, 75.0),
  ("FOXTROT", -0.02, 0.30, 40.0),
];

const TRADING_DAYS: usize = 504;

/// Euler scheme for `dS = mu S dt + sigma S dW` on a daily grid.
fn simulate_gbm(rng: &mut StdRng, n: usize, s0: f64, mu: f64, sigma: f64) -> anyhow::Result<Vec<f64>> {
  let dt: f64 = 1.0 / 252.0;
  let gn = Normal::new(0.0, dt.sqrt())?;

  let mut path = vec![s0; n];
  for i in 1..n {
    let prev = path[i - 1];
    let next = prev + mu * prev * dt + sigma * prev * gn.sample(rng);
    path[i] = next.max(prev * 0.01);
  }
  Ok(path)
}

fn simulated_history(seed: u64) -> anyhow::Result<PriceHistory> {
  let mut rng = StdRng::seed_from_u64(seed);
  let start = NaiveDate::from_ymd_opt(2023, 1, 2).context("invalid start date")?;

  let mut assets = BTreeMap::new();
  let mut caps = BTreeMap::new();
  for (symbol, mu, sigma, cap) in UNIVERSE {
    let path = simulate_gbm(&mut rng, TRADING_DAYS, 100.0, mu, sigma)?;
    assets.insert(symbol.to_string(), PriceSeries::from_prices(start, &path));
    caps.insert(symbol.to_string(), cap);
  }
  let benchmark = simulate_gbm(&mut rng, TRADING_DAYS, 100.0, 0.08, 0.16)?;

  Ok(
    PriceHistory::new(assets)
      .with_market_caps(caps)
      .with_benchmark(PriceSeries::from_prices(start, &benchmark)),
  )
}

fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let config = match std::env::args().nth(1) {
    Some(path) => StrategyConfig::from_file(&path).with_context(|| format!("loading {path}"))?,
    None => StrategyConfig::default(),
  };

  let engine = PortfolioEngine::new(config)?;
  let history = simulated_history(7)?;
  let allocation = engine.optimize(&history)?;

  println!("\nWeights");
  for (symbol, weight) in allocation.weights.iter() {
    println!("  {symbol:<8} {:>7.2}%", weight * 100.0);
  }

  let c = &allocation.constraint_report;
  println!(
    "\nConstraints: {} iteration(s), converged = {}, residual violation = {:.2e}",
    c.iterations, c.converged, c.residual_violation
  );
  if let Some(min) = c.relaxed_min_weight {
    println!("  min weight relaxed to {min:.4}");
  }

  println!("\nRisk report");
  allocation.report.to_table().printstd();

  Ok(())
}
