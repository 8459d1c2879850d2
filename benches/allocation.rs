use std::collections::BTreeMap;
use std::hint::black_box;

use chrono::NaiveDate;
use criterion::criterion_group;
use criterion::criterion_main;
use criterion::BenchmarkId;
use criterion::Criterion;
use portfolio_rs::config::BlendFractions;
use portfolio_rs::constraints::ConstraintSolver;
use portfolio_rs::PortfolioEngine;
use portfolio_rs::PriceHistory;
use portfolio_rs::PriceSeries;
use portfolio_rs::StrategyConfig;
use portfolio_rs::StrategyKind;
use portfolio_rs::WeightVector;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use rand_distr::Distribution;
use rand_distr::Normal;

fn universe(n_assets: usize, n_periods: usize) -> PriceHistory {
  let mut rng = StdRng::seed_from_u64(11);
  let shock = Normal::new(0.0005, 0.015).unwrap();
  let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();

  let assets: BTreeMap<String, PriceSeries> = (0..n_assets)
    .map(|i| {
      let mut p = vec![100.0];
      for _ in 1..n_periods {
        let last = p[p.len() - 1];
        let r: f64 = shock.sample(&mut rng);
        p.push(last * (1.0 + r));
      }
      (format!("A{i:03}"), PriceSeries::from_prices(start, &p))
    })
    .collect();
  let caps = assets
    .keys()
    .map(|s| (s.clone(), rng.random_range(10.0..1000.0)))
    .collect();

  PriceHistory::new(assets).with_market_caps(caps)
}

fn bench_constraint_solver(c: &mut Criterion) {
  let mut group = c.benchmark_group("ConstraintSolver");
  let mut rng = StdRng::seed_from_u64(3);

  for &n in &[10, 50, 250] {
    let raw: WeightVector = (0..n)
      .map(|i| (format!("A{i:03}"), rng.random::<f64>().powi(3)))
      .collect();
    let solver = ConstraintSolver::new(0.01, 0.08, Some(n * 4 / 5));

    group.bench_with_input(BenchmarkId::new("solve", n), &raw, |b, raw| {
      b.iter(|| black_box(solver.solve(raw)));
    });
  }

  group.finish();
}

fn bench_engine(c: &mut Criterion) {
  let mut group = c.benchmark_group("PortfolioEngine");
  group.sample_size(20);
  let history = universe(20, 504);

  let engine = PortfolioEngine::new(StrategyConfig::default()).unwrap();
  group.bench_function("default_blend", |b| {
    b.iter(|| black_box(engine.optimize(&history).unwrap()));
  });

  for kind in [StrategyKind::MinVariance, StrategyKind::MaxSharpe, StrategyKind::Hrp] {
    let config = StrategyConfig {
      blend: BlendFractions::only(kind),
      ..StrategyConfig::default()
    };
    let engine = PortfolioEngine::new(config).unwrap();
    group.bench_function(kind.name(), |b| {
      b.iter(|| black_box(engine.optimize(&history).unwrap()));
    });
  }

  group.finish();
}

criterion_group!(benches, bench_constraint_solver, bench_engine);
criterion_main!(benches);
