//! Monte Carlo forecast of descendant counts under a Galton–Watson process.
//!
//! Every individual independently leaves a Poisson(μ) number of children per
//! generation. A trial starts from `start_population` people and adds up the
//! children born in each of `generations` generations; the forecast reports
//! percentiles of that total across `simulations` independent trials.
//!
//! Trials run in parallel. A master generator seeded with `seed` hands each
//! trial its own seed up front, so results do not depend on how trials are
//! scheduled and nearby seeds give unrelated samples.
//!
//! Offspring counts are drawn by inverting the Poisson CDF at one uniform per
//! generation. A trial therefore sees the same uniforms whatever μ is, and its
//! total can only grow when μ grows.

use rand::{Rng, RngCore, SeedableRng, distributions::Open01, rngs::StdRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

/// Inputs to [`forecast`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastParams {
  /// Mean offspring per individual per generation (μ ≥ 0).
  pub mean_offspring:   f64,
  /// Generations simulated per trial (G ≥ 1).
  pub generations:      u32,
  /// Number of independent trials (S ≥ 1).
  pub simulations:      u32,
  /// Population at generation 0 (≥ 1).
  pub start_population: u64,
  pub seed:             u64,
}

impl ForecastParams {
  pub fn validate(&self) -> Result<()> {
    if !self.mean_offspring.is_finite() || self.mean_offspring < 0.0 {
      return Err(invalid(
        "mean_offspring",
        format!("must be a finite number >= 0, got {}", self.mean_offspring),
      ));
    }
    if self.generations == 0 {
      return Err(invalid("generations", "must be at least 1".into()));
    }
    if self.simulations == 0 {
      return Err(invalid("simulations", "must be at least 1".into()));
    }
    if self.start_population == 0 {
      return Err(invalid("start_population", "must be at least 1".into()));
    }
    Ok(())
  }
}

fn invalid(name: &'static str, reason: String) -> Error {
  Error::InvalidParameter { name, reason }
}

/// Percentiles of the total descendants produced over the simulated
/// generations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
  pub p05:              f64,
  pub p50:              f64,
  pub p95:              f64,
  pub mean:             f64,
  /// Share of trials whose last generation was empty.
  pub extinct_fraction: f64,
}

/// Outcome of a single trial.
#[derive(Debug, Clone, Copy)]
struct Trial {
  total:   u64,
  extinct: bool,
}

/// Run the simulation described by `params`.
///
/// Identical parameters always produce bit-identical output.
pub fn forecast(params: &ForecastParams) -> Result<Forecast> {
  params.validate()?;

  let mut master = StdRng::seed_from_u64(params.seed);
  let seeds: Vec<u64> =
    (0..params.simulations).map(|_| master.next_u64()).collect();

  let trials: Vec<Trial> = seeds
    .into_par_iter()
    .map(|seed| run_trial(params, &mut StdRng::seed_from_u64(seed)))
    .collect();

  let mut totals: Vec<u64> = trials.iter().map(|t| t.total).collect();
  totals.sort_unstable();

  let n = trials.len() as f64;
  let extinct = trials.iter().filter(|t| t.extinct).count() as f64;
  let mean = totals.iter().map(|&t| t as f64).sum::<f64>() / n;

  let result = Forecast {
    p05: percentile(&totals, 5.0),
    p50: percentile(&totals, 50.0),
    p95: percentile(&totals, 95.0),
    mean,
    extinct_fraction: extinct / n,
  };
  debug!(?params, ?result, "forecast complete");
  Ok(result)
}

fn run_trial(params: &ForecastParams, rng: &mut StdRng) -> Trial {
  let mut population = params.start_population;
  let mut total: u64 = 0;

  for _ in 0..params.generations {
    let u: f64 = rng.sample(Open01);
    population = next_generation(population, params.mean_offspring, u);
    total = total.saturating_add(population);
    if population == 0 {
      break;
    }
  }

  Trial {
    total,
    extinct: population == 0,
  }
}

/// Children born to `population` parents with `mean` offspring each, given
/// the generation's uniform draw `u` in (0, 1).
///
/// The sum of `population` independent Poisson(μ) draws is itself
/// Poisson(population · μ), so one quantile stands in for all of them.
fn next_generation(population: u64, mean: f64, u: f64) -> u64 {
  poisson_quantile(population as f64 * mean, u)
}

/// Above this rate the Poisson quantile comes from a normal approximation.
const NORMAL_CUTOFF: f64 = 256.0;

/// Smallest `k` with `P(X <= k) >= u` for `X ~ Poisson(lambda)`.
///
/// Non-decreasing in `lambda` for fixed `u`. Past [`NORMAL_CUTOFF`] the
/// approximation is floored at the exact quantile for the cutoff rate so the
/// two regimes join without a step down.
fn poisson_quantile(lambda: f64, u: f64) -> u64 {
  if lambda <= 0.0 {
    return 0;
  }
  if lambda < NORMAL_CUTOFF {
    return exact_quantile(lambda, u);
  }
  // float → int casts saturate, capping runaway populations at u64::MAX
  let approx = (lambda + lambda.sqrt() * probit(u) + 0.5).floor().max(0.0);
  (approx as u64).max(exact_quantile(NORMAL_CUTOFF, u))
}

fn exact_quantile(lambda: f64, u: f64) -> u64 {
  let mut k: u64 = 0;
  let mut mass = (-lambda).exp();
  let mut cdf = mass;
  while cdf < u {
    k += 1;
    mass *= lambda / k as f64;
    // rounding can leave the running sum a hair short of u deep in the tail
    if mass == 0.0 && k as f64 > lambda {
      break;
    }
    cdf += mass;
  }
  k
}

/// Standard normal quantile, Acklam's rational approximation (relative
/// error below 1.2e-9).
fn probit(p: f64) -> f64 {
  const A: [f64; 6] = [
    -3.969683028665376e+01,
    2.209460984245205e+02,
    -2.759285104469687e+02,
    1.383577518672690e+02,
    -3.066479806614716e+01,
    2.506628277459239e+00,
  ];
  const B: [f64; 5] = [
    -5.447609879822406e+01,
    1.615858368580409e+02,
    -1.556989798598866e+02,
    6.680131188771972e+01,
    -1.328068155288572e+01,
  ];
  const C: [f64; 6] = [
    -7.784894002430293e-03,
    -3.223964580411365e-01,
    -2.400758277161838e+00,
    -2.549732539343734e+00,
    4.374664141464968e+00,
    2.938163982698783e+00,
  ];
  const D: [f64; 4] = [
    7.784695709041462e-03,
    3.224671290700398e-01,
    2.445134137142996e+00,
    3.754408661907416e+00,
  ];
  const P_LOW: f64 = 0.02425;

  let tail = |q: f64| {
    (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
      / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
  };

  if p < P_LOW {
    tail((-2.0 * p.ln()).sqrt())
  } else if p <= 1.0 - P_LOW {
    let q = p - 0.5;
    let r = q * q;
    (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
      / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
  } else {
    -tail((-2.0 * (1.0 - p).ln()).sqrt())
  }
}

/// Percentile `p` (0–100) of ascending `sorted`, interpolating linearly
/// between the closest ranks.
fn percentile(sorted: &[u64], p: f64) -> f64 {
  match sorted {
    [] => 0.0,
    [only] => *only as f64,
    _ => {
      let rank = p / 100.0 * (sorted.len() - 1) as f64;
      let lo = rank.floor() as usize;
      let hi = rank.ceil() as usize;
      let weight = rank - lo as f64;
      sorted[lo] as f64 + (sorted[hi] as f64 - sorted[lo] as f64) * weight
    }
  }
}
