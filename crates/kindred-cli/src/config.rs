//! Runtime configuration: an optional TOML file layered under `KINDRED_*`
//! environment variables (`KINDRED_MAX_SIMULATIONS`, `KINDRED_GAP__MIN`).

use std::path::Path;

use anyhow::{Context as _, bail};
use kindred_analysis::timeline::GapPolicy;
use serde::Deserialize;

/// Limits and policies the CLI applies around the engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CliConfig {
  /// Upper bound on `forecast --simulations`.
  pub max_simulations:     u32,
  /// Upper bound on `forecast --generations`.
  pub max_generations:     u32,
  /// Trials run when `--simulations` is not given.
  pub default_simulations: u32,
  /// Gaps outside this range are flagged by `gaps`.
  pub gap:                 GapPolicy,
}

impl Default for CliConfig {
  fn default() -> Self {
    Self {
      max_simulations:     1_000_000,
      max_generations:     100,
      default_simulations: 10_000,
      gap:                 GapPolicy::default(),
    }
  }
}

impl CliConfig {
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("KINDRED")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()
      .context("failed to read config file")?;

    settings
      .try_deserialize()
      .context("failed to deserialise CliConfig")
  }

  pub fn check_forecast_limits(
    &self,
    generations: u32,
    simulations: u32,
  ) -> anyhow::Result<()> {
    if generations > self.max_generations {
      bail!(
        "--generations {generations} exceeds the configured limit of {}",
        self.max_generations
      );
    }
    if simulations > self.max_simulations {
      bail!(
        "--simulations {simulations} exceeds the configured limit of {}",
        self.max_simulations
      );
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_file_yields_defaults() {
    let cfg = CliConfig::load(Path::new("does-not-exist.toml")).unwrap();
    assert_eq!(cfg.default_simulations, 10_000);
    assert_eq!(cfg.gap, GapPolicy::default());
  }

  #[test]
  fn limits_are_enforced() {
    let cfg = CliConfig {
      max_generations: 10,
      max_simulations: 500,
      ..CliConfig::default()
    };
    assert!(cfg.check_forecast_limits(10, 500).is_ok());
    assert!(cfg.check_forecast_limits(11, 1).is_err());
    assert!(cfg.check_forecast_limits(1, 501).is_err());
  }
}
