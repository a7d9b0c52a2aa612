//! `kindred` — command-line front end for the Kindred genealogy engine.
//!
//! # Usage
//!
//! ```text
//! kindred check --people people.csv --events events.csv --sources sources.csv
//! kindred generations --people people.csv --founder F1
//! kindred gaps --people people.csv --format csv
//! kindred forecast --mu 1.4 --generations 10 --seed 42
//! kindred fingerprint register.pdf --sources sources.csv --source S1
//! ```
//!
//! Tables may be CSV (header row, `;`-separated lists) or a JSON array of
//! records when the file name ends in `.json`.

mod config;

use std::{
  fs::File,
  io::{self, BufReader, Write},
  path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};
use kindred_analysis::{
  forecast::{Forecast, ForecastParams, forecast},
  generations::generation_index,
  timeline::{compute_ages, intergen_gaps, lifespans},
};
use kindred_core::{
  record::{ParentRole, RecordKind, fingerprint},
  store::{LineageStore, MemoryStore},
};
use serde::Serialize;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

use crate::config::CliConfig;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "kindred", version, about = "Genealogy record checks and analyses")]
struct Cli {
  /// Path to an optional TOML configuration file.
  #[arg(short, long, default_value = "kindred.toml", global = true)]
  config: PathBuf,

  /// Output format for derived tables.
  #[arg(long, value_enum, default_value_t = Format::Json, global = true)]
  format: Format,

  #[command(subcommand)]
  command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
  Json,
  Csv,
}

/// Record tables to load before running a command.
#[derive(Args)]
struct Tables {
  #[arg(long, value_name = "FILE")]
  people:  Option<PathBuf>,
  #[arg(long, value_name = "FILE")]
  events:  Option<PathBuf>,
  #[arg(long, value_name = "FILE")]
  sources: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
  /// Validate and load the tables, then run the integrity pass.
  Check(Tables),

  /// Generation number of every descendant of a founder.
  Generations {
    #[command(flatten)]
    tables:  Tables,
    #[arg(long)]
    founder: String,
  },

  /// Age of each participant at each event.
  Ages(Tables),

  /// Birth-year gaps between children and their parents.
  Gaps(Tables),

  /// Years between birth and death.
  Lifespans(Tables),

  /// Monte Carlo forecast of descendant counts.
  Forecast {
    /// Mean offspring per person per generation.
    #[arg(long)]
    mu:          f64,
    #[arg(long)]
    generations: u32,
    /// Number of trials; defaults to the configured value.
    #[arg(long)]
    simulations: Option<u32>,
    #[arg(long, default_value_t = 1)]
    start:       u64,
    #[arg(long, default_value_t = 0)]
    seed:        u64,
  },

  /// Print the SHA-256 fingerprint of a document, optionally checking it
  /// against a source record.
  Fingerprint {
    file:    PathBuf,
    #[command(flatten)]
    tables:  Tables,
    /// Source id whose recorded hash the document must match.
    #[arg(long, requires = "sources")]
    source:  Option<String>,
  },
}

// ─── Output rows ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct GenerationRow<'a> {
  person_id:  &'a str,
  generation: u32,
}

#[derive(Serialize)]
struct GapOutput {
  parent_id: String,
  child_id:  String,
  relation:  ParentRole,
  gap:       i32,
  plausible: bool,
}

#[derive(Serialize)]
struct FingerprintOutput<'a> {
  file:     String,
  sha256:   String,
  source:   Option<&'a str>,
  verified: Option<bool>,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(io::stderr)
    .init();

  let cli = Cli::parse();
  let cfg = CliConfig::load(&cli.config)?;
  let out = Output(cli.format);

  match cli.command {
    Command::Check(tables) => {
      let store = load_store(&tables)?;
      out.one(&store.counts())
    }

    Command::Generations { tables, founder } => {
      let store = load_store(&tables)?;
      let index = generation_index(&store, &founder)
        .with_context(|| format!("indexing generations from {founder}"))?;
      info!(
        founder = index.founder(),
        reached = index.len(),
        depth = index.max_depth(),
        "indexed"
      );
      let rows: Vec<_> = index
        .iter()
        .map(|(person_id, generation)| GenerationRow {
          person_id,
          generation,
        })
        .collect();
      out.rows(&rows)
    }

    Command::Ages(tables) => out.rows(&compute_ages(&load_store(&tables)?)),

    Command::Gaps(tables) => {
      let store = load_store(&tables)?;
      let rows: Vec<_> = intergen_gaps(&store)
        .into_iter()
        .map(|g| GapOutput {
          plausible: cfg.gap.is_plausible(g.gap),
          parent_id: g.parent_id,
          child_id:  g.child_id,
          relation:  g.relation,
          gap:       g.gap,
        })
        .collect();
      let flagged = rows.iter().filter(|r| !r.plausible).count();
      if flagged > 0 {
        info!(
          flagged,
          min = cfg.gap.min,
          max = cfg.gap.max,
          "implausible gaps"
        );
      }
      out.rows(&rows)
    }

    Command::Lifespans(tables) => out.rows(&lifespans(&load_store(&tables)?)),

    Command::Forecast {
      mu,
      generations,
      simulations,
      start,
      seed,
    } => {
      let simulations = simulations.unwrap_or(cfg.default_simulations);
      cfg.check_forecast_limits(generations, simulations)?;
      let params = ForecastParams {
        mean_offspring: mu,
        generations,
        simulations,
        start_population: start,
        seed,
      };
      let result: Forecast = forecast(&params).context("running forecast")?;
      out.one(&result)
    }

    Command::Fingerprint {
      file,
      tables,
      source,
    } => {
      let content = std::fs::read(&file)
        .with_context(|| format!("reading {}", file.display()))?;
      let sha256 = fingerprint(&content);

      let verified = match &source {
        Some(id) => {
          let store = load_store(&tables)?;
          let verified = store.source(id)?.verify(&content);
          if verified == Some(false) {
            tracing::warn!(
              source = %id,
              file = %file.display(),
              "fingerprint mismatch"
            );
          }
          verified
        }
        None => None,
      };

      out.one(&FingerprintOutput {
        file: file.display().to_string(),
        sha256,
        source: source.as_deref(),
        verified,
      })
    }
  }
}

// ─── Loading ──────────────────────────────────────────────────────────────────

fn read_table(
  kind: RecordKind,
  path: &Path,
) -> anyhow::Result<Vec<serde_json::Value>> {
  let file = File::open(path)
    .with_context(|| format!("opening {kind} table {}", path.display()))?;
  let reader = BufReader::new(file);
  let is_json = path
    .extension()
    .is_some_and(|e| e.eq_ignore_ascii_case("json"));
  let rows = if is_json {
    kindred_tables::decode_json(reader)
  } else {
    kindred_tables::decode_table(kind, reader)
  };
  rows.with_context(|| format!("reading {kind} table {}", path.display()))
}

/// Load every given table, then run the integrity pass.
fn load_store(tables: &Tables) -> anyhow::Result<MemoryStore> {
  let mut store = MemoryStore::new();

  for (kind, path) in [
    (RecordKind::Person, &tables.people),
    (RecordKind::Event, &tables.events),
    (RecordKind::Source, &tables.sources),
  ] {
    let Some(path) = path else { continue };
    let rows = read_table(kind, path)?;
    let count = store
      .load(kind, rows)
      .with_context(|| format!("loading {kind} table {}", path.display()))?;
    info!(%kind, count, path = %path.display(), "table loaded");
  }

  store.check_integrity().context("integrity check failed")?;
  Ok(store)
}

// ─── Output ───────────────────────────────────────────────────────────────────

struct Output(Format);

impl Output {
  fn rows<T: Serialize>(&self, rows: &[T]) -> anyhow::Result<()> {
    let stdout = io::stdout().lock();
    match self.0 {
      Format::Json => write_json(stdout, &rows),
      Format::Csv => Ok(kindred_tables::encode_rows(stdout, rows)?),
    }
  }

  fn one<T: Serialize>(&self, value: &T) -> anyhow::Result<()> {
    match self.0 {
      Format::Json => write_json(io::stdout().lock(), value),
      Format::Csv => self.rows(std::slice::from_ref(value)),
    }
  }
}

fn write_json<W: Write, T: Serialize + ?Sized>(
  mut w: W,
  value: &T,
) -> anyhow::Result<()> {
  serde_json::to_writer_pretty(&mut w, value)?;
  writeln!(w)?;
  Ok(())
}
