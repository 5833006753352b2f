//! `gemdex`: drives the ingestion pipeline from the command line.
//!
//! Reads `gemdex.toml` (or the path given with `--config`) and `GEMDEX_*`
//! environment variables, opens the SQLite catalog, and runs one job per
//! invocation, or a whole batch with `backfill`.

use std::{
  path::{Path, PathBuf},
  time::Instant,
};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use gemdex_core::{cache::Coordinator, event::PublishEvent, store::GemRepository};
use gemdex_fetch::SpecFetcher;
use gemdex_ingest::{
  IngestConfig, IngestOutcome, IngestionJob, JobContext, ReconciliationJob,
  backfill::backfill,
};
use gemdex_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "gemdex ingestion worker")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "gemdex.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Ingest one published version.
  Add(VersionArgs),
  /// Re-derive the dependency edges of an indexed version.
  Reconcile {
    #[command(flatten)]
    target: VersionArgs,
    /// Do not log progress.
    #[arg(long)]
    silent: bool,
  },
  /// Mark a version as no longer indexed.
  Yank(VersionArgs),
  /// Ingest every event of a JSON-lines file.
  Backfill {
    /// One `{"name", "version", "platform"}` object per line.
    file: PathBuf,
  },
}

#[derive(Args)]
struct VersionArgs {
  #[arg(long)]
  name:     String,
  #[arg(long = "version")]
  number:   String,
  #[arg(long, default_value = "ruby")]
  platform: String,
}

impl VersionArgs {
  fn into_event(self) -> PublishEvent {
    PublishEvent::new(self.name, self.number, &self.platform)
  }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("GEMDEX"))
    .build()
    .context("failed to read config file")?;

  let cfg: IngestConfig = settings
    .try_deserialize()
    .context("failed to deserialise IngestConfig")?;

  let store_path = expand_tilde(&cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?
    .with_coordinator(Coordinator::new(cfg.cache_key))
    .with_retry(cfg.storage_policy());

  let fetcher = SpecFetcher::new(cfg.registry_url.clone())
    .context("failed to build HTTP client")?
    .with_policy(cfg.fetch_policy());

  let ctx = JobContext::new(store, fetcher);

  match cli.command {
    Command::Add(target) => {
      let event = target.into_event();
      let full_name = event.full_name();
      match IngestionJob::new(ctx, event).run().await? {
        IngestOutcome::AlreadyIndexed => println!("{full_name} already indexed"),
        IngestOutcome::Inserted(_) => println!("{full_name} added"),
      }
    }

    Command::Reconcile { target, silent } => {
      let reconciled = ReconciliationJob::new(ctx, target.into_event())
        .silent(silent)
        .run()
        .await?;
      for added in reconciled.added {
        println!("{added}");
      }
    }

    Command::Yank(target) => {
      let event = target.into_event();
      let changed = ctx
        .repo
        .yank(&event.name, &event.version, &event.platform)
        .await
        .with_context(|| format!("failed to yank {}", event.full_name()))?;
      if !changed {
        println!("{} was not indexed", event.full_name());
      }
    }

    Command::Backfill { file } => {
      let events = read_events(&file)?;
      let total = events.len();
      let started = Instant::now();

      let summary = backfill(ctx.clone(), events, cfg.workers).await;

      println!(
        "{total} events in {:.1?}: {} added, {} already indexed, {} failed",
        started.elapsed(),
        summary.inserted,
        summary.skipped,
        summary.failed.len(),
      );
      println!("{} fetched", ctx.coordinator().processed().await);
      for full_name in &summary.failed {
        println!("  failed: {full_name}");
      }
    }
  }

  Ok(())
}

/// Parse a JSON-lines file of publish events, skipping blank lines.
fn read_events(path: &Path) -> anyhow::Result<Vec<PublishEvent>> {
  let text = std::fs::read_to_string(path)
    .with_context(|| format!("failed to read {path:?}"))?;

  text
    .lines()
    .enumerate()
    .filter(|(_, line)| !line.trim().is_empty())
    .map(|(i, line)| {
      serde_json::from_str(line)
        .with_context(|| format!("{}:{}: invalid event", path.display(), i + 1))
    })
    .collect()
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
