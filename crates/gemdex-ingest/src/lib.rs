//! Ingestion pipeline for published gem versions.
//!
//! An [`IngestionJob`] turns one [`PublishEvent`] into catalog rows; a
//! [`ReconciliationJob`] re-derives the dependency edges of a version that
//! is already indexed. Both run against any [`GemRepository`] and
//! [`SpecSource`], sharing the repository's [`Coordinator`].
//!
//! [`PublishEvent`]: gemdex_core::event::PublishEvent
//! [`Coordinator`]: gemdex_core::cache::Coordinator

pub mod backfill;
pub mod error;
pub mod ingest;
pub mod reconcile;

pub use error::{Error, Result};
pub use ingest::{IngestOutcome, IngestionJob};
pub use reconcile::{Reconciled, ReconciliationJob};

use std::{path::PathBuf, sync::Arc, time::Duration};

use gemdex_core::{
  cache::{CacheKey, Coordinator},
  retry::RetryPolicy,
  source::SpecSource,
  store::GemRepository,
};
use serde::Deserialize;


// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime configuration, deserialised from `gemdex.toml` and `GEMDEX_*`.
#[derive(Deserialize, Clone, Debug)]
pub struct IngestConfig {
  pub store_path:             PathBuf,
  pub registry_url:           String,
  #[serde(default = "default_workers")]
  pub workers:                usize,
  #[serde(default = "default_fetch_attempts")]
  pub fetch_attempts:         u32,
  #[serde(default)]
  pub fetch_retry_delay_ms:   u64,
  #[serde(default = "default_storage_retries")]
  pub storage_retries:        u32,
  #[serde(default = "default_storage_retry_delay_ms")]
  pub storage_retry_delay_ms: u64,
  #[serde(default)]
  pub cache_key:              CacheKey,
}

fn default_workers() -> usize { 4 }
fn default_fetch_attempts() -> u32 { RetryPolicy::FETCH.attempts }
fn default_storage_retries() -> u32 { RetryPolicy::STORAGE.attempts - 1 }
fn default_storage_retry_delay_ms() -> u64 { 30_000 }

impl IngestConfig {
  pub fn fetch_policy(&self) -> RetryPolicy {
    RetryPolicy::new(
      self.fetch_attempts,
      Duration::from_millis(self.fetch_retry_delay_ms),
    )
  }

  pub fn storage_policy(&self) -> RetryPolicy {
    RetryPolicy::with_retries(
      self.storage_retries,
      Duration::from_millis(self.storage_retry_delay_ms),
    )
  }
}

// ─── Job context ──────────────────────────────────────────────────────────────

/// What every job needs: the catalog and the place specs come from.
pub struct JobContext<R, F> {
  pub repo:   Arc<R>,
  pub source: Arc<F>,
}

impl<R, F> Clone for JobContext<R, F> {
  fn clone(&self) -> Self {
    Self { repo: Arc::clone(&self.repo), source: Arc::clone(&self.source) }
  }
}

impl<R: GemRepository, F: SpecSource> JobContext<R, F> {
  pub fn new(repo: R, source: F) -> Self {
    Self { repo: Arc::new(repo), source: Arc::new(source) }
  }

  pub fn coordinator(&self) -> &Coordinator { self.repo.coordinator() }
}
