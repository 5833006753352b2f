//! The existence cache and the coordinator that guards it.
//!
//! One [`Coordinator`] is created per process and handed to every repository
//! and job. Its mutex serializes existence-cache updates, the progress
//! counter, and each job's insert phase. The cache only ever records positive
//! results; a miss always falls through to storage. Entries live for the
//! lifetime of the process.

use std::{collections::HashSet, sync::Arc};

use serde::Deserialize;
use tokio::sync::{Mutex, MutexGuard};

use crate::platform;

// ─── Keying ──────────────────────────────────────────────────────────────────

/// How existence-cache entries are keyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheKey {
  /// `name-version`, shared by every platform of a version. A cached
  /// platform hides later publishes of other platforms of the same version.
  #[default]
  NameVersion,
  /// The full identifier, matching the storage uniqueness key.
  FullName,
}

impl CacheKey {
  pub fn key_for(self, name: &str, number: &str, platform: &str) -> String {
    match self {
      Self::NameVersion => format!("{name}-{number}"),
      Self::FullName => platform::full_name(name, number, platform),
    }
  }
}

// ─── ExistenceCache ──────────────────────────────────────────────────────────

/// Versions known to exist (indexed) in storage.
#[derive(Debug, Default)]
pub struct ExistenceCache {
  known: HashSet<String>,
}

impl ExistenceCache {
  pub fn known_to_exist(&self, key: &str) -> bool { self.known.contains(key) }

  pub fn mark_exists(&mut self, key: impl Into<String>) {
    self.known.insert(key.into());
  }

  /// Drop an entry whose version stopped being indexed.
  pub fn forget(&mut self, key: &str) -> bool { self.known.remove(key) }

  pub fn len(&self) -> usize { self.known.len() }

  pub fn is_empty(&self) -> bool { self.known.is_empty() }
}

// ─── Coordinator ─────────────────────────────────────────────────────────────

/// State mutated outside storage transactions. Only reachable through
/// [`Coordinator::lock`].
#[derive(Debug, Default)]
pub struct SharedState {
  pub cache:     ExistenceCache,
  /// Number of events that reached the fetch phase.
  pub processed: u64,
}

/// Process-wide mutex around [`SharedState`].
///
/// Cloning is cheap; clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct Coordinator {
  state:  Arc<Mutex<SharedState>>,
  keying: CacheKey,
}

impl Coordinator {
  pub fn new(keying: CacheKey) -> Self {
    Self { state: Arc::default(), keying }
  }

  pub fn keying(&self) -> CacheKey { self.keying }

  pub fn key_for(&self, name: &str, number: &str, platform: &str) -> String {
    self.keying.key_for(name, number, platform)
  }

  /// Acquire the shared mutex. Held for the whole insert phase of a job.
  pub async fn lock(&self) -> MutexGuard<'_, SharedState> {
    self.state.lock().await
  }

  /// Bump the progress counter and return its new value.
  pub async fn record_attempt(&self) -> u64 {
    let mut state = self.lock().await;
    state.processed += 1;
    state.processed
  }

  pub async fn processed(&self) -> u64 { self.lock().await.processed }
}
