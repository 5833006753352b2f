//! Error type for ingestion and reconciliation jobs.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The spec source spent its retry budget; nothing was written.
  #[error("specification for {full_name} unavailable: {source}")]
  SpecUnavailable {
    full_name: String,
    #[source]
    source:    Box<dyn std::error::Error + Send + Sync>,
  },

  #[error("{0} is not indexed")]
  NotIndexed(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
