//! [`IngestionJob`]: records one published version.

use gemdex_core::{
  event::PublishEvent, model::SpecInsert, source::SpecSource,
  store::GemRepository,
};

use crate::{Error, JobContext, Result};

/// What a finished [`IngestionJob`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
  /// Storage already held an indexed row; nothing was fetched.
  AlreadyIndexed,
  Inserted(SpecInsert),
}

/// Adds the version named by a [`PublishEvent`] to the catalog.
///
/// The job is idempotent: re-running it for a version that is already
/// indexed does nothing, and re-running it after the version was marked
/// unindexed restores the flag on the existing row.
pub struct IngestionJob<R, F> {
  ctx:   JobContext<R, F>,
  event: PublishEvent,
}

impl<R: GemRepository, F: SpecSource> IngestionJob<R, F> {
  pub fn new(ctx: JobContext<R, F>, event: PublishEvent) -> Self {
    Self { ctx, event }
  }

  pub fn event(&self) -> &PublishEvent { &self.event }

  pub async fn run(&self) -> Result<IngestOutcome> {
    let PublishEvent { name, version, platform, .. } = &self.event;
    let full_name = self.event.full_name();
    let repo = &self.ctx.repo;

    if repo.exists(name, version, platform).await.map_err(Error::store)? {
      tracing::debug!(%full_name, "already indexed");
      return Ok(IngestOutcome::AlreadyIndexed);
    }

    let processed = self.ctx.coordinator().record_attempt().await;
    tracing::info!(%full_name, processed, "adding");

    // Fetch outside the lock; other jobs may fetch concurrently.
    let spec = self
      .ctx
      .source
      .fetch(name, version, platform)
      .await
      .map_err(|e| {
        tracing::error!(%full_name, error = %e, "specification unavailable");
        Error::SpecUnavailable { full_name: full_name.clone(), source: Box::new(e) }
      })?;

    let inserted = {
      let _guard = self.ctx.coordinator().lock().await;
      repo
        .insert_spec(&spec, platform, None, Some(true))
        .await
        .map_err(Error::store)?
    };

    tracing::info!(
      %full_name,
      new_package = inserted.package.inserted,
      new_version = inserted.version.inserted,
      dependencies = inserted.dependencies_added.len(),
      "added"
    );
    Ok(IngestOutcome::Inserted(inserted))
  }
}
