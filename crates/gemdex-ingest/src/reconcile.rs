//! [`ReconciliationJob`]: repairs the dependency edges of an indexed version.

use gemdex_core::{
  event::PublishEvent, source::SpecSource, store::GemRepository,
};

use crate::{Error, JobContext, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
  pub version_id: i64,
  /// `"{requirements} {name}"` for every edge inserted or replaced.
  pub added:      Vec<String>,
}

/// Re-fetches the specification of an indexed version and inserts the
/// dependency edges storage is missing, typically ones skipped earlier
/// because the target package did not exist yet.
pub struct ReconciliationJob<R, F> {
  ctx:    JobContext<R, F>,
  event:  PublishEvent,
  silent: bool,
}

impl<R: GemRepository, F: SpecSource> ReconciliationJob<R, F> {
  pub fn new(ctx: JobContext<R, F>, event: PublishEvent) -> Self {
    Self { ctx, event, silent: false }
  }

  /// Suppress per-version progress logging.
  pub fn silent(mut self, silent: bool) -> Self {
    self.silent = silent;
    self
  }

  pub async fn run(&self) -> Result<Reconciled> {
    let PublishEvent { name, version, platform, .. } = &self.event;
    let full_name = self.event.full_name();
    let repo = &self.ctx.repo;

    let Some(found) = repo
      .find_indexed_version(name, version, platform)
      .await
      .map_err(Error::store)?
    else {
      return Err(Error::NotIndexed(full_name));
    };

    let processed = self.ctx.coordinator().record_attempt().await;
    if !self.silent {
      tracing::info!(%full_name, processed, "reconciling dependencies");
    }

    let spec = self
      .ctx
      .source
      .fetch(name, version, platform)
      .await
      .map_err(|e| {
        tracing::error!(%full_name, error = %e, "specification unavailable");
        Error::SpecUnavailable { full_name: full_name.clone(), source: Box::new(e) }
      })?;

    let added = {
      let _guard = self.ctx.coordinator().lock().await;
      repo
        .insert_dependencies(&spec, found.version_id)
        .await
        .map_err(Error::store)?
    };

    if !self.silent && !added.is_empty() {
      tracing::info!(%full_name, ?added, "dependencies added");
    }
    Ok(Reconciled { version_id: found.version_id, added })
  }
}
