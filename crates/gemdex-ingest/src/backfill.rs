//! Bounded-concurrency ingestion of a batch of publish events.

use std::sync::Arc;

use gemdex_core::{
  event::PublishEvent, source::SpecSource, store::GemRepository,
};
use tokio::{sync::Semaphore, task::JoinSet};

use crate::{IngestOutcome, IngestionJob, JobContext};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BackfillSummary {
  pub inserted: usize,
  pub skipped:  usize,
  /// Full names of the events whose job failed.
  pub failed:   Vec<String>,
}

/// Run one [`IngestionJob`] per event, at most `workers` at a time.
pub async fn backfill<R, F>(
  ctx: JobContext<R, F>,
  events: Vec<PublishEvent>,
  workers: usize,
) -> BackfillSummary
where
  R: GemRepository + 'static,
  F: SpecSource + 'static,
{
  let permits = Arc::new(Semaphore::new(workers.max(1)));
  let mut set = JoinSet::new();

  for event in events {
    let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
      break;
    };
    let job = IngestionJob::new(ctx.clone(), event);
    set.spawn(async move {
      let _permit = permit;
      let outcome = job.run().await;
      (job.event().full_name(), outcome)
    });
  }

  let mut summary = BackfillSummary::default();
  while let Some(joined) = set.join_next().await {
    match joined {
      Ok((_, Ok(IngestOutcome::Inserted(_)))) => summary.inserted += 1,
      Ok((_, Ok(IngestOutcome::AlreadyIndexed))) => summary.skipped += 1,
      Ok((full_name, Err(e))) => {
        tracing::error!(%full_name, error = %e, "ingestion failed");
        summary.failed.push(full_name);
      }
      Err(e) => {
        tracing::error!(error = %e, "ingestion task panicked");
        summary.failed.push("<unknown>".to_owned());
      }
    }
  }
  summary.failed.sort();
  summary
}
