//! Bounded retry of storage reads on transient connectivity failures.

use std::future::Future;

use gemdex_core::retry::RetryPolicy;

use crate::Result;

/// Run `op` until it succeeds, fails with a non-transient error, or the
/// policy's attempts are spent. The last error is returned unchanged.
pub async fn with_retries<T, F, Fut>(
  policy: RetryPolicy,
  what: &str,
  mut op: F,
) -> Result<T>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<T>>,
{
  let mut attempt = 1;
  loop {
    match op().await {
      Ok(value) => return Ok(value),
      Err(e) if e.is_transient() && attempt < policy.attempts => {
        tracing::warn!(
          what,
          attempt,
          max_attempts = policy.attempts,
          error = %e,
          "transient storage failure, retrying"
        );
        tokio::time::sleep(policy.delay).await;
        attempt += 1;
      }
      Err(e) => {
        if e.is_transient() {
          tracing::error!(what, attempts = attempt, error = %e, "storage retries exhausted");
        }
        return Err(e);
      }
    }
  }
}
