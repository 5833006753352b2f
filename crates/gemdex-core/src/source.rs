//! The `SpecSource` trait: where specifications come from.

use std::future::Future;

use crate::spec::GemSpec;

/// Retrieves the specification of one version.
///
/// Implementations own their retry budget; an error means the budget is
/// spent and the caller must not write anything for this version.
pub trait SpecSource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn fetch<'a>(
    &'a self,
    name: &'a str,
    number: &'a str,
    platform: &'a str,
  ) -> impl Future<Output = Result<GemSpec, Self::Error>> + Send + 'a;
}
