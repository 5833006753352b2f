//! [`SpecFetcher`], the HTTP implementation of [`SpecSource`].

use std::time::Duration;

use gemdex_core::{
  platform, retry::RetryPolicy, source::SpecSource, spec::GemSpec,
};
use reqwest::Client;

use crate::{
  Error, Result,
  codec::{decode_spec, spec_file_name},
};

/// Downloads specifications from a registry.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Debug, Clone)]
pub struct SpecFetcher {
  client:   Client,
  base_url: String,
  policy:   RetryPolicy,
}

impl SpecFetcher {
  pub fn new(base_url: impl Into<String>) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()?;
    Ok(Self {
      client,
      base_url: base_url.into(),
      policy: RetryPolicy::FETCH,
    })
  }

  pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
    self.policy = policy;
    self
  }

  pub fn url(&self, name: &str, number: &str, platform: &str) -> String {
    format!(
      "{}/{}",
      self.base_url.trim_end_matches('/'),
      spec_file_name(name, number, platform)
    )
  }

  /// One download-and-decode attempt.
  async fn fetch_once(&self, url: &str) -> Result<GemSpec> {
    let resp = self.client.get(url).send().await?;

    if !resp.status().is_success() {
      return Err(Error::Status { url: url.to_owned(), status: resp.status() });
    }
    let body = resp.bytes().await?;
    decode_spec(&body)
  }

  /// Fetch with the retry budget. Exhaustion is logged and reported as
  /// [`Error::Exhausted`] wrapping the last failure.
  pub async fn fetch_spec(
    &self,
    name: &str,
    number: &str,
    platform: &str,
  ) -> Result<GemSpec> {
    let url = self.url(name, number, platform);
    let mut attempt = 1;

    loop {
      match self.fetch_once(&url).await {
        Ok(spec) => return Ok(spec),
        Err(e) if attempt < self.policy.attempts => {
          tracing::warn!(%url, attempt, error = %e, "spec download failed, retrying");
          tokio::time::sleep(self.policy.delay).await;
          attempt += 1;
        }
        Err(e) => {
          let full_name = platform::full_name(name, number, platform);
          tracing::error!(%url, %full_name, attempts = attempt, error = %e, "could not download spec");
          return Err(Error::Exhausted {
            full_name,
            attempts: attempt,
            last: Box::new(e),
          });
        }
      }
    }
  }
}

impl SpecSource for SpecFetcher {
  type Error = Error;

  async fn fetch(&self, name: &str, number: &str, platform: &str) -> Result<GemSpec> {
    self.fetch_spec(name, number, platform).await
  }
}
