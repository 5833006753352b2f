//! Publish events handed to the pipeline by the web layer.

use serde::{Deserialize, Serialize};

use crate::platform;

/// One "a version was published" notification.
///
/// The platform is normalized on construction and deserialization, so every
/// downstream consumer sees the platform the version is recorded under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawPublishEvent")]
pub struct PublishEvent {
  pub name:       String,
  pub version:    String,
  pub platform:   String,
  /// As reported by the publisher. Informational only: the stored
  /// `prerelease` column is always derived from the version number.
  pub prerelease: bool,
}

#[derive(Deserialize)]
struct RawPublishEvent {
  name:       String,
  version:    String,
  #[serde(default)]
  platform:   String,
  #[serde(default)]
  prerelease: Option<bool>,
}

impl From<RawPublishEvent> for PublishEvent {
  fn from(raw: RawPublishEvent) -> Self {
    let mut event = Self::new(raw.name, raw.version, &raw.platform);
    if let Some(prerelease) = raw.prerelease {
      event.prerelease = prerelease;
    }
    event
  }
}

impl PublishEvent {
  pub fn new(
    name: impl Into<String>,
    version: impl Into<String>,
    platform: &str,
  ) -> Self {
    let version = version.into();
    Self {
      name:       name.into(),
      prerelease: platform::is_prerelease(&version),
      version,
      platform:   platform::normalize(platform).to_owned(),
    }
  }

  pub fn full_name(&self) -> String {
    platform::full_name(&self.name, &self.version, &self.platform)
  }
}
