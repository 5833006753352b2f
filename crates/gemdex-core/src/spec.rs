//! Gem specifications as served by the remote registry.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{Result, platform};

// ─── Scope ───────────────────────────────────────────────────────────────────

/// Whether a dependency is needed at runtime or only for development.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
  Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Scope {
  #[default]
  Runtime,
  Development,
}

impl Scope {
  /// Parse the value stored in the `scope` column.
  pub fn parse(s: &str) -> Result<Self> {
    s.parse()
      .map_err(|_| crate::Error::UnknownScope(s.to_owned()))
  }
}

// ─── SpecDependency ──────────────────────────────────────────────────────────

/// A dependency as declared by a specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecDependency {
  /// Name of the target package.
  pub name:        String,
  /// Comma-separated requirement clauses, e.g. `"~> 1.0, >= 0.9"`.
  pub requirement: String,
  /// Legacy specifications carry no scope; those are runtime dependencies.
  #[serde(default)]
  pub scope:       Scope,
}

impl SpecDependency {
  pub fn new(
    name: impl Into<String>,
    requirement: impl Into<String>,
    scope: Scope,
  ) -> Self {
    Self { name: name.into(), requirement: requirement.into(), scope }
  }
}

// ─── GemSpec ─────────────────────────────────────────────────────────────────

fn default_platform() -> String { platform::DEFAULT_PLATFORM.to_owned() }

/// A deserialized package specification.
///
/// The `platform` here is self-reported by the gem and is not necessarily
/// the platform a version is recorded under; see [`crate::platform`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GemSpec {
  pub name:                      String,
  pub version:                   String,
  #[serde(default = "default_platform")]
  pub platform:                  String,
  #[serde(default)]
  pub authors:                   Vec<String>,
  #[serde(default)]
  pub description:               Option<String>,
  #[serde(default)]
  pub summary:                   Option<String>,
  #[serde(default)]
  pub required_ruby_version:     Option<String>,
  #[serde(default)]
  pub required_rubygems_version: Option<String>,
  #[serde(default)]
  pub dependencies:              Vec<SpecDependency>,
}

impl GemSpec {
  /// Convenience constructor with every optional field empty.
  pub fn new(
    name: impl Into<String>,
    version: impl Into<String>,
    platform: impl Into<String>,
  ) -> Self {
    Self {
      name:                      name.into(),
      version:                   version.into(),
      platform:                  platform.into(),
      authors:                   Vec::new(),
      description:               None,
      summary:                   None,
      required_ruby_version:     None,
      required_rubygems_version: None,
      dependencies:              Vec::new(),
    }
  }

  pub fn with_dependency(mut self, dep: SpecDependency) -> Self {
    self.dependencies.push(dep);
    self
  }

  /// One declaration per target gem, in declaration order.
  ///
  /// Old specifications may name a target twice, typically once per scope.
  /// A runtime declaration wins over a development one; within a scope the
  /// first declaration wins.
  pub fn unique_dependencies(&self) -> Vec<&SpecDependency> {
    let mut unique: Vec<&SpecDependency> = Vec::new();
    for dep in &self.dependencies {
      match unique.iter().position(|kept| kept.name == dep.name) {
        Some(i) => {
          if unique[i].scope == Scope::Development && dep.scope == Scope::Runtime {
            unique[i] = dep;
          }
        }
        None => unique.push(dep),
      }
    }
    unique
  }

  /// The full identifier under the specification's own platform.
  pub fn full_name(&self) -> String {
    platform::full_name(&self.name, &self.version, &self.platform)
  }

  pub fn is_prerelease(&self) -> bool { platform::is_prerelease(&self.version) }

  pub fn from_json(bytes: &[u8]) -> Result<Self> {
    Ok(serde_json::from_slice(bytes)?)
  }

  pub fn to_json(&self) -> Result<Vec<u8>> { Ok(serde_json::to_vec(self)?) }
}
