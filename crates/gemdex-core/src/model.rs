//! Relational records produced by ingestion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::spec::Scope;

/// A gem name. Created on first ingestion of any of its versions; never
/// deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
  pub id:   i64,
  pub name: String,
}

/// One published version of a package on one platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Version {
  pub id:                        i64,
  pub package_id:                i64,
  pub number:                    String,
  /// The index-authoritative platform, not the one inside the spec.
  pub platform:                  String,
  pub indexed:                   bool,
  pub prerelease:                bool,
  pub full_name:                 String,
  /// Empty when the specification declares none.
  pub required_ruby_version:     String,
  /// Empty when the specification declares none.
  pub required_rubygems_version: String,
  pub checksum:                  Option<String>,
  pub info_checksum:             Option<String>,
  pub created_at:                DateTime<Utc>,
}

/// A declared dependency of a version on another package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
  pub id:           i64,
  pub version_id:   i64,
  pub package_id:   i64,
  /// Name of the target package (joined on read).
  pub package_name: String,
  pub requirements: String,
  pub scope:        Scope,
}

/// Result of a find-or-insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Upsert {
  pub inserted: bool,
  pub id:       i64,
}

impl Upsert {
  pub fn found(id: i64) -> Self { Self { inserted: false, id } }

  pub fn inserted(id: i64) -> Self { Self { inserted: true, id } }
}

/// Identifiers of an indexed version row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionRef {
  pub package_id: i64,
  pub version_id: i64,
}

/// What one transactional spec insert did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecInsert {
  pub package:            Upsert,
  pub version:            Upsert,
  /// `"<requirements> <name>"` for each edge written.
  pub dependencies_added: Vec<String>,
}
