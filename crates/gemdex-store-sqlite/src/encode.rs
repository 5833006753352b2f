//! Encoding and decoding helpers between domain types and SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, scopes as their lowercase
//! names, booleans as 0/1 integers.

use chrono::{DateTime, Utc};
use gemdex_core::{
  model::{DependencyEdge, Version},
  spec::Scope,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Scope ───────────────────────────────────────────────────────────────────

pub fn encode_scope(scope: Scope) -> String { scope.to_string() }

pub fn decode_scope(s: &str) -> Result<Scope> { Ok(Scope::parse(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawVersion::from_row`].
pub const VERSION_COLUMNS: &str = "v.id, v.package_id, v.number, v.platform, \
  v.indexed, v.prerelease, v.full_name, v.required_ruby_version, \
  v.required_rubygems_version, v.checksum, v.info_checksum, v.created_at";

/// Raw values read directly from a `versions` row.
pub struct RawVersion {
  pub id:                        i64,
  pub package_id:                i64,
  pub number:                    String,
  pub platform:                  String,
  pub indexed:                   bool,
  pub prerelease:                bool,
  pub full_name:                 String,
  pub required_ruby_version:     String,
  pub required_rubygems_version: String,
  pub checksum:                  Option<String>,
  pub info_checksum:             Option<String>,
  pub created_at:                String,
}

impl RawVersion {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                        row.get(0)?,
      package_id:                row.get(1)?,
      number:                    row.get(2)?,
      platform:                  row.get(3)?,
      indexed:                   row.get(4)?,
      prerelease:                row.get(5)?,
      full_name:                 row.get(6)?,
      required_ruby_version:     row.get(7)?,
      required_rubygems_version: row.get(8)?,
      checksum:                  row.get(9)?,
      info_checksum:             row.get(10)?,
      created_at:                row.get(11)?,
    })
  }

  pub fn into_version(self) -> Result<Version> {
    Ok(Version {
      id:                        self.id,
      package_id:                self.package_id,
      number:                    self.number,
      platform:                  self.platform,
      indexed:                   self.indexed,
      prerelease:                self.prerelease,
      full_name:                 self.full_name,
      required_ruby_version:     self.required_ruby_version,
      required_rubygems_version: self.required_rubygems_version,
      checksum:                  self.checksum,
      info_checksum:             self.info_checksum,
      created_at:                decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read from a `dependencies` row joined with its target package.
pub struct RawDependency {
  pub id:           i64,
  pub version_id:   i64,
  pub package_id:   i64,
  pub package_name: String,
  pub requirements: String,
  pub scope:        String,
}

impl RawDependency {
  pub fn into_edge(self) -> Result<DependencyEdge> {
    Ok(DependencyEdge {
      id:           self.id,
      version_id:   self.version_id,
      package_id:   self.package_id,
      package_name: self.package_name,
      requirements: self.requirements,
      scope:        decode_scope(&self.scope)?,
    })
  }
}
