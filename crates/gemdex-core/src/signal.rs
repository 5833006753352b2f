//! Change signals consumed by the index-serving layer.
//!
//! The pipeline never recomputes digests. It clears the matching row of the
//! `checksums` table and lets the consumer rebuild lazily on next read.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeSignal {
  /// The package name list changed.
  Names,
  /// The version list changed.
  Versions,
  /// The dependency set of one version changed.
  Version(i64),
}

impl ChangeSignal {
  /// Name of the `checksums` row this signal clears.
  pub fn checksum_name(&self) -> String {
    match self {
      Self::Names => "names".to_owned(),
      Self::Versions => "versions".to_owned(),
      Self::Version(id) => format!("version/{id}"),
    }
  }
}

impl fmt::Display for ChangeSignal {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Names => f.write_str("invalidate names"),
      Self::Versions => f.write_str("invalidate versions"),
      Self::Version(id) => write!(f, "invalidate version {id}"),
    }
  }
}
