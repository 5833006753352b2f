//! Requirement clause sets.
//!
//! A dependency's requirement string is a comma-separated list of version
//! constraints. Two requirement strings are equivalent when they contain the
//! same clauses, in any order and with any surrounding whitespace.

use std::{collections::BTreeSet, fmt};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequirementSet(BTreeSet<String>);

impl RequirementSet {
  pub fn parse(requirements: &str) -> Self {
    Self(
      requirements
        .split(',')
        .map(str::trim)
        .filter(|clause| !clause.is_empty())
        .map(str::to_owned)
        .collect(),
    )
  }

  pub fn clauses(&self) -> impl Iterator<Item = &str> {
    self.0.iter().map(String::as_str)
  }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl fmt::Display for RequirementSet {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let joined: Vec<&str> = self.clauses().collect();
    f.write_str(&joined.join(", "))
  }
}

/// Whether two requirement strings name the same clause set.
pub fn equivalent(a: &str, b: &str) -> bool {
  RequirementSet::parse(a) == RequirementSet::parse(b)
}

/// Trim each clause and re-join with `", "`, keeping declaration order.
pub fn normalize(requirements: &str) -> String {
  requirements
    .split(',')
    .map(str::trim)
    .filter(|clause| !clause.is_empty())
    .collect::<Vec<_>>()
    .join(", ")
}
