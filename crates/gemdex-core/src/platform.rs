//! Platform normalization and full-identifier derivation.

/// The platform of a pure-Ruby gem; omitted from identifiers and file names.
pub const DEFAULT_PLATFORM: &str = "ruby";

/// Map an index-reported platform onto the platform recorded in storage.
///
/// The index is authoritative, but a few historical aliases are folded onto
/// their canonical names. An empty platform means the default.
pub fn normalize(platform: &str) -> &str {
  match platform.trim() {
    "" => DEFAULT_PLATFORM,
    "jruby" => "java",
    other => other,
  }
}

pub fn is_default(platform: &str) -> bool { platform == DEFAULT_PLATFORM }

/// `name-number`, with `-platform` appended for non-default platforms.
pub fn full_name(name: &str, number: &str, platform: &str) -> String {
  if is_default(platform) {
    format!("{name}-{number}")
  } else {
    format!("{name}-{number}-{platform}")
  }
}

/// Rubygems treats any version containing a letter as a prerelease.
pub fn is_prerelease(number: &str) -> bool {
  number.chars().any(|c| c.is_ascii_alphabetic())
}
