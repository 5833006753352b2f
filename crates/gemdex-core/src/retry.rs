//! Bounded retry budgets.

use std::time::Duration;

/// A fixed-delay retry budget. `attempts` counts the first try.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  pub attempts: u32,
  pub delay:    Duration,
}

impl RetryPolicy {
  /// Storage connectivity: two extra tries, thirty seconds apart.
  pub const STORAGE: Self =
    Self { attempts: 3, delay: Duration::from_secs(30) };

  /// Specification fetches: five tries, back to back.
  pub const FETCH: Self = Self { attempts: 5, delay: Duration::ZERO };

  pub fn new(attempts: u32, delay: Duration) -> Self {
    Self { attempts: attempts.max(1), delay }
  }

  /// Policy allowing `retries` tries after the first.
  pub fn with_retries(retries: u32, delay: Duration) -> Self {
    Self::new(retries + 1, delay)
  }
}
