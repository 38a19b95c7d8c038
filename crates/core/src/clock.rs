use std::time::{SystemTime, UNIX_EPOCH};

/// Source of "now" as seconds since the Unix epoch.
///
/// Every time-dependent decision (lock staleness, rate windows, retry
/// scheduling) reads through this trait so tests can drive time explicitly.
pub trait Clock: Send + Sync {
  fn now_epoch(&self) -> f64;
}

/// Wall clock used outside of tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now_epoch(&self) -> f64 {
    SystemTime::now()
      .duration_since(UNIX_EPOCH)
      .unwrap_or_default()
      .as_secs_f64()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn system_clock_is_monotonic_enough() {
    let clock = SystemClock;
    let a = clock.now_epoch();
    let b = clock.now_epoch();
    assert!(b >= a);
    assert!(a > 1_000_000_000.0, "epoch seconds expected, got {a}");
  }
}
