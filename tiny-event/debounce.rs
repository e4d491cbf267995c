//! Utilities for declaring a debounced event stream
//!
//! The editor core is driven by a single-threaded event loop, so a debounce
//! here is not a background task: it is a deadline that the loop polls. Every
//! qualifying event re-arms the deadline, pushing it further into the future;
//! once the loop observes that the deadline has passed, the debounce fires
//! exactly once and disarms itself.

use std::time::{
  Duration,
  Instant,
};

/// A cancellable one-shot timer.
///
/// `arm` replaces any previous deadline (the old timer is cleared, a new one
/// is started), which is the only cancellation primitive the editor needs.
#[derive(Debug, Clone)]
pub struct Debounce {
  delay:    Duration,
  deadline: Option<Instant>,
}

impl Debounce {
  pub const fn new(delay: Duration) -> Self {
    Self {
      delay,
      deadline: None,
    }
  }

  pub fn delay(&self) -> Duration {
    self.delay
  }

  pub fn set_delay(&mut self, delay: Duration) {
    self.delay = delay;
  }

  /// Start (or restart) the timer relative to `now` and return the new
  /// deadline.
  pub fn arm(&mut self, now: Instant) -> Instant {
    let deadline = now + self.delay;
    if self.deadline.replace(deadline).is_some() {
      log::trace!("debounce re-armed, deadline pushed by {:?}", self.delay);
    }
    deadline
  }

  /// Clear the timer. Returns true if a deadline was pending.
  pub fn cancel(&mut self) -> bool {
    self.deadline.take().is_some()
  }

  pub fn deadline(&self) -> Option<Instant> {
    self.deadline
  }

  pub fn is_armed(&self) -> bool {
    self.deadline.is_some()
  }

  /// Time left until the deadline, saturating at zero. `None` when disarmed.
  ///
  /// Hosts use this to bound how long they block waiting for input.
  pub fn remaining(&self, now: Instant) -> Option<Duration> {
    self
      .deadline
      .map(|deadline| deadline.saturating_duration_since(now))
  }

  /// Returns true exactly once per armed deadline, as soon as `now` reaches
  /// it.
  pub fn poll(&mut self, now: Instant) -> bool {
    match self.deadline {
      Some(deadline) if now >= deadline => {
        self.deadline = None;
        true
      },
      _ => false,
    }
  }

  /// Fire immediately if armed, regardless of the deadline. Used when the
  /// host shuts down and wants the last quiet-period action flushed.
  pub fn flush(&mut self) -> bool {
    self.cancel()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const DELAY: Duration = Duration::from_millis(500);

  #[test]
  fn fires_once_after_deadline() {
    let start = Instant::now();
    let mut debounce = Debounce::new(DELAY);
    debounce.arm(start);

    assert!(!debounce.poll(start + Duration::from_millis(499)));
    assert!(debounce.poll(start + DELAY));
    assert!(!debounce.poll(start + DELAY * 2));
    assert!(!debounce.is_armed());
  }

  #[test]
  fn rearming_pushes_the_deadline() {
    let start = Instant::now();
    let mut debounce = Debounce::new(DELAY);
    debounce.arm(start);
    debounce.arm(start + Duration::from_millis(300));

    assert!(!debounce.poll(start + DELAY));
    assert!(debounce.poll(start + Duration::from_millis(800)));
  }

  #[test]
  fn cancel_disarms() {
    let start = Instant::now();
    let mut debounce = Debounce::new(DELAY);
    assert!(!debounce.cancel());

    debounce.arm(start);
    assert!(debounce.cancel());
    assert!(!debounce.poll(start + DELAY));
    assert_eq!(debounce.remaining(start), None);
  }

  #[test]
  fn remaining_saturates() {
    let start = Instant::now();
    let mut debounce = Debounce::new(DELAY);
    debounce.arm(start);

    assert_eq!(debounce.remaining(start), Some(DELAY));
    assert_eq!(debounce.remaining(start + DELAY * 3), Some(Duration::ZERO));
  }
}
