use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::clock::Clock;

/// Per-agent sliding-window admission gate.
///
/// Knows nothing about delivery: callers check [`allow`](Self::allow) before
/// attempting a send and call [`record`](Self::record) when a unit of quota
/// is actually consumed.
pub struct RateLimiter {
  max_messages: usize,
  window_secs: f64,
  clock: Arc<dyn Clock>,
  sent: Mutex<HashMap<String, VecDeque<f64>>>,
}

impl RateLimiter {
  pub fn new(max_messages: usize, window_secs: u64, clock: Arc<dyn Clock>) -> Self {
    Self {
      max_messages,
      window_secs: window_secs as f64,
      clock,
      sent: Mutex::new(HashMap::new()),
    }
  }

  /// True when the agent still has quota in the current window.
  pub fn allow(&self, agent_id: &str) -> bool {
    let now = self.clock.now_epoch();
    let mut sent = self.sent.lock();
    let queue = sent.entry(agent_id.to_string()).or_default();
    Self::prune(queue, now, self.window_secs);
    queue.len() < self.max_messages
  }

  /// Consume one unit of quota for the agent.
  pub fn record(&self, agent_id: &str) {
    let now = self.clock.now_epoch();
    let mut sent = self.sent.lock();
    let queue = sent.entry(agent_id.to_string()).or_default();
    Self::prune(queue, now, self.window_secs);
    queue.push_back(now);
    // The queue stays bounded even if callers skip the allow() gate
    while queue.len() > self.max_messages {
      queue.pop_front();
    }
  }

  /// Forget the agent's history entirely.
  pub fn reset(&self, agent_id: &str) {
    self.sent.lock().remove(agent_id);
  }

  fn prune(queue: &mut VecDeque<f64>, now: f64, window_secs: f64) {
    while queue.front().is_some_and(|t| now - *t >= window_secs) {
      queue.pop_front();
    }
  }
}
