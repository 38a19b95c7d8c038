//! Shared helpers for parley tests: temp project roots, a recording fake
//! transport, an in-memory directory, and a manually advanced clock.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use parking_lot::Mutex;
use parley_core::clock::Clock;
use parley_core::delivery::{AgentDirectory, DeliveryChannel};

/// Temporary project root with a `.parley` layout.
pub struct TempProject {
  pub root: tempfile::TempDir,
}

impl Default for TempProject {
  fn default() -> Self {
    Self::new()
  }
}

impl TempProject {
  pub fn new() -> Self {
    let root = tempfile::tempdir().expect("tempdir");
    parley_core::adapters::fs::ensure_layout(root.path()).expect("layout");
    Self { root }
  }

  pub fn path(&self) -> PathBuf {
    self.root.path().to_path_buf()
  }
}

/// Deterministic clock advanced explicitly by tests.
pub struct ManualClock {
  now: Mutex<f64>,
}

impl ManualClock {
  pub fn new(start: f64) -> Self {
    Self {
      now: Mutex::new(start),
    }
  }

  pub fn advance(&self, secs: f64) {
    *self.now.lock() += secs;
  }

  pub fn set(&self, now: f64) {
    *self.now.lock() = now;
  }
}

impl Clock for ManualClock {
  fn now_epoch(&self) -> f64 {
    *self.now.lock()
  }
}

/// Records every delivery; individual targets can be scripted to fail.
#[derive(Default)]
pub struct FakeChannel {
  sent: Mutex<Vec<(String, String)>>,
  failing: Mutex<BTreeSet<String>>,
}

impl FakeChannel {
  pub fn new() -> Self {
    Self::default()
  }

  /// Make every delivery to `target` fail until healed.
  pub fn fail_target(&self, target: &str) {
    self.failing.lock().insert(target.to_string());
  }

  pub fn heal_target(&self, target: &str) {
    self.failing.lock().remove(target);
  }

  /// Every (target, text) pair delivered so far, in order.
  pub fn deliveries(&self) -> Vec<(String, String)> {
    self.sent.lock().clone()
  }

  /// Texts delivered to one target, in order.
  pub fn sent_to(&self, target: &str) -> Vec<String> {
    self
      .sent
      .lock()
      .iter()
      .filter(|(t, _)| t == target)
      .map(|(_, text)| text.clone())
      .collect()
  }

  pub fn delivery_count(&self) -> usize {
    self.sent.lock().len()
  }
}

impl DeliveryChannel for FakeChannel {
  fn send(&self, target: &str, text: &str) -> bool {
    if self.failing.lock().contains(target) {
      return false;
    }
    self
      .sent
      .lock()
      .push((target.to_string(), text.to_string()));
    true
  }

  fn verify(&self, target: &str) -> bool {
    !self.failing.lock().contains(target)
  }
}

/// In-memory directory for unit tests that skip the file registry.
#[derive(Default)]
pub struct FakeDirectory {
  agents: Mutex<BTreeMap<String, String>>,
}

impl FakeDirectory {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&self, agent_id: &str, target: &str) {
    self
      .agents
      .lock()
      .insert(agent_id.to_string(), target.to_string());
  }
}

impl AgentDirectory for FakeDirectory {
  fn resolve(&self, agent_id: &str) -> Option<String> {
    self.agents.lock().get(agent_id).cloned()
  }

  fn list_agents(&self, excluding: Option<&str>) -> Vec<String> {
    self
      .agents
      .lock()
      .keys()
      .filter(|id| excluding != Some(id.as_str()))
      .cloned()
      .collect()
  }
}
