use std::fmt;

use serde::{Deserialize, Serialize};

/// Durable record of one held lock: one JSON file per resource under
/// `.parley/locks`. Field names are part of the on-disk format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockRecord {
  pub agent_id: String,
  /// Resource name or glob pattern the lock covers
  pub filepath: String,
  /// Epoch seconds at acquisition (or last refresh)
  pub locked_at: f64,
  pub reason: String,
}

impl LockRecord {
  pub fn age_secs(&self, now: f64) -> f64 {
    (now - self.locked_at).max(0.0)
  }

  /// A record older than the timeout may be reclaimed by any agent.
  pub fn is_stale(&self, now: f64, stale_timeout_secs: u64) -> bool {
    now - self.locked_at > stale_timeout_secs as f64
  }
}

/// Why an acquisition was refused. Returned as a value, never raised, so the
/// caller decides whether to wait, fail, or escalate.
#[derive(Debug, Clone, PartialEq)]
pub struct LockConflict {
  pub holder: String,
  /// The conflicting held resource (may be a glob overlapping the request)
  pub resource: String,
  pub locked_at: f64,
  pub reason: String,
}

impl LockConflict {
  pub fn from_record(record: &LockRecord) -> Self {
    LockConflict {
      holder: record.agent_id.clone(),
      resource: record.filepath.clone(),
      locked_at: record.locked_at,
      reason: record.reason.clone(),
    }
  }

  pub fn age_secs(&self, now: f64) -> f64 {
    (now - self.locked_at).max(0.0)
  }
}

impl fmt::Display for LockConflict {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} is held by {}", self.resource, self.holder)?;
    if !self.reason.is_empty() {
      write!(f, " ({})", self.reason)?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn staleness_boundary() {
    let record = LockRecord {
      agent_id: "a".into(),
      filepath: "shared.txt".into(),
      locked_at: 100.0,
      reason: "editing".into(),
    };
    assert!(!record.is_stale(100.0 + 30.0, 30));
    assert!(record.is_stale(100.0 + 30.1, 30));
    assert_eq!(record.age_secs(130.0), 30.0);
    assert_eq!(record.age_secs(50.0), 0.0);
  }

  #[test]
  fn conflict_display_mentions_holder_and_reason() {
    let record = LockRecord {
      agent_id: "agent-a".into(),
      filepath: "*.txt".into(),
      locked_at: 0.0,
      reason: "bulk rename".into(),
    };
    let conflict = LockConflict::from_record(&record);
    let shown = conflict.to_string();
    assert!(shown.contains("agent-a"));
    assert!(shown.contains("*.txt"));
    assert!(shown.contains("bulk rename"));
  }

  #[test]
  fn record_serde_uses_wire_field_names() {
    let record = LockRecord {
      agent_id: "a".into(),
      filepath: "x".into(),
      locked_at: 1.5,
      reason: "r".into(),
    };
    let json = serde_json::to_value(&record).unwrap();
    assert!(json.get("agent_id").is_some());
    assert!(json.get("filepath").is_some());
    assert!(json.get("locked_at").is_some());
    assert!(json.get("reason").is_some());
  }
}
