use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::Serialize;

use crate::domain::message::{Message, MessageType};

/// One line of `messages.jsonl`.
#[derive(Debug, Serialize)]
struct JournalEntry<'a> {
  timestamp: f64,
  msg_id: &'a str,
  sender: &'a str,
  recipients: &'a [String],
  msg_type: MessageType,
  content: &'a str,
  delivery_status: &'a BTreeMap<String, bool>,
  success_count: usize,
  failure_count: usize,
}

/// Append-only delivery journal with a single rotated `.old` generation.
pub struct DeliveryLog {
  path: PathBuf,
  max_bytes: u64,
  guard: Mutex<()>,
}

impl DeliveryLog {
  pub fn new(path: PathBuf, max_bytes: u64) -> Self {
    Self {
      path,
      max_bytes,
      guard: Mutex::new(()),
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Append one entry for a dispatched message, rotating first when the
  /// journal has outgrown its limit.
  pub fn append(&self, msg: &Message) -> io::Result<()> {
    let _guard = self.guard.lock();
    self.rotate_if_needed()?;

    let entry = JournalEntry {
      timestamp: msg.timestamp,
      msg_id: &msg.msg_id,
      sender: &msg.sender,
      recipients: &msg.recipients,
      msg_type: msg.msg_type,
      content: &msg.content,
      delivery_status: &msg.delivery_status,
      success_count: msg.success_count(),
      failure_count: msg.failure_count(),
    };
    let line = serde_json::to_string(&entry).map_err(io::Error::other)?;

    if let Some(parent) = self.path.parent() {
      fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
    writeln!(file, "{line}")?;
    Ok(())
  }

  fn rotate_if_needed(&self) -> io::Result<()> {
    let size = match fs::metadata(&self.path) {
      Ok(meta) => meta.len(),
      Err(_) => return Ok(()),
    };
    if size <= self.max_bytes {
      return Ok(());
    }
    let name = self.path.file_name().unwrap_or_default().to_string_lossy();
    let old = self.path.with_file_name(format!("{name}.old"));
    fs::rename(&self.path, &old)?;
    tracing::info!(path = %self.path.display(), size, "rotated delivery journal");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn message(content: &str) -> Message {
    let mut msg =
      Message::new("a", vec!["b".into()], MessageType::Info, content, 42.0).unwrap();
    msg.delivery_status.insert("b".into(), true);
    msg
  }

  #[test]
  fn appends_one_json_line_per_message() {
    let td = tempfile::tempdir().unwrap();
    let journal = DeliveryLog::new(td.path().join("messages.jsonl"), 1024 * 1024);
    journal.append(&message("one")).unwrap();
    journal.append(&message("two")).unwrap();

    let data = fs::read_to_string(journal.path()).unwrap();
    let lines: Vec<&str> = data.lines().collect();
    assert_eq!(lines.len(), 2);
    let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(parsed["sender"], "a");
    assert_eq!(parsed["msg_type"], "info");
    assert_eq!(parsed["success_count"], 1);
    assert_eq!(parsed["failure_count"], 0);
    assert_eq!(parsed["delivery_status"]["b"], true);
  }

  #[test]
  fn rotates_to_a_single_old_generation() {
    let td = tempfile::tempdir().unwrap();
    let path = td.path().join("messages.jsonl");
    let journal = DeliveryLog::new(path.clone(), 64);

    for i in 0..20 {
      journal.append(&message(&format!("msg {i}"))).unwrap();
    }

    let old = td.path().join("messages.jsonl.old");
    assert!(old.exists(), "journal never rotated");
    assert!(path.exists());
    // Only one prior generation is kept
    assert!(!td.path().join("messages.jsonl.old.old").exists());
  }
}
