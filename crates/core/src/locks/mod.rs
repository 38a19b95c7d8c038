mod pattern;

pub use pattern::{is_pattern, overlaps};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::clock::Clock;
use crate::config::LockSettings;
use crate::domain::lock::{LockConflict, LockRecord};

#[derive(Debug, Error)]
pub enum LockError {
  #[error("io: {0}")]
  Io(#[from] io::Error),
  #[error("json: {0}")]
  Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LockError>;

/// Outcome of an acquisition attempt. Contention is a value, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Acquisition {
  Granted,
  Held(LockConflict),
}

impl Acquisition {
  pub fn is_granted(&self) -> bool {
    matches!(self, Acquisition::Granted)
  }

  pub fn conflict(&self) -> Option<&LockConflict> {
    match self {
      Acquisition::Granted => None,
      Acquisition::Held(conflict) => Some(conflict),
    }
  }
}

const WRITE_BACKOFF_BASE_MS: u64 = 25;
const WRITE_BACKOFF_CAP_MS: u64 = 400;
/// A write slot older than this was left by a crashed writer and may be removed.
const STALE_SLOT: Duration = Duration::from_secs(10);

/// Exclusive ownership of named resources (paths or globs) for one project,
/// stored one JSON record per resource so ownership checks never contend on
/// a shared index.
pub struct LockManager {
  dir: PathBuf,
  stale_timeout_secs: u64,
  write_attempts: u32,
  clock: Arc<dyn Clock>,
  // Serializes callers within this process; cross-process safety comes from
  // the exclusive-create write slot below.
  guard: Mutex<()>,
}

impl LockManager {
  pub fn new(dir: PathBuf, settings: &LockSettings, clock: Arc<dyn Clock>) -> Self {
    Self {
      dir,
      stale_timeout_secs: settings.stale_timeout_secs,
      write_attempts: settings.write_attempts.max(1),
      clock,
      guard: Mutex::new(()),
    }
  }

  /// Claim `resource` for `agent_id`, refreshing a lock the agent already
  /// holds and reclaiming stale ones. Returns the current holder as a
  /// conflict value when the resource (or an overlapping glob) is taken.
  pub fn acquire(&self, resource: &str, agent_id: &str, reason: &str) -> Result<Acquisition> {
    let _in_process = self.guard.lock();
    fs::create_dir_all(&self.dir)?;

    for attempt in 0..self.write_attempts {
      let now = self.clock.now_epoch();
      if let Some(conflict) = self.scan_conflicts(resource, agent_id, now)? {
        return Ok(Acquisition::Held(conflict));
      }
      let record = LockRecord {
        agent_id: agent_id.to_string(),
        filepath: resource.to_string(),
        locked_at: now,
        reason: reason.to_string(),
      };
      match self.write_record(&record) {
        Ok(()) => {
          tracing::debug!(resource, agent_id, "lock acquired");
          return Ok(Acquisition::Granted);
        }
        Err(WriteSlotError::Race) => {
          // Another writer owns the slot right now; back off and rescan.
          std::thread::sleep(backoff_delay(attempt));
        }
        Err(WriteSlotError::Io(err)) => return Err(err.into()),
        Err(WriteSlotError::Json(err)) => return Err(err.into()),
      }
    }

    // Retry budget exhausted: surface whatever is on disk as the conflict.
    let now = self.clock.now_epoch();
    let conflict = self
      .read_record(resource)?
      .map(|record| LockConflict::from_record(&record))
      .unwrap_or_else(|| LockConflict {
        holder: "unknown".to_string(),
        resource: resource.to_string(),
        locked_at: now,
        reason: String::new(),
      });
    Ok(Acquisition::Held(conflict))
  }

  /// Release a lock. Idempotent: releasing an absent lock succeeds; releasing
  /// another agent's lock fails without side effects.
  pub fn release(&self, resource: &str, agent_id: &str) -> Result<bool> {
    let _in_process = self.guard.lock();
    let path = self.record_path(resource);
    match self.read_record(resource)? {
      None => {
        // Absent, or corrupt and therefore treated as absent
        if path.exists() {
          fs::remove_file(&path)?;
        }
        Ok(true)
      }
      Some(record) if record.agent_id == agent_id => {
        fs::remove_file(&path)?;
        tracing::debug!(resource, agent_id, "lock released");
        Ok(true)
      }
      Some(record) => {
        tracing::debug!(resource, agent_id, holder = %record.agent_id, "release refused");
        Ok(false)
      }
    }
  }

  /// Current holder of the exact resource name, purging it if stale.
  pub fn who_holds(&self, resource: &str) -> Result<Option<LockRecord>> {
    let _in_process = self.guard.lock();
    let now = self.clock.now_epoch();
    match self.read_record(resource)? {
      Some(record) if record.is_stale(now, self.stale_timeout_secs) => {
        fs::remove_file(self.record_path(resource))?;
        tracing::info!(resource, holder = %record.agent_id, "purged stale lock");
        Ok(None)
      }
      other => Ok(other),
    }
  }

  /// Every current lock. Stale records are purged as a side effect unless
  /// `include_stale` asks for them; unreadable records are quarantined.
  pub fn list_all(&self, include_stale: bool) -> Result<Vec<LockRecord>> {
    let _in_process = self.guard.lock();
    let now = self.clock.now_epoch();
    let mut records = Vec::new();
    for path in self.record_files()? {
      match read_record_file(&path) {
        Some(record) => {
          if record.is_stale(now, self.stale_timeout_secs) {
            if include_stale {
              records.push(record);
            } else {
              fs::remove_file(&path)?;
              tracing::info!(resource = %record.filepath, holder = %record.agent_id, "purged stale lock");
            }
          } else {
            records.push(record);
          }
        }
        None => quarantine(&path),
      }
    }
    records.sort_by(|a, b| a.filepath.cmp(&b.filepath));
    Ok(records)
  }

  /// Remove every stale record, returning how many were reclaimed.
  pub fn cleanup_stale(&self) -> Result<usize> {
    let _in_process = self.guard.lock();
    let now = self.clock.now_epoch();
    let mut removed = 0;
    for path in self.record_files()? {
      if let Some(record) = read_record_file(&path)
        && record.is_stale(now, self.stale_timeout_secs)
      {
        fs::remove_file(&path)?;
        tracing::info!(resource = %record.filepath, holder = %record.agent_id, "purged stale lock");
        removed += 1;
      }
    }
    Ok(removed)
  }

  /// Remove every lock held by `agent_id` (fresh or stale), e.g. after a
  /// crash, returning how many were released.
  pub fn cleanup_for_agent(&self, agent_id: &str) -> Result<usize> {
    let _in_process = self.guard.lock();
    let mut removed = 0;
    for path in self.record_files()? {
      if let Some(record) = read_record_file(&path)
        && record.agent_id == agent_id
      {
        fs::remove_file(&path)?;
        removed += 1;
      }
    }
    if removed > 0 {
      tracing::info!(agent_id, removed, "released all locks for agent");
    }
    Ok(removed)
  }

  /// Find a live record conflicting with `resource`, deleting stale
  /// conflicting records along the way. The requester's own records never
  /// conflict (re-acquisition refreshes them).
  fn scan_conflicts(
    &self,
    resource: &str,
    agent_id: &str,
    now: f64,
  ) -> Result<Option<LockConflict>> {
    for path in self.record_files()? {
      // Corrupt records are treated as absent; the next write replaces them.
      let Some(record) = read_record_file(&path) else {
        continue;
      };
      if !overlaps(resource, &record.filepath) || record.agent_id == agent_id {
        continue;
      }
      if record.is_stale(now, self.stale_timeout_secs) {
        fs::remove_file(&path)?;
        tracing::info!(
          resource = %record.filepath,
          holder = %record.agent_id,
          age_secs = record.age_secs(now) as u64,
          "reclaimed stale lock"
        );
        continue;
      }
      return Ok(Some(LockConflict::from_record(&record)));
    }
    Ok(None)
  }

  /// Publish a record through an exclusive-create slot plus atomic rename,
  /// so concurrent writers race on the create and readers never observe a
  /// half-written file.
  fn write_record(&self, record: &LockRecord) -> std::result::Result<(), WriteSlotError> {
    let final_path = self.record_path(&record.filepath);
    let name = final_path.file_name().unwrap_or_default().to_string_lossy();
    let slot = final_path.with_file_name(format!("{name}.tmp"));
    match fs::OpenOptions::new().write(true).create_new(true).open(&slot) {
      Ok(file) => {
        if let Err(err) = serde_json::to_writer_pretty(&file, record) {
          drop(file);
          let _ = fs::remove_file(&slot);
          return Err(WriteSlotError::Json(err));
        }
        drop(file);
        fs::rename(&slot, &final_path).map_err(WriteSlotError::Io)
      }
      Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
        remove_stale_slot(&slot);
        Err(WriteSlotError::Race)
      }
      Err(err) => Err(WriteSlotError::Io(err)),
    }
  }

  fn read_record(&self, resource: &str) -> Result<Option<LockRecord>> {
    let path = self.record_path(resource);
    if !path.exists() {
      return Ok(None);
    }
    Ok(read_record_file(&path))
  }

  fn record_files(&self) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if !self.dir.exists() {
      return Ok(files);
    }
    for entry in fs::read_dir(&self.dir)? {
      let path = entry?.path();
      if path.extension().is_some_and(|ext| ext == "json") {
        files.push(path);
      }
    }
    files.sort();
    Ok(files)
  }

  fn record_path(&self, resource: &str) -> PathBuf {
    self.dir.join(format!("{}.json", lock_file_stem(resource)))
  }
}

enum WriteSlotError {
  /// Lost the exclusive-create race against a concurrent writer
  Race,
  Io(io::Error),
  Json(serde_json::Error),
}

/// Deterministic filename for a resource: a readable slug plus a content
/// hash, so distinct resources never collide after sanitization.
fn lock_file_stem(resource: &str) -> String {
  let mut slug: String = resource
    .chars()
    .map(|c| {
      if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
        c
      } else {
        '_'
      }
    })
    .collect();
  slug.truncate(40);
  let digest = Sha256::digest(resource.as_bytes());
  let short: String = digest.iter().take(4).map(|b| format!("{b:02x}")).collect();
  format!("{slug}-{short}")
}

fn read_record_file(path: &Path) -> Option<LockRecord> {
  let data = fs::read_to_string(path).ok()?;
  match serde_json::from_str(&data) {
    Ok(record) => Some(record),
    Err(err) => {
      tracing::warn!(path = %path.display(), %err, "unreadable lock record");
      None
    }
  }
}

fn quarantine(path: &Path) {
  let name = path.file_name().unwrap_or_default().to_string_lossy();
  let target = path.with_file_name(format!("{name}.corrupt"));
  if fs::rename(path, &target).is_ok() {
    tracing::warn!(path = %path.display(), "quarantined corrupt lock record");
  }
}

fn remove_stale_slot(slot: &Path) {
  let Ok(meta) = fs::metadata(slot) else {
    return;
  };
  let abandoned = meta
    .modified()
    .ok()
    .and_then(|t| t.elapsed().ok())
    .is_some_and(|age| age > STALE_SLOT);
  if abandoned && fs::remove_file(slot).is_ok() {
    tracing::warn!(slot = %slot.display(), "removed abandoned lock write slot");
  }
}

fn backoff_delay(attempt: u32) -> Duration {
  let base = WRITE_BACKOFF_BASE_MS
    .saturating_mul(1 << attempt.min(4))
    .min(WRITE_BACKOFF_CAP_MS);
  Duration::from_millis(base + jitter_ms(base / 2 + 1))
}

/// Thread-local xorshift jitter; keeps concurrent retries from synchronizing
/// without pulling in a rand dependency.
fn jitter_ms(range: u64) -> u64 {
  use std::cell::Cell;
  use std::time::{SystemTime, UNIX_EPOCH};

  thread_local! {
    static SEED: Cell<u64> = Cell::new(0);
  }
  SEED.with(|seed| {
    let mut s = seed.get();
    if s == 0 {
      let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos() as u64;
      s = nanos | 1;
    }
    s ^= s << 13;
    s ^= s >> 7;
    s ^= s << 17;
    seed.set(s);
    s % range.max(1)
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn file_stems_are_deterministic_and_distinct() {
    assert_eq!(lock_file_stem("src/*.rs"), lock_file_stem("src/*.rs"));
    assert_ne!(lock_file_stem("src/*.rs"), lock_file_stem("src/?.rs"));
    // Sanitized slugs alone would collide; the hash keeps them apart
    assert_ne!(lock_file_stem("a/b.txt"), lock_file_stem("a_b.txt"));
  }

  #[test]
  fn file_stem_is_filesystem_safe() {
    let stem = lock_file_stem("very/deep/../path with spaces/*.txt");
    assert!(
      stem
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    );
  }

  #[test]
  fn backoff_grows_and_caps() {
    let early = backoff_delay(0);
    assert!(early >= Duration::from_millis(WRITE_BACKOFF_BASE_MS));
    for attempt in 0..10 {
      let d = backoff_delay(attempt);
      assert!(d <= Duration::from_millis(WRITE_BACKOFF_CAP_MS + WRITE_BACKOFF_CAP_MS / 2 + 1));
    }
  }

  #[test]
  fn jitter_stays_in_range() {
    for _ in 0..100 {
      assert!(jitter_ms(10) < 10);
    }
    assert_eq!(jitter_ms(1), 0);
  }
}
