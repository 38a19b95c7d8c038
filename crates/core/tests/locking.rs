use std::fs;
use std::path::Path;
use std::sync::Arc;

use parley_core::config::LockSettings;
use parley_core::locks::LockManager;
use test_support::{ManualClock, TempProject};

fn manager(root: &Path, stale_timeout_secs: u64, clock: Arc<ManualClock>) -> LockManager {
  let settings = LockSettings {
    stale_timeout_secs,
    ..LockSettings::default()
  };
  LockManager::new(
    parley_core::adapters::fs::locks_dir(root),
    &settings,
    clock,
  )
}

#[test]
fn mutual_exclusion_on_exact_name() {
  let project = TempProject::new();
  let clock = Arc::new(ManualClock::new(1000.0));
  let locks = manager(&project.path(), 300, clock);

  assert!(
    locks
      .acquire("shared.txt", "agent-a", "editing")
      .unwrap()
      .is_granted()
  );
  let refused = locks.acquire("shared.txt", "agent-b", "also editing").unwrap();
  let conflict = refused.conflict().expect("conflict");
  assert_eq!(conflict.holder, "agent-a");
  assert_eq!(conflict.resource, "shared.txt");
  assert_eq!(conflict.reason, "editing");
}

#[test]
fn glob_conflicts_both_directions() {
  let project = TempProject::new();
  let clock = Arc::new(ManualClock::new(1000.0));
  let locks = manager(&project.path(), 300, clock);

  // Literal held, pattern requested
  assert!(locks.acquire("notes.txt", "agent-a", "").unwrap().is_granted());
  let refused = locks.acquire("*.txt", "agent-b", "").unwrap();
  assert_eq!(refused.conflict().unwrap().holder, "agent-a");

  // Pattern held, literal requested
  assert!(locks.acquire("src/*.rs", "agent-a", "").unwrap().is_granted());
  let refused = locks.acquire("src/main.rs", "agent-b", "").unwrap();
  assert_eq!(refused.conflict().unwrap().resource, "src/*.rs");

  // Non-overlapping names stay independent
  assert!(locks.acquire("README.md", "agent-b", "").unwrap().is_granted());
}

#[test]
fn reacquire_refreshes_own_lock() {
  let project = TempProject::new();
  let clock = Arc::new(ManualClock::new(1000.0));
  let locks = manager(&project.path(), 300, clock.clone());

  assert!(locks.acquire("shared.txt", "agent-a", "first pass").unwrap().is_granted());
  clock.advance(100.0);
  assert!(locks.acquire("shared.txt", "agent-a", "second pass").unwrap().is_granted());

  let record = locks.who_holds("shared.txt").unwrap().expect("held");
  assert_eq!(record.agent_id, "agent-a");
  assert_eq!(record.reason, "second pass");
  assert_eq!(record.locked_at, 1100.0);
}

#[test]
fn stale_lock_is_reclaimed_by_another_agent() {
  let project = TempProject::new();
  let clock = Arc::new(ManualClock::new(1000.0));
  let locks = manager(&project.path(), 60, clock.clone());

  assert!(locks.acquire("shared.txt", "agent-a", "editing").unwrap().is_granted());
  clock.advance(61.0);

  assert!(locks.acquire("shared.txt", "agent-b", "taking over").unwrap().is_granted());
  let record = locks.who_holds("shared.txt").unwrap().expect("held");
  assert_eq!(record.agent_id, "agent-b");
}

#[test]
fn who_holds_purges_stale_records() {
  let project = TempProject::new();
  let clock = Arc::new(ManualClock::new(1000.0));
  let locks = manager(&project.path(), 60, clock.clone());

  locks.acquire("shared.txt", "agent-a", "").unwrap();
  clock.advance(61.0);

  assert!(locks.who_holds("shared.txt").unwrap().is_none());
  // The record file is gone, not merely filtered
  assert!(locks.list_all(true).unwrap().is_empty());
}

#[test]
fn list_all_purges_stale_unless_included() {
  let project = TempProject::new();
  let clock = Arc::new(ManualClock::new(1000.0));
  let locks = manager(&project.path(), 60, clock.clone());

  locks.acquire("old.txt", "agent-a", "").unwrap();
  clock.advance(61.0);
  locks.acquire("new.txt", "agent-b", "").unwrap();

  let with_stale = locks.list_all(true).unwrap();
  assert_eq!(with_stale.len(), 2);

  let fresh_only = locks.list_all(false).unwrap();
  assert_eq!(fresh_only.len(), 1);
  assert_eq!(fresh_only[0].filepath, "new.txt");

  // The stale record was garbage-collected by the listing itself
  assert_eq!(locks.list_all(true).unwrap().len(), 1);
}

#[test]
fn release_is_idempotent_and_owner_checked() {
  let project = TempProject::new();
  let clock = Arc::new(ManualClock::new(1000.0));
  let locks = manager(&project.path(), 300, clock);

  // Releasing a lock nobody holds succeeds
  assert!(locks.release("shared.txt", "agent-a").unwrap());

  locks.acquire("shared.txt", "agent-a", "editing").unwrap();
  // Another agent cannot release it, and the lock is untouched
  assert!(!locks.release("shared.txt", "agent-b").unwrap());
  assert_eq!(
    locks.who_holds("shared.txt").unwrap().unwrap().agent_id,
    "agent-a"
  );

  assert!(locks.release("shared.txt", "agent-a").unwrap());
  assert!(locks.who_holds("shared.txt").unwrap().is_none());
  // And again, after it is already gone
  assert!(locks.release("shared.txt", "agent-a").unwrap());
}

#[test]
fn cleanup_stale_counts_reclaimed_records() {
  let project = TempProject::new();
  let clock = Arc::new(ManualClock::new(1000.0));
  let locks = manager(&project.path(), 60, clock.clone());

  locks.acquire("a.txt", "agent-a", "").unwrap();
  locks.acquire("b.txt", "agent-a", "").unwrap();
  clock.advance(61.0);
  locks.acquire("c.txt", "agent-b", "").unwrap();

  assert_eq!(locks.cleanup_stale().unwrap(), 2);
  assert_eq!(locks.cleanup_stale().unwrap(), 0);
  assert_eq!(locks.list_all(true).unwrap().len(), 1);
}

#[test]
fn cleanup_for_agent_releases_everything_it_held() {
  let project = TempProject::new();
  let clock = Arc::new(ManualClock::new(1000.0));
  let locks = manager(&project.path(), 300, clock);

  locks.acquire("a.txt", "agent-a", "").unwrap();
  locks.acquire("src/*.rs", "agent-a", "").unwrap();
  locks.acquire("b.txt", "agent-b", "").unwrap();

  assert_eq!(locks.cleanup_for_agent("agent-a").unwrap(), 2);
  assert_eq!(locks.cleanup_for_agent("agent-a").unwrap(), 0);

  let remaining = locks.list_all(false).unwrap();
  assert_eq!(remaining.len(), 1);
  assert_eq!(remaining[0].agent_id, "agent-b");
}

#[test]
fn corrupt_record_fails_open() {
  let project = TempProject::new();
  let clock = Arc::new(ManualClock::new(1000.0));
  let locks = manager(&project.path(), 300, clock);

  locks.acquire("shared.txt", "agent-a", "").unwrap();

  // Corrupt the record on disk
  let dir = parley_core::adapters::fs::locks_dir(&project.path());
  let record = fs::read_dir(&dir)
    .unwrap()
    .map(|e| e.unwrap().path())
    .find(|p| p.extension().is_some_and(|e| e == "json"))
    .expect("record file");
  fs::write(&record, "{truncated").unwrap();

  // The bad record does not block anyone; the next acquire replaces it
  assert!(locks.acquire("shared.txt", "agent-b", "rescue").unwrap().is_granted());
  let holder = locks.who_holds("shared.txt").unwrap().expect("held");
  assert_eq!(holder.agent_id, "agent-b");
}

#[test]
fn only_one_thread_wins_a_contended_resource() {
  let project = TempProject::new();
  let clock = Arc::new(ManualClock::new(1000.0));
  let locks = Arc::new(manager(&project.path(), 300, clock));

  let mut handles = Vec::new();
  for i in 0..8 {
    let locks = locks.clone();
    handles.push(std::thread::spawn(move || {
      let agent = format!("agent-{i}");
      locks
        .acquire("shared.txt", &agent, "racing")
        .unwrap()
        .is_granted()
    }));
  }
  let granted = handles
    .into_iter()
    .map(|handle| handle.join().unwrap())
    .filter(|&granted| granted)
    .count();
  assert_eq!(granted, 1);
}

#[test]
fn lock_then_glob_then_release_scenario() {
  let project = TempProject::new();
  let clock = Arc::new(ManualClock::new(1000.0));
  let locks = manager(&project.path(), 300, clock);

  assert!(locks.acquire("shared.txt", "agent-a", "editing").unwrap().is_granted());

  let refused = locks.acquire("*.txt", "agent-b", "sweep").unwrap();
  assert_eq!(refused.conflict().unwrap().holder, "agent-a");

  assert!(locks.release("shared.txt", "agent-a").unwrap());
  assert!(locks.acquire("*.txt", "agent-b", "sweep").unwrap().is_granted());
}
