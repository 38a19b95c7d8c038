use std::fs;
use std::path::{Path, PathBuf};

/// Return path to the `.parley` folder inside the given project root
pub fn parley_dir(project_root: &Path) -> PathBuf {
  project_root.join(".parley")
}

/// Standard subpaths under `.parley`
pub fn locks_dir(project_root: &Path) -> PathBuf {
  parley_dir(project_root).join("locks")
}

pub fn message_log_path(project_root: &Path) -> PathBuf {
  parley_dir(project_root).join("messages.jsonl")
}

pub fn pending_acks_path(project_root: &Path) -> PathBuf {
  parley_dir(project_root).join("pending_acks.json")
}

pub fn agents_path(project_root: &Path) -> PathBuf {
  parley_dir(project_root).join("agents.json")
}

pub fn logs_path(project_root: &Path) -> PathBuf {
  parley_dir(project_root).join("logs.jsonl")
}

/// Ensure the `.parley` layout exists (directories are created if missing)
pub fn ensure_layout(project_root: &Path) -> std::io::Result<()> {
  fs::create_dir_all(locks_dir(project_root))?;
  Ok(())
}
