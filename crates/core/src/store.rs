use std::fs;
use std::io;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("io: {0}")]
  Io(#[from] io::Error),
  #[error("json: {0}")]
  Json(#[from] serde_json::Error),
  #[error("timed out acquiring {} after {attempts} attempts", path.display())]
  LockTimeout { path: PathBuf, attempts: u32 },
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Bounded wait for the cross-process lock; callers never block indefinitely.
const LOCK_WAIT: Duration = Duration::from_secs(10);
const LOCK_RETRY_MAX: Duration = Duration::from_millis(200);

/// A small JSON state file shared between processes.
///
/// Reads and read-modify-write cycles take an advisory lock on a `.lock`
/// sidecar with a bounded wait, so concurrent writers serialize and readers
/// always see a complete document. A missing or unreadable file deserializes
/// to the type's default, with a warning for the unreadable case.
pub struct StateFile<T> {
  path: PathBuf,
  lock_path: PathBuf,
  _marker: PhantomData<T>,
}

impl<T> StateFile<T>
where
  T: Serialize + DeserializeOwned + Default,
{
  pub fn new(path: PathBuf) -> Self {
    let name = path.file_name().unwrap_or_default().to_string_lossy();
    let lock_path = path.with_file_name(format!("{name}.lock"));
    Self {
      path,
      lock_path,
      _marker: PhantomData,
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Read the current state, or the default when absent or unreadable.
  pub fn load(&self) -> Result<T> {
    let _guard = FlockGuard::acquire(&self.lock_path, LOCK_WAIT)?;
    Ok(self.read_unlocked())
  }

  /// Run one load/modify/store cycle under the cross-process lock.
  pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R> {
    let _guard = FlockGuard::acquire(&self.lock_path, LOCK_WAIT)?;
    let mut state = self.read_unlocked();
    let out = f(&mut state);
    self.write_unlocked(&state)?;
    Ok(out)
  }

  fn read_unlocked(&self) -> T {
    match fs::read_to_string(&self.path) {
      Ok(data) => match serde_json::from_str(&data) {
        Ok(state) => state,
        Err(err) => {
          tracing::warn!(path = %self.path.display(), %err, "corrupt state file, starting empty");
          T::default()
        }
      },
      Err(err) if err.kind() == io::ErrorKind::NotFound => T::default(),
      Err(err) => {
        tracing::warn!(path = %self.path.display(), %err, "unreadable state file, starting empty");
        T::default()
      }
    }
  }

  fn write_unlocked(&self, state: &T) -> Result<()> {
    if let Some(parent) = self.path.parent() {
      fs::create_dir_all(parent)?;
    }
    // Temp file + atomic rename so a reader never observes a partial document
    let name = self.path.file_name().unwrap_or_default().to_string_lossy();
    let tmp = self.path.with_file_name(format!("{name}.tmp"));
    fs::write(&tmp, serde_json::to_vec_pretty(state)?)?;
    fs::rename(&tmp, &self.path)?;
    Ok(())
  }
}

/// Advisory cross-process lock on a sidecar file, held for the guard's
/// lifetime and released on drop.
struct FlockGuard {
  file: fs::File,
}

impl FlockGuard {
  fn acquire(path: &Path, wait: Duration) -> Result<Self> {
    use fs2::FileExt;

    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent)?;
    }
    let file = fs::OpenOptions::new()
      .create(true)
      .write(true)
      .truncate(false)
      .open(path)?;

    let deadline = Instant::now() + wait;
    let mut delay = Duration::from_millis(10);
    let mut attempts = 0u32;
    loop {
      attempts += 1;
      match file.try_lock_exclusive() {
        Ok(()) => return Ok(Self { file }),
        Err(_) if Instant::now() < deadline => {
          std::thread::sleep(delay);
          delay = (delay * 2).min(LOCK_RETRY_MAX);
        }
        Err(_) => {
          return Err(StoreError::LockTimeout {
            path: path.to_path_buf(),
            attempts,
          });
        }
      }
    }
  }
}

impl Drop for FlockGuard {
  fn drop(&mut self) {
    let _ = fs2::FileExt::unlock(&self.file);
  }
}
