//! Core library for parley: coordination between independent terminal agents
//! that share one project workspace and communicate only through the
//! filesystem and tmux panes.
//!
//! The pieces:
//! - [`locks::LockManager`] — exclusive ownership of files/globs with
//!   staleness reclamation, one JSON record per resource.
//! - [`ratelimit::RateLimiter`] — per-agent sliding-window admission gate.
//! - [`messaging::Messenger`] — validated, rate-limited delivery with a
//!   JSONL journal.
//! - [`ack::AckEngine`] — at-least-once confirmation tracking with retries
//!   and escalation.
//!
//! Everything hangs off a [`Hub`], constructed once per project root, so
//! several projects can coexist in one process:
//!
//! ```no_run
//! use parley_core::Hub;
//!
//! let hub = Hub::open(std::path::Path::new(".")).unwrap();
//! let outcome = hub
//!   .locks
//!   .acquire("src/*.rs", "refactor-bot", "renaming modules")
//!   .unwrap();
//! ```

pub mod ack;
pub mod adapters;
pub mod clock;
pub mod config;
pub mod delivery;
pub mod directory;
pub mod domain;
pub mod locks;
pub mod logging;
pub mod messaging;
pub mod ratelimit;
pub mod store;

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use crate::ack::AckEngine;
use crate::adapters::fs as fsutil;
use crate::adapters::tmux::TmuxChannel;
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::delivery::DeliveryChannel;
use crate::directory::FileDirectory;
use crate::locks::LockManager;
use crate::messaging::{DeliveryLog, Messenger};
use crate::ratelimit::RateLimiter;
use crate::store::StateFile;

/// All coordination state for one project root. Cross-process coordination
/// goes through the files under `.parley/`; within a process every component
/// is safe for concurrent callers.
pub struct Hub {
  pub config: Config,
  pub channel: Arc<dyn DeliveryChannel>,
  pub locks: LockManager,
  pub directory: Arc<FileDirectory>,
  pub messenger: Arc<Messenger>,
  pub acks: AckEngine,
}

impl Hub {
  /// Open a hub for `root` with the tmux transport and the project's agent
  /// registry, loading config from defaults, the global file, and
  /// `.parley/config.toml`.
  pub fn open(root: &Path) -> config::Result<Self> {
    let config = config::load(Some(root))?;
    let socket = config.tmux.socket_path.clone().map(PathBuf::from);
    let channel = Arc::new(TmuxChannel::new(socket));
    Self::with_transport(root, config, channel, Arc::new(SystemClock))
  }

  /// Open a hub over an explicit transport and clock. Used by tests and by
  /// embedders that deliver through something other than tmux.
  pub fn with_transport(
    root: &Path,
    config: Config,
    channel: Arc<dyn DeliveryChannel>,
    clock: Arc<dyn Clock>,
  ) -> config::Result<Self> {
    fsutil::ensure_layout(root)?;
    let directory = Arc::new(FileDirectory::new(fsutil::agents_path(root)));
    let locks = LockManager::new(fsutil::locks_dir(root), &config.locks, clock.clone());
    let limiter = RateLimiter::new(
      config.rate.max_messages,
      config.rate.window_secs,
      clock.clone(),
    );
    let journal = DeliveryLog::new(fsutil::message_log_path(root), config.journal.max_bytes);
    let messenger = Arc::new(Messenger::new(
      channel.clone(),
      directory.clone(),
      limiter,
      journal,
      clock.clone(),
    ));
    let acks = AckEngine::new(
      messenger.clone(),
      StateFile::new(fsutil::pending_acks_path(root)),
      &config.ack,
      clock,
    );
    Ok(Self {
      config,
      channel,
      locks,
      directory,
      messenger,
      acks,
    })
  }
}
