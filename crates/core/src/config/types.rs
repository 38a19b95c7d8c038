use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Log level for the library and CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
  Off,
  Warn,
  #[default]
  Info,
  Debug,
  Trace,
}

/// Lock manager tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockSettings {
  /// Seconds after which a lock may be reclaimed by another agent
  pub stale_timeout_secs: u64,
  /// Bounded attempts for the exclusive-create write slot
  pub write_attempts: u32,
}

impl Default for LockSettings {
  fn default() -> Self {
    Self {
      stale_timeout_secs: 1800,
      write_attempts: 5,
    }
  }
}

/// Per-agent sliding-window admission control
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateSettings {
  pub max_messages: usize,
  pub window_secs: u64,
}

impl Default for RateSettings {
  fn default() -> Self {
    Self {
      max_messages: 10,
      window_secs: 60,
    }
  }
}

/// Acknowledgment retry schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckSettings {
  /// Retries before escalating
  pub max_retries: u32,
  /// Delay before the next retry, indexed by how many retries have already
  /// run; the last entry repeats for any further attempts
  pub retry_delays_secs: Vec<u64>,
  /// Default wait for the first retry when the caller gives no timeout
  pub default_timeout_secs: u64,
}

impl Default for AckSettings {
  fn default() -> Self {
    Self {
      max_retries: 3,
      retry_delays_secs: vec![30, 60, 120, 300],
      default_timeout_secs: 120,
    }
  }
}

/// Delivery journal sizing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalSettings {
  /// Rotate `messages.jsonl` beyond this size
  pub max_bytes: u64,
}

impl Default for JournalSettings {
  fn default() -> Self {
    Self {
      max_bytes: 10 * 1024 * 1024,
    }
  }
}

/// tmux transport plumbing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TmuxSettings {
  /// Explicit tmux server socket; None uses the default server
  pub socket_path: Option<String>,
}

/// Effective configuration after merging defaults, global, and project config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
  pub log_level: LogLevel,
  pub locks: LockSettings,
  pub rate: RateSettings,
  pub ack: AckSettings,
  pub journal: JournalSettings,
  pub tmux: TmuxSettings,
}

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("io: {0}")]
  Io(#[from] std::io::Error),
  #[error("toml: {0}")]
  Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
