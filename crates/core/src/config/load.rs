use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::paths::{global_config_path, project_config_path};
use super::types::{
  AckSettings, Config, JournalSettings, LockSettings, LogLevel, RateSettings, Result, TmuxSettings,
};

/// Load configuration by resolving the default global and project paths.
/// Project config overrides global; both override defaults.
pub fn load(project_root: Option<&Path>) -> Result<Config> {
  let mut cfg = Config::default();

  if let Some(global_path) = global_config_path()
    && let Ok(data) = fs::read_to_string(&global_path)
  {
    let partial: PartialConfig = toml::from_str(&data)?;
    cfg = partial.merge_over(cfg);
  }

  if let Some(root) = project_root {
    let project_path = project_config_path(root);
    if let Ok(data) = fs::read_to_string(&project_path) {
      let partial: PartialConfig = toml::from_str(&data)?;
      cfg = partial.merge_over(cfg);
    }
  }

  Ok(cfg)
}

/// Test helper: load configuration from explicit file paths (if present).
#[cfg(test)]
pub(crate) fn load_from_paths(global: Option<&Path>, project: Option<&Path>) -> Result<Config> {
  let mut cfg = Config::default();

  if let Some(path) = global
    && let Ok(data) = fs::read_to_string(path)
  {
    let partial: PartialConfig = toml::from_str(&data)?;
    cfg = partial.merge_over(cfg);
  }

  if let Some(path) = project
    && let Ok(data) = fs::read_to_string(path)
  {
    let partial: PartialConfig = toml::from_str(&data)?;
    cfg = partial.merge_over(cfg);
  }

  Ok(cfg)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
struct PartialLockSettings {
  pub stale_timeout_secs: Option<u64>,
  pub write_attempts: Option<u32>,
}

impl PartialLockSettings {
  fn merge_over(self, base: LockSettings) -> LockSettings {
    LockSettings {
      stale_timeout_secs: self.stale_timeout_secs.unwrap_or(base.stale_timeout_secs),
      write_attempts: self.write_attempts.unwrap_or(base.write_attempts),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
struct PartialRateSettings {
  pub max_messages: Option<usize>,
  pub window_secs: Option<u64>,
}

impl PartialRateSettings {
  fn merge_over(self, base: RateSettings) -> RateSettings {
    RateSettings {
      max_messages: self.max_messages.unwrap_or(base.max_messages),
      window_secs: self.window_secs.unwrap_or(base.window_secs),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
struct PartialAckSettings {
  pub max_retries: Option<u32>,
  pub retry_delays_secs: Option<Vec<u64>>,
  pub default_timeout_secs: Option<u64>,
}

impl PartialAckSettings {
  fn merge_over(self, base: AckSettings) -> AckSettings {
    AckSettings {
      max_retries: self.max_retries.unwrap_or(base.max_retries),
      retry_delays_secs: self.retry_delays_secs.unwrap_or(base.retry_delays_secs),
      default_timeout_secs: self.default_timeout_secs.unwrap_or(base.default_timeout_secs),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
struct PartialJournalSettings {
  pub max_bytes: Option<u64>,
}

impl PartialJournalSettings {
  fn merge_over(self, base: JournalSettings) -> JournalSettings {
    JournalSettings {
      max_bytes: self.max_bytes.unwrap_or(base.max_bytes),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
struct PartialTmuxSettings {
  pub socket_path: Option<String>,
}

impl PartialTmuxSettings {
  fn merge_over(self, base: TmuxSettings) -> TmuxSettings {
    TmuxSettings {
      socket_path: self.socket_path.or(base.socket_path),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
struct PartialConfig {
  pub log_level: Option<LogLevel>,
  pub locks: Option<PartialLockSettings>,
  pub rate: Option<PartialRateSettings>,
  pub ack: Option<PartialAckSettings>,
  pub journal: Option<PartialJournalSettings>,
  pub tmux: Option<PartialTmuxSettings>,
}

impl PartialConfig {
  fn merge_over(self, base: Config) -> Config {
    Config {
      log_level: self.log_level.unwrap_or(base.log_level),
      locks: self.locks.unwrap_or_default().merge_over(base.locks),
      rate: self.rate.unwrap_or_default().merge_over(base.rate),
      ack: self.ack.unwrap_or_default().merge_over(base.ack),
      journal: self.journal.unwrap_or_default().merge_over(base.journal),
      tmux: self.tmux.unwrap_or_default().merge_over(base.tmux),
    }
  }
}
