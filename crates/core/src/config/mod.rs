mod load;
mod paths;
mod types;

pub use load::load;
pub use paths::{global_config_path, project_config_path};
pub use types::{
  AckSettings, Config, ConfigError, JournalSettings, LockSettings, LogLevel, RateSettings, Result,
  TmuxSettings,
};
