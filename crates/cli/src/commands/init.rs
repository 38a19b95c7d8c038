use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use parley_core::adapters::fs as fsutil;
use parley_core::config::project_config_path;

use crate::output::t;

/// Config template with every option commented out for documentation.
const CONFIG_TEMPLATE: &str = r#"# parley project configuration
# Every key is optional; the values below are the defaults.

# log_level = "info"

# [locks]
# stale_timeout_secs = 1800
# write_attempts = 5

# [rate]
# max_messages = 10
# window_secs = 60

# [ack]
# max_retries = 3
# retry_delays_secs = [30, 60, 120, 300]
# default_timeout_secs = 120

# [journal]
# max_bytes = 10485760

# [tmux]
# socket_path = "/tmp/parley-tmux.sock"
"#;

pub fn run(root: &Path) -> Result<()> {
  fsutil::ensure_layout(root).context("create .parley layout")?;

  let config_path = project_config_path(root);
  if config_path.exists() {
    anstream::println!("{} already exists", t::resource(config_path.display()));
  } else {
    fs::write(&config_path, CONFIG_TEMPLATE)
      .with_context(|| format!("write {}", config_path.display()))?;
    anstream::println!("wrote {}", t::resource(config_path.display()));
  }
  anstream::println!("{}", t::ok("parley initialized"));
  Ok(())
}
