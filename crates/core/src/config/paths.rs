use std::path::{Path, PathBuf};

/// Location of the global config file (~/.config/parley/config.toml)
pub fn global_config_path() -> Option<PathBuf> {
  dirs::config_dir().map(|p| p.join("parley").join("config.toml"))
}

/// Location of the project config file (./.parley/config.toml)
pub fn project_config_path(project_root: &Path) -> PathBuf {
  project_root.join(".parley").join("config.toml")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn project_path_is_under_parley_dir() {
    let p = project_config_path(Path::new("/repo"));
    assert_eq!(p, PathBuf::from("/repo/.parley/config.toml"));
  }
}
