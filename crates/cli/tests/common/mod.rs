use std::path::Path;

use assert_cmd::Command;

/// Build a `parley` command targeting the given project root.
pub fn parley(root: &Path) -> Command {
  let mut cmd = Command::cargo_bin("parley").expect("parley binary");
  cmd.arg("--root").arg(root);
  cmd
}

/// Initialize a project and point its tmux transport at a socket that can
/// never exist, so deliveries fail deterministically instead of touching a
/// developer's real tmux server.
pub fn init_project(root: &Path) {
  parley(root).arg("init").assert().success();
  let config = root.join(".parley").join("config.toml");
  std::fs::write(
    &config,
    "[tmux]\nsocket_path = \"/nonexistent/parley-test.sock\"\n",
  )
  .expect("write test config");
}
