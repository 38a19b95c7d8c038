use std::path::PathBuf;
use std::process::Command;

use crate::delivery::DeliveryChannel;

/// Delivers messages by typing them into tmux panes.
///
/// Targets are tmux pane specs (`session:window.pane`). The text is sent
/// with `-l` so tmux does not interpret it as key names, then a separate
/// Enter submits the line.
pub struct TmuxChannel {
  socket_path: Option<PathBuf>,
}

impl TmuxChannel {
  pub fn new(socket_path: Option<PathBuf>) -> Self {
    Self { socket_path }
  }

  fn command(&self) -> Command {
    let mut cmd = Command::new("tmux");
    if let Some(socket) = &self.socket_path {
      cmd.arg("-S").arg(socket);
    }
    cmd
  }

  fn run(mut cmd: Command) -> bool {
    match cmd.output() {
      Ok(out) => {
        if !out.status.success() {
          tracing::debug!(
            status = %out.status,
            stderr = %String::from_utf8_lossy(&out.stderr).trim(),
            "tmux command refused"
          );
        }
        out.status.success()
      }
      Err(err) => {
        tracing::warn!(%err, "tmux invocation failed");
        false
      }
    }
  }
}

impl DeliveryChannel for TmuxChannel {
  fn send(&self, target: &str, text: &str) -> bool {
    let mut keys = self.command();
    keys.args(["send-keys", "-t", target, "-l"]).arg(text);
    if !Self::run(keys) {
      return false;
    }
    let mut enter = self.command();
    enter.args(["send-keys", "-t", target, "Enter"]);
    Self::run(enter)
  }

  fn verify(&self, target: &str) -> bool {
    let mut cmd = self.command();
    cmd.args(["list-panes", "-t", target]);
    Self::run(cmd)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_server_is_false_not_an_error() {
    // Point at a socket that cannot exist; both calls must degrade to false.
    let td = tempfile::tempdir().unwrap();
    let channel = TmuxChannel::new(Some(td.path().join("no-such.sock")));
    assert!(!channel.verify("nowhere:0.0"));
    assert!(!channel.send("nowhere:0.0", "hello"));
  }
}
