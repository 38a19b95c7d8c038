use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::delivery::AgentDirectory;
use crate::store::{self, StateFile};

/// On-disk shape of `.parley/agents.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentRegistry {
  /// agent id -> delivery target (e.g. a tmux pane like `work:1.0`)
  #[serde(default)]
  pub agents: BTreeMap<String, String>,
}

/// Agent registry backed by a state file in the project root, so every
/// process coordinating on the project sees the same roster.
pub struct FileDirectory {
  store: StateFile<AgentRegistry>,
}

impl FileDirectory {
  pub fn new(path: PathBuf) -> Self {
    Self {
      store: StateFile::new(path),
    }
  }

  pub fn register(&self, agent_id: &str, target: &str) -> store::Result<()> {
    self.store.update(|registry| {
      registry
        .agents
        .insert(agent_id.to_string(), target.to_string());
    })?;
    tracing::info!(agent_id, target, "agent registered");
    Ok(())
  }

  /// Remove an agent; returns false when it was not registered.
  pub fn unregister(&self, agent_id: &str) -> store::Result<bool> {
    let removed = self
      .store
      .update(|registry| registry.agents.remove(agent_id).is_some())?;
    if removed {
      tracing::info!(agent_id, "agent unregistered");
    }
    Ok(removed)
  }

  pub fn all(&self) -> store::Result<BTreeMap<String, String>> {
    Ok(self.store.load()?.agents)
  }
}

impl AgentDirectory for FileDirectory {
  fn resolve(&self, agent_id: &str) -> Option<String> {
    match self.store.load() {
      Ok(registry) => registry.agents.get(agent_id).cloned(),
      Err(err) => {
        tracing::warn!(%err, "agent registry unavailable");
        None
      }
    }
  }

  fn list_agents(&self, excluding: Option<&str>) -> Vec<String> {
    match self.store.load() {
      Ok(registry) => registry
        .agents
        .into_keys()
        .filter(|id| excluding != Some(id.as_str()))
        .collect(),
      Err(err) => {
        tracing::warn!(%err, "agent registry unavailable");
        Vec::new()
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn directory(dir: &std::path::Path) -> FileDirectory {
    FileDirectory::new(dir.join("agents.json"))
  }

  #[test]
  fn register_resolve_unregister() {
    let td = tempfile::tempdir().unwrap();
    let dir = directory(td.path());

    dir.register("orchestrator", "work:0.0").unwrap();
    dir.register("dev-1", "work:1.0").unwrap();
    assert_eq!(dir.resolve("dev-1").as_deref(), Some("work:1.0"));
    assert_eq!(dir.resolve("ghost"), None);

    assert!(dir.unregister("dev-1").unwrap());
    assert!(!dir.unregister("dev-1").unwrap());
    assert_eq!(dir.resolve("dev-1"), None);
  }

  #[test]
  fn list_can_exclude_the_sender() {
    let td = tempfile::tempdir().unwrap();
    let dir = directory(td.path());
    dir.register("a", "t:0").unwrap();
    dir.register("b", "t:1").unwrap();
    dir.register("c", "t:2").unwrap();

    assert_eq!(dir.list_agents(None), vec!["a", "b", "c"]);
    assert_eq!(dir.list_agents(Some("b")), vec!["a", "c"]);
  }

  #[test]
  fn registry_survives_reopen() {
    let td = tempfile::tempdir().unwrap();
    directory(td.path()).register("a", "t:0").unwrap();
    let reopened = directory(td.path());
    assert_eq!(reopened.resolve("a").as_deref(), Some("t:0"));
  }
}
