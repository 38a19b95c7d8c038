/// Transport that places literal text in front of an agent.
///
/// Implementations handle their own escaping and timeouts. An unreachable
/// target yields `false`; the channel never panics and never blocks
/// indefinitely.
pub trait DeliveryChannel: Send + Sync {
  fn send(&self, target: &str, text: &str) -> bool;
  fn verify(&self, target: &str) -> bool;
}

/// Maps agent ids to delivery targets.
pub trait AgentDirectory: Send + Sync {
  fn resolve(&self, agent_id: &str) -> Option<String>;
  fn list_agents(&self, excluding: Option<&str>) -> Vec<String>;
}
