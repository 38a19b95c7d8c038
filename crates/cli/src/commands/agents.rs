use anyhow::{Result, bail};
use parley_core::Hub;

use crate::output::t;

pub fn register(hub: &Hub, agent: &str, target: &str) -> Result<()> {
  if agent.trim().is_empty() || target.trim().is_empty() {
    bail!("agent and target must not be empty");
  }
  hub.directory.register(agent, target)?;
  anstream::println!("registered {} at {}", t::agent(agent), t::resource(target));
  if !hub.channel.verify(target) {
    anstream::println!(
      "{}",
      t::warn(format!("{target} is not currently reachable"))
    );
  }
  Ok(())
}

pub fn unregister(hub: &Hub, agent: &str) -> Result<()> {
  if hub.directory.unregister(agent)? {
    anstream::println!("unregistered {}", t::agent(agent));
  } else {
    anstream::println!("{}", t::warn(format!("{agent} was not registered")));
  }
  Ok(())
}

pub fn list(hub: &Hub) -> Result<()> {
  let agents = hub.directory.all()?;
  if agents.is_empty() {
    anstream::println!("no agents registered");
    return Ok(());
  }
  for (agent, target) in agents {
    anstream::println!("{}  {}", t::agent(agent), t::resource(target));
  }
  Ok(())
}
