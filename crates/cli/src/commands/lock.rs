use anyhow::{Result, bail};
use parley_core::Hub;
use parley_core::clock::{Clock, SystemClock};
use parley_core::locks::Acquisition;

use crate::LockCommands;
use crate::output::t;

pub fn run(hub: &Hub, cmd: LockCommands) -> Result<()> {
  match cmd {
    LockCommands::Acquire {
      resource,
      agent,
      reason,
    } => acquire(hub, &resource, &agent, &reason),
    LockCommands::Release { resource, agent } => release(hub, &resource, &agent),
    LockCommands::Who { resource } => who(hub, &resource),
    LockCommands::List { stale } => list(hub, stale),
    LockCommands::Cleanup { agent } => cleanup(hub, agent.as_deref()),
  }
}

fn acquire(hub: &Hub, resource: &str, agent: &str, reason: &str) -> Result<()> {
  match hub.locks.acquire(resource, agent, reason)? {
    Acquisition::Granted => {
      anstream::println!(
        "{}",
        t::ok(format!("{agent} holds {resource}"))
      );
      Ok(())
    }
    Acquisition::Held(conflict) => {
      let age = conflict.age_secs(SystemClock.now_epoch()) as u64;
      bail!("{conflict}, held for {age}s")
    }
  }
}

fn release(hub: &Hub, resource: &str, agent: &str) -> Result<()> {
  if hub.locks.release(resource, agent)? {
    anstream::println!("{}", t::ok(format!("released {resource}")));
    Ok(())
  } else {
    bail!("{resource} is not held by {agent}")
  }
}

fn who(hub: &Hub, resource: &str) -> Result<()> {
  match hub.locks.who_holds(resource)? {
    Some(record) => {
      let age = record.age_secs(SystemClock.now_epoch()) as u64;
      let reason = if record.reason.is_empty() {
        String::new()
      } else {
        format!(" ({})", record.reason)
      };
      anstream::println!(
        "{} held by {} for {}s{}",
        t::resource(resource),
        t::agent(&record.agent_id),
        age,
        reason
      );
    }
    None => anstream::println!("no one holds {}", t::resource(resource)),
  }
  Ok(())
}

fn list(hub: &Hub, include_stale: bool) -> Result<()> {
  let records = hub.locks.list_all(include_stale)?;
  if records.is_empty() {
    anstream::println!("no locks held");
    return Ok(());
  }
  let now = SystemClock.now_epoch();
  for record in records {
    let reason = if record.reason.is_empty() {
      String::new()
    } else {
      format!("  {}", record.reason)
    };
    anstream::println!(
      "{}  {}  {}s{}",
      t::resource(&record.filepath),
      t::agent(&record.agent_id),
      record.age_secs(now) as u64,
      reason
    );
  }
  Ok(())
}

fn cleanup(hub: &Hub, agent: Option<&str>) -> Result<()> {
  let removed = match agent {
    Some(agent) => hub.locks.cleanup_for_agent(agent)?,
    None => hub.locks.cleanup_stale()?,
  };
  anstream::println!("removed {removed} lock(s)");
  Ok(())
}
