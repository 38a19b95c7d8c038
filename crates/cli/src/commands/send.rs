use std::time::Duration;

use anyhow::Result;
use parley_core::Hub;
use parley_core::domain::message::MessageType;

use crate::output::t;

pub fn direct(
  hub: &Hub,
  sender: &str,
  recipient: &str,
  type_name: &str,
  content: &str,
  ack: bool,
  timeout_secs: Option<u64>,
) -> Result<()> {
  let msg_type = MessageType::parse(type_name)?;

  let msg = if ack {
    let timeout = timeout_secs
      .map(Duration::from_secs)
      .unwrap_or_else(|| hub.acks.default_timeout());
    hub
      .acks
      .send_with_ack(sender, recipient, msg_type, content, timeout)?
  } else {
    hub.messenger.send(sender, recipient, msg_type, content)?
  };

  let delivered = msg.delivery_status.get(recipient).copied().unwrap_or(false);
  if delivered {
    anstream::println!(
      "{}",
      t::ok(format!("delivered to {recipient} ({})", msg.msg_id))
    );
  } else {
    anstream::println!(
      "{}",
      t::warn(format!(
        "delivery to {recipient} failed; journaled as {}",
        msg.msg_id
      ))
    );
  }
  if ack {
    anstream::println!(
      "awaiting acknowledgment: parley ack {}",
      t::id(&msg.msg_id)
    );
  }
  Ok(())
}

pub fn broadcast(
  hub: &Hub,
  sender: &str,
  type_name: &str,
  content: &str,
  include_self: bool,
) -> Result<()> {
  let msg_type = MessageType::parse(type_name)?;
  let outcomes = hub
    .messenger
    .broadcast(sender, msg_type, content, !include_self)?;

  if outcomes.is_empty() {
    anstream::println!("{}", t::warn("no registered recipients"));
    return Ok(());
  }
  let delivered = outcomes.values().filter(|ok| **ok).count();
  anstream::println!("delivered to {delivered}/{} agents", outcomes.len());
  for (agent, ok) in &outcomes {
    if !ok {
      anstream::println!("{}", t::warn(format!("{agent}: delivery failed")));
    }
  }
  Ok(())
}
