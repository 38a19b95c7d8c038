use anyhow::Result;
use parley_core::Hub;
use parley_core::clock::{Clock, SystemClock};

use crate::output::t;

pub fn receive(hub: &Hub, msg_id: &str, from: &str) -> Result<()> {
  if hub.acks.receive(msg_id, from)? {
    anstream::println!("{}", t::ok(format!("acknowledged {msg_id}")));
  } else {
    anstream::println!(
      "{}",
      t::warn(format!("no pending message with id {msg_id}"))
    );
  }
  Ok(())
}

pub fn retries(hub: &Hub) -> Result<()> {
  let sweep = hub.acks.process_retries()?;
  anstream::println!(
    "resent {}, escalated {}",
    sweep.resent,
    sweep.escalated
  );
  Ok(())
}

pub fn pending(hub: &Hub) -> Result<()> {
  let pending = hub.acks.pending()?;
  if pending.is_empty() {
    anstream::println!("nothing awaiting acknowledgment");
    return Ok(());
  }
  let now = SystemClock.now_epoch();
  let max_retries = hub.config.ack.max_retries;
  for entry in pending {
    let due_in = (entry.next_retry_at - now).max(0.0) as u64;
    anstream::println!(
      "{}  {} -> {}  retries {}/{}  next in {}s",
      t::id(&entry.msg_id),
      t::agent(&entry.sender_id),
      t::agent(&entry.recipient_id),
      entry.retry_count,
      max_retries,
      due_in
    );
  }
  Ok(())
}
