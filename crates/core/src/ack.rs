use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;

use crate::clock::Clock;
use crate::config::AckSettings;
use crate::domain::ack::{PendingAck, PendingAckSet};
use crate::domain::message::{Message, MessageType};
use crate::messaging::{Messenger, SendError};
use crate::store::{StateFile, StoreError};

#[derive(Debug, Error)]
pub enum AckError {
  #[error(transparent)]
  Store(#[from] StoreError),
  #[error(transparent)]
  Send(#[from] SendError),
}

pub type Result<T> = std::result::Result<T, AckError>;

/// Marker prefixed to content so the recipient knows which id to confirm.
pub fn ack_marker(msg_id: &str) -> String {
  format!("[ack-required:{msg_id}]")
}

/// Delay before the next retry, from an ordered schedule indexed by how many
/// retries have already run; the last entry repeats for further attempts.
/// Pure, so sweeps are testable without sleeping.
pub fn delay_for(schedule_secs: &[u64], attempt: u32) -> Duration {
  let idx = (attempt as usize).min(schedule_secs.len().saturating_sub(1));
  Duration::from_secs(schedule_secs.get(idx).copied().unwrap_or(60))
}

/// Outcome of one retry sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetrySweep {
  pub resent: usize,
  pub escalated: usize,
}

/// At-least-once semantics on top of the [`Messenger`]: messages that demand
/// confirmation are tracked in one shared pending set, resent on a schedule,
/// and escalated to everyone once the retry budget runs out.
pub struct AckEngine {
  messenger: Arc<Messenger>,
  store: StateFile<PendingAckSet>,
  max_retries: u32,
  retry_delays_secs: Vec<u64>,
  default_timeout: Duration,
  clock: Arc<dyn Clock>,
  // One guard around every load/modify/store cycle of the pending set
  guard: Mutex<()>,
}

impl AckEngine {
  pub fn new(
    messenger: Arc<Messenger>,
    store: StateFile<PendingAckSet>,
    settings: &AckSettings,
    clock: Arc<dyn Clock>,
  ) -> Self {
    Self {
      messenger,
      store,
      max_retries: settings.max_retries,
      retry_delays_secs: settings.retry_delays_secs.clone(),
      default_timeout: Duration::from_secs(settings.default_timeout_secs),
      clock,
      guard: Mutex::new(()),
    }
  }

  pub fn default_timeout(&self) -> Duration {
    self.default_timeout
  }

  /// Send a message that demands confirmation. On successful dispatch a
  /// pending record is created with its first retry due after `timeout`;
  /// when dispatch fails, nothing is tracked.
  pub fn send_with_ack(
    &self,
    sender: &str,
    recipient: &str,
    msg_type: MessageType,
    content: &str,
    timeout: Duration,
  ) -> Result<Message> {
    let _engine = self.guard.lock();
    let now = self.clock.now_epoch();
    let mut msg = Message::new(sender, vec![recipient.to_string()], msg_type, content, now)
      .map_err(SendError::from)?;
    msg.content = format!("{} {}", ack_marker(&msg.msg_id), msg.content);

    let sent = self.messenger.dispatch(msg)?;
    let pending = PendingAck {
      msg_id: sent.msg_id.clone(),
      sender_id: sender.to_string(),
      recipient_id: recipient.to_string(),
      message: sent.clone(),
      sent_at: now,
      retry_count: 0,
      next_retry_at: now + timeout.as_secs_f64(),
    };
    self
      .store
      .update(|set| set.pending_acks.push(pending))?;
    tracing::info!(msg_id = %sent.msg_id, sender, recipient, "awaiting acknowledgment");
    Ok(sent)
  }

  /// Confirm a message by id. Any agent may acknowledge, not only the
  /// addressee. Returns false when nothing was pending under that id.
  pub fn receive(&self, msg_id: &str, from_agent: &str) -> Result<bool> {
    let _engine = self.guard.lock();
    let removed = self.store.update(|set| {
      let before = set.pending_acks.len();
      set.pending_acks.retain(|p| p.msg_id != msg_id);
      before != set.pending_acks.len()
    })?;
    if removed {
      tracing::info!(msg_id, from_agent, "acknowledged");
    } else {
      tracing::debug!(msg_id, from_agent, "acknowledgment for unknown message");
    }
    Ok(removed)
  }

  /// Snapshot of messages still awaiting confirmation.
  pub fn pending(&self) -> Result<Vec<PendingAck>> {
    Ok(self.store.load()?.pending_acks)
  }

  /// Resend every due entry and escalate those whose retry budget is spent.
  /// Each due entry is resent at most once per sweep.
  pub fn process_retries(&self) -> Result<RetrySweep> {
    let _engine = self.guard.lock();
    let now = self.clock.now_epoch();
    let set = self.store.load()?;

    let mut sweep = RetrySweep::default();
    let mut kept = Vec::with_capacity(set.pending_acks.len());
    let mut exhausted = Vec::new();

    for mut pending in set.pending_acks {
      if pending.next_retry_at > now {
        kept.push(pending);
        continue;
      }
      if pending.retry_count >= self.max_retries {
        exhausted.push(pending);
        continue;
      }

      let delay = delay_for(&self.retry_delays_secs, pending.retry_count);
      pending.retry_count += 1;
      pending.next_retry_at = now + delay.as_secs_f64();

      let mut retry = pending.message.clone();
      retry.timestamp = now;
      retry.content = format!(
        "[retry {}/{}] {}",
        pending.retry_count, self.max_retries, pending.message.content
      );
      // The attempt counts whether or not the redispatch lands; the next
      // sweep will try again until the budget runs out.
      if let Err(err) = self.messenger.dispatch(retry) {
        tracing::warn!(msg_id = %pending.msg_id, %err, "retry dispatch failed");
      }
      sweep.resent += 1;
      kept.push(pending);
    }

    self.store.update(|set| set.pending_acks = kept)?;

    for pending in exhausted {
      self.escalate(&pending)?;
      sweep.escalated += 1;
    }
    if sweep != RetrySweep::default() {
      tracing::info!(resent = sweep.resent, escalated = sweep.escalated, "retry sweep");
    }
    Ok(sweep)
  }

  /// One-shot, visible notice to everyone that the recipient never
  /// confirmed; the pending record is already removed by the caller.
  fn escalate(&self, pending: &PendingAck) -> Result<()> {
    let content = format!(
      "{} has not acknowledged message {} after {} retries: {}",
      pending.recipient_id, pending.msg_id, pending.retry_count, pending.message.content
    );
    tracing::warn!(
      msg_id = %pending.msg_id,
      recipient = %pending.recipient_id,
      "escalating unacknowledged message"
    );
    self
      .messenger
      .broadcast_unmetered(&pending.sender_id, MessageType::Blocked, &content, false)?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn delay_schedule_caps_at_last_entry() {
    let schedule = [30, 60, 120];
    assert_eq!(delay_for(&schedule, 0), Duration::from_secs(30));
    assert_eq!(delay_for(&schedule, 1), Duration::from_secs(60));
    assert_eq!(delay_for(&schedule, 2), Duration::from_secs(120));
    assert_eq!(delay_for(&schedule, 9), Duration::from_secs(120));
  }

  #[test]
  fn empty_schedule_falls_back() {
    assert_eq!(delay_for(&[], 0), Duration::from_secs(60));
  }

  #[test]
  fn marker_includes_the_id() {
    assert_eq!(ack_marker("abc"), "[ack-required:abc]");
  }
}
