mod log;

pub use log::DeliveryLog;

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use crate::clock::Clock;
use crate::delivery::{AgentDirectory, DeliveryChannel};
use crate::domain::message::{Message, MessageError, MessageType};
use crate::ratelimit::RateLimiter;

#[derive(Debug, Error)]
pub enum SendError {
  #[error(transparent)]
  Invalid(#[from] MessageError),
  /// Refused by the admission gate; retry after the window moves on
  #[error("{agent} is over its message quota")]
  RateLimited { agent: String },
  #[error("no delivery target registered for {agent}")]
  UnknownRecipient { agent: String },
  #[error("delivery journal: {0}")]
  Journal(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SendError>;

/// Validates, rate-gates, formats, and dispatches messages through the
/// delivery channel, journaling every attempt with its per-recipient
/// outcome.
pub struct Messenger {
  channel: Arc<dyn DeliveryChannel>,
  directory: Arc<dyn AgentDirectory>,
  limiter: RateLimiter,
  journal: DeliveryLog,
  clock: Arc<dyn Clock>,
}

impl Messenger {
  pub fn new(
    channel: Arc<dyn DeliveryChannel>,
    directory: Arc<dyn AgentDirectory>,
    limiter: RateLimiter,
    journal: DeliveryLog,
    clock: Arc<dyn Clock>,
  ) -> Self {
    Self {
      channel,
      directory,
      limiter,
      journal,
      clock,
    }
  }

  pub fn limiter(&self) -> &RateLimiter {
    &self.limiter
  }

  /// Send to a single recipient. Quota is consumed only on confirmed
  /// delivery, so a transport failure does not penalize the sender.
  pub fn send(
    &self,
    sender: &str,
    recipient: &str,
    msg_type: MessageType,
    content: &str,
  ) -> Result<Message> {
    let msg = Message::new(
      sender,
      vec![recipient.to_string()],
      msg_type,
      content,
      self.clock.now_epoch(),
    )?;
    self.dispatch(msg)
  }

  /// Dispatch a prebuilt single-recipient message, applying the same
  /// validation, rate-gate, resolution, outcome, and journaling rules as
  /// [`send`](Self::send). Used by the ack engine, which needs the message
  /// id before dispatch.
  pub(crate) fn dispatch(&self, mut msg: Message) -> Result<Message> {
    msg.validate()?;
    if !self.limiter.allow(&msg.sender) {
      return Err(SendError::RateLimited {
        agent: msg.sender.clone(),
      });
    }
    let recipient = msg.recipients[0].clone();
    let target = self
      .directory
      .resolve(&recipient)
      .ok_or_else(|| SendError::UnknownRecipient {
        agent: recipient.clone(),
      })?;

    let delivered = self.channel.send(&target, &msg.format_for_display());
    msg.delivery_status.insert(recipient.clone(), delivered);
    if delivered {
      self.limiter.record(&msg.sender);
    }
    self.journal.append(&msg)?;
    tracing::info!(
      msg_id = %msg.msg_id,
      sender = %msg.sender,
      recipient = %recipient,
      delivered,
      "message dispatched"
    );
    Ok(msg)
  }

  /// Send to every registered agent, capturing a per-recipient outcome map.
  /// Consumes exactly one unit of quota for the whole broadcast, regardless
  /// of fan-out or individual outcomes.
  pub fn broadcast(
    &self,
    sender: &str,
    msg_type: MessageType,
    content: &str,
    exclude_self: bool,
  ) -> Result<BTreeMap<String, bool>> {
    self.broadcast_inner(sender, msg_type, content, exclude_self, true)
  }

  /// Broadcast without touching the rate limiter. Reserved for
  /// engine-originated notices that must not be suppressible by quota.
  pub(crate) fn broadcast_unmetered(
    &self,
    sender: &str,
    msg_type: MessageType,
    content: &str,
    exclude_self: bool,
  ) -> Result<BTreeMap<String, bool>> {
    self.broadcast_inner(sender, msg_type, content, exclude_self, false)
  }

  fn broadcast_inner(
    &self,
    sender: &str,
    msg_type: MessageType,
    content: &str,
    exclude_self: bool,
    metered: bool,
  ) -> Result<BTreeMap<String, bool>> {
    Message::validate_parts(sender, content)?;
    if metered && !self.limiter.allow(sender) {
      return Err(SendError::RateLimited {
        agent: sender.to_string(),
      });
    }

    let recipients = self
      .directory
      .list_agents(exclude_self.then_some(sender));
    if recipients.is_empty() {
      tracing::warn!(sender, "broadcast with no registered recipients");
      return Ok(BTreeMap::new());
    }

    let mut msg = Message::new(
      sender,
      recipients.clone(),
      msg_type,
      content,
      self.clock.now_epoch(),
    )?;
    // Formatted once; every recipient sees the identical line
    let text = msg.format_for_display();
    for recipient in &recipients {
      let delivered = match self.directory.resolve(recipient) {
        Some(target) => self.channel.send(&target, &text),
        None => false,
      };
      msg.delivery_status.insert(recipient.clone(), delivered);
    }
    if metered {
      self.limiter.record(sender);
    }
    self.journal.append(&msg)?;
    tracing::info!(
      msg_id = %msg.msg_id,
      sender,
      recipients = recipients.len(),
      delivered = msg.success_count(),
      failed = msg.failure_count(),
      "broadcast dispatched"
    );
    Ok(msg.delivery_status)
  }
}
