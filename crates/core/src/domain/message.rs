use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Closed set of message kinds agents exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
  Question,
  ReviewRequest,
  Blocked,
  Completed,
  Challenge,
  Info,
  Ack,
}

impl MessageType {
  pub fn as_str(&self) -> &'static str {
    match self {
      MessageType::Question => "question",
      MessageType::ReviewRequest => "review_request",
      MessageType::Blocked => "blocked",
      MessageType::Completed => "completed",
      MessageType::Challenge => "challenge",
      MessageType::Info => "info",
      MessageType::Ack => "ack",
    }
  }

  /// Parse a user-supplied type name. Accepts `-` as well as `_`.
  pub fn parse(s: &str) -> Result<Self, MessageError> {
    match s.replace('-', "_").as_str() {
      "question" => Ok(MessageType::Question),
      "review_request" => Ok(MessageType::ReviewRequest),
      "blocked" => Ok(MessageType::Blocked),
      "completed" => Ok(MessageType::Completed),
      "challenge" => Ok(MessageType::Challenge),
      "info" => Ok(MessageType::Info),
      "ack" => Ok(MessageType::Ack),
      _ => Err(MessageError::UnknownType(s.to_string())),
    }
  }
}

impl fmt::Display for MessageType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MessageError {
  #[error("sender must not be empty")]
  EmptySender,
  #[error("content must not be empty")]
  EmptyContent,
  #[error("at least one recipient is required")]
  NoRecipients,
  #[error("recipient must not be empty")]
  EmptyRecipient,
  #[error("unknown message type: {0}")]
  UnknownType(String),
}

/// One message as journaled and delivered. Immutable once written except for
/// the per-recipient delivery outcomes filled in during dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
  pub msg_id: String,
  pub sender: String,
  /// Epoch seconds at creation
  pub timestamp: f64,
  pub msg_type: MessageType,
  pub content: String,
  pub recipients: Vec<String>,
  #[serde(default)]
  pub delivery_status: BTreeMap<String, bool>,
}

impl Message {
  /// Build a validated message with a fresh unique id.
  pub fn new(
    sender: &str,
    recipients: Vec<String>,
    msg_type: MessageType,
    content: &str,
    timestamp: f64,
  ) -> Result<Self, MessageError> {
    let msg = Message {
      msg_id: Uuid::new_v4().to_string(),
      sender: sender.to_string(),
      timestamp,
      msg_type,
      content: content.to_string(),
      recipients,
      delivery_status: BTreeMap::new(),
    };
    msg.validate()?;
    Ok(msg)
  }

  pub fn validate(&self) -> Result<(), MessageError> {
    Self::validate_parts(&self.sender, &self.content)?;
    if self.recipients.is_empty() {
      return Err(MessageError::NoRecipients);
    }
    if self.recipients.iter().any(|r| r.trim().is_empty()) {
      return Err(MessageError::EmptyRecipient);
    }
    Ok(())
  }

  /// Field checks shared with broadcast, which resolves recipients later.
  pub fn validate_parts(sender: &str, content: &str) -> Result<(), MessageError> {
    if sender.trim().is_empty() {
      return Err(MessageError::EmptySender);
    }
    if content.trim().is_empty() {
      return Err(MessageError::EmptyContent);
    }
    Ok(())
  }

  /// Render the single line typed into a pane: `[sender][HH:MM:SS][type]: content`
  pub fn format_for_display(&self) -> String {
    format!(
      "[{}][{}][{}]: {}",
      self.sender,
      format_epoch_time(self.timestamp),
      self.msg_type,
      self.content
    )
  }

  pub fn success_count(&self) -> usize {
    self.delivery_status.values().filter(|ok| **ok).count()
  }

  pub fn failure_count(&self) -> usize {
    self.delivery_status.len() - self.success_count()
  }
}

fn format_epoch_time(epoch: f64) -> String {
  chrono::DateTime::from_timestamp(epoch as i64, 0)
    .map(|t| t.format("%H:%M:%S").to_string())
    .unwrap_or_else(|| "??:??:??".to_string())
}
