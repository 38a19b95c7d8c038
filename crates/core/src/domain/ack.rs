use serde::{Deserialize, Serialize};

use super::message::Message;

/// One message still awaiting confirmation from its recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAck {
  pub msg_id: String,
  pub sender_id: String,
  pub recipient_id: String,
  /// Full snapshot of the message as originally dispatched
  pub message: Message,
  pub sent_at: f64,
  pub retry_count: u32,
  pub next_retry_at: f64,
}

/// On-disk shape of `.parley/pending_acks.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PendingAckSet {
  #[serde(default)]
  pub pending_acks: Vec<PendingAck>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::message::MessageType;

  #[test]
  fn set_round_trips_through_json() {
    let message =
      Message::new("a", vec!["b".into()], MessageType::Question, "ping", 10.0).unwrap();
    let set = PendingAckSet {
      pending_acks: vec![PendingAck {
        msg_id: message.msg_id.clone(),
        sender_id: "a".into(),
        recipient_id: "b".into(),
        message,
        sent_at: 10.0,
        retry_count: 0,
        next_retry_at: 70.0,
      }],
    };
    let json = serde_json::to_string(&set).unwrap();
    assert!(json.contains("\"pending_acks\""));
    let parsed: PendingAckSet = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, set);
  }

  #[test]
  fn empty_document_parses_to_empty_set() {
    let parsed: PendingAckSet = serde_json::from_str("{}").unwrap();
    assert!(parsed.pending_acks.is_empty());
  }
}
