use crate::Topic;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inbound wire shape: a topic tag plus an opaque payload handed verbatim
/// to registered handlers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
	pub topic: Topic,
	#[serde(default)]
	pub payload: Value,
}

impl EventEnvelope {
	pub fn new(topic: Topic, payload: Value) -> Self {
		Self { topic, payload }
	}
}

/// Outbound wire shape. The payload field is omitted entirely when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
	pub topic: Topic,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub payload: Option<Value>,
}

impl OutboundMessage {
	pub fn new(topic: Topic, payload: Option<Value>) -> Self {
		Self { topic, payload }
	}

	/// A message carrying only its topic tag.
	pub fn bare(topic: Topic) -> Self {
		Self { topic, payload: None }
	}
}
