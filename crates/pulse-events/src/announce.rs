use crate::{OutboundMessage, Topic};
use serde_json::json;

/// A typed "I am listening for X" announcement sent to the server.
///
/// Announcements are control messages, distinct from the event stream they
/// request: announcing [`Announce::Decision`] asks the server to start
/// pushing on the matching `decision:{id}` topic. The client records the
/// announcements it has made so they can be replayed after a reconnect.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Announce {
	Decision(String),
	Workflow(String),
	Alerts,
	Health,
}

impl Announce {
	/// The control message telling the server to start pushing this stream.
	pub fn subscribe_message(&self) -> OutboundMessage {
		self.control_message("subscribe")
	}

	/// The control message telling the server to stop pushing this stream.
	pub fn retract_message(&self) -> OutboundMessage {
		self.control_message("unsubscribe")
	}

	/// The event topic a handler would be registered under to receive the
	/// stream this announcement requests.
	pub fn stream_topic(&self) -> Topic {
		match self {
			Announce::Decision(id) => Topic::Decision(id.clone()),
			Announce::Workflow(id) => Topic::Workflow(id.clone()),
			Announce::Alerts => Topic::Alerts,
			Announce::Health => Topic::Health,
		}
	}

	fn control_message(&self, verb: &str) -> OutboundMessage {
		match self {
			Announce::Decision(id) => OutboundMessage::new(Topic::custom(format!("{}:decision", verb)), Some(json!({ "sessionId": id }))),
			Announce::Workflow(id) => OutboundMessage::new(Topic::custom(format!("{}:workflow", verb)), Some(json!({ "executionId": id }))),
			Announce::Alerts => OutboundMessage::bare(Topic::custom(format!("{}:alerts", verb))),
			Announce::Health => OutboundMessage::bare(Topic::custom(format!("{}:health", verb))),
		}
	}
}
