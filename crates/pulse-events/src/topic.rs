use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A logical event stream key used to route inbound events to handlers
/// and to tell the server what to push.
///
/// The product's fixed streams are first-class variants; anything outside
/// that set round-trips through [`Topic::Custom`] so the routing mechanism
/// stays generic underneath.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Topic {
	/// Progress feed for one decision session (`decision:{id}`).
	Decision(String),
	/// Progress feed for one workflow execution (`workflow:{id}`).
	Workflow(String),
	/// Account-wide alert feed (`alerts`).
	Alerts,
	/// Account-wide health-score feed (`health`).
	Health,
	/// Open-ended stream outside the fixed set.
	Custom(String),
}

impl fmt::Display for Topic {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Topic::Decision(id) => write!(f, "decision:{}", id),
			Topic::Workflow(id) => write!(f, "workflow:{}", id),
			Topic::Alerts => write!(f, "alerts"),
			Topic::Health => write!(f, "health"),
			Topic::Custom(name) => write!(f, "{}", name),
		}
	}
}

impl FromStr for Topic {
	type Err = std::convert::Infallible;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let topic = match s {
			"alerts" => Topic::Alerts,
			"health" => Topic::Health,
			other => match other.split_once(':') {
				Some(("decision", id)) if !id.is_empty() => Topic::Decision(id.to_string()),
				Some(("workflow", id)) if !id.is_empty() => Topic::Workflow(id.to_string()),
				_ => Topic::Custom(other.to_string()),
			},
		};
		Ok(topic)
	}
}

impl From<String> for Topic {
	fn from(s: String) -> Self {
		match s.parse() {
			Ok(topic) => topic,
			Err(never) => match never {},
		}
	}
}

impl From<Topic> for String {
	fn from(topic: Topic) -> Self {
		topic.to_string()
	}
}

impl Topic {
	/// Convenience constructor for streams outside the fixed set.
	pub fn custom<S: Into<String>>(name: S) -> Self {
		Topic::Custom(name.into())
	}
}
