use dashmap::DashMap;
use pulse_events::Topic;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use thiserror::Error;
use tracing::warn;

/// Failure reported by a handler for one event. A failing handler is
/// logged and skipped; it never aborts the fan-out to its siblings.
#[derive(Debug, Error)]
pub enum HandlerError {
	#[error("handler failed: {0}")]
	Failed(String),
}

/// A caller-supplied callback invoked with an event's payload.
///
/// Handlers are shared [`Arc`]s so the same callback object can be used
/// both for registration and later identity-based removal.
pub type Handler = Arc<dyn Fn(&Value) -> Result<(), HandlerError> + Send + Sync>;

/// Wrap a closure into a registerable [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
	F: Fn(&Value) -> Result<(), HandlerError> + Send + Sync + 'static,
{
	Arc::new(f)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

impl HandlerId {
	fn next() -> Self {
		static COUNTER: AtomicU64 = AtomicU64::new(1);
		Self(COUNTER.fetch_add(1, Ordering::Relaxed))
	}
}

struct HandlerEntry {
	id: HandlerId,
	handler: Handler,
}

/// Outcome of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
	pub delivered: u64,
	pub failed: u64,
}

type TopicMap = DashMap<Topic, Vec<HandlerEntry>>;

/// Topic-keyed handler registry with ordered fan-out dispatch.
///
/// Topic keys are created lazily on first subscription. A vector emptied
/// by identity-based removal stays in the map; only [`remove_all`]
/// deletes the key.
///
/// [`remove_all`]: HandlerRegistry::remove_all
#[derive(Clone, Default)]
pub struct HandlerRegistry {
	topics: Arc<TopicMap>,
}

impl HandlerRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register `handler` under `topic`, appended in registration order.
	///
	/// Registering the identical handler object (same `Arc`) twice for
	/// one topic does not create a second entry; the returned token
	/// targets the existing registration.
	pub fn subscribe(&self, topic: Topic, handler: Handler) -> Subscription {
		let mut entries = self.topics.entry(topic.clone()).or_default();

		if let Some(existing) = entries.iter().find(|entry| Arc::ptr_eq(&entry.handler, &handler)) {
			return Subscription::new(topic, existing.id, Arc::downgrade(&self.topics));
		}

		let id = HandlerId::next();
		entries.push(HandlerEntry { id, handler });
		Subscription::new(topic, id, Arc::downgrade(&self.topics))
	}

	/// Remove every registration of exactly this handler object from
	/// `topic`. Other handlers on the topic are unaffected.
	pub fn remove(&self, topic: &Topic, handler: &Handler) {
		if let Some(mut entries) = self.topics.get_mut(topic) {
			entries.retain(|entry| !Arc::ptr_eq(&entry.handler, handler));
		}
	}

	/// Hard reset of one topic's listener set.
	pub fn remove_all(&self, topic: &Topic) {
		self.topics.remove(topic);
	}

	pub fn handler_count(&self, topic: &Topic) -> usize {
		self.topics.get(topic).map_or(0, |entries| entries.len())
	}

	/// Invoke every handler registered for `topic`, synchronously and in
	/// registration order. An unmatched topic is a silent no-op. A
	/// failing handler is logged and the loop continues.
	pub fn dispatch(&self, topic: &Topic, payload: &Value) -> DispatchReport {
		// Snapshot the entries and release the shard lock before invoking,
		// so handlers may themselves subscribe or unsubscribe.
		let snapshot: Vec<(HandlerId, Handler)> = match self.topics.get(topic) {
			Some(entries) => entries.iter().map(|entry| (entry.id, entry.handler.clone())).collect(),
			None => return DispatchReport::default(),
		};

		let mut report = DispatchReport::default();
		for (id, handler) in snapshot {
			match handler(payload) {
				Ok(()) => report.delivered += 1,
				Err(error) => {
					report.failed += 1;
					warn!(topic = %topic, handler = ?id, %error, "handler failed during dispatch");
				}
			}
		}
		report
	}
}

/// Removal token for exactly one registration. Carries no ownership over
/// the connection; cancelling twice, or after the topic was cleared, is a
/// safe no-op.
pub struct Subscription {
	topic: Topic,
	id: HandlerId,
	topics: Weak<TopicMap>,
	cancelled: AtomicBool,
}

impl Subscription {
	fn new(topic: Topic, id: HandlerId, topics: Weak<TopicMap>) -> Self {
		Self {
			topic,
			id,
			topics,
			cancelled: AtomicBool::new(false),
		}
	}

	pub fn cancel(&self) {
		if self.cancelled.swap(true, Ordering::SeqCst) {
			return;
		}

		if let Some(topics) = self.topics.upgrade() {
			if let Some(mut entries) = topics.get_mut(&self.topic) {
				entries.retain(|entry| entry.id != self.id);
			}
		}
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancelled.load(Ordering::SeqCst)
	}
}
