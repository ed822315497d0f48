use crate::config::{ClientConfig, TransportPreference};
use crate::credentials::CredentialSource;
use crate::registry::{Handler, HandlerRegistry, Subscription};
use crate::retry::{RetryConfig, RetryPolicy};
use crate::state::{ConnectionState, StateEvent};
use crate::transport::polling::PollingTransport;
use crate::transport::websocket::WebSocketTransport;
use crate::transport::{Transport, TransportLink};
use parking_lot::Mutex;
use pulse_events::{Announce, OutboundMessage, Topic};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const STATUS_CAPACITY: usize = 32;

/// Lifecycle notifications for observers (status badges, logging).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEvent {
	Connected { transport: &'static str },
	Reconnecting { attempt: u32 },
	Disconnected,
	GaveUp { attempts: u32 },
}

struct ClientInner {
	config: ClientConfig,
	credentials: Arc<dyn CredentialSource>,
	transports: Vec<Arc<dyn Transport>>,
	registry: HandlerRegistry,
	state: Mutex<ConnectionState>,
	attempts: AtomicU32,
	outbound: Mutex<Option<mpsc::Sender<OutboundMessage>>>,
	driver: Mutex<Option<JoinHandle<()>>>,
	announced: Mutex<HashSet<Announce>>,
	status_tx: broadcast::Sender<StatusEvent>,
}

/// Long-lived realtime channel to the push endpoint.
///
/// Cheap to clone; clones share the connection, the handler registry, and
/// the announcement set. Methods are non-blocking: the connection itself
/// lives on a spawned driver task, so `connect` and `disconnect` must be
/// called from within a tokio runtime.
#[derive(Clone)]
pub struct RealtimeClient {
	inner: Arc<ClientInner>,
}

impl RealtimeClient {
	pub fn new(config: ClientConfig, credentials: Arc<dyn CredentialSource>) -> Self {
		let transports = default_transports(config.transports);
		Self::with_transports(config, credentials, transports)
	}

	/// Construct with an explicit transport list, bypassing the
	/// preference-derived default. Used by tests to inject fakes.
	pub fn with_transports(config: ClientConfig, credentials: Arc<dyn CredentialSource>, transports: Vec<Arc<dyn Transport>>) -> Self {
		let (status_tx, _) = broadcast::channel(STATUS_CAPACITY);
		Self {
			inner: Arc::new(ClientInner {
				config,
				credentials,
				transports,
				registry: HandlerRegistry::new(),
				state: Mutex::new(ConnectionState::Disconnected),
				attempts: AtomicU32::new(0),
				outbound: Mutex::new(None),
				driver: Mutex::new(None),
				announced: Mutex::new(HashSet::new()),
				status_tx,
			}),
		}
	}

	/// Start the connection driver. A no-op while a driver is already
	/// running or starting, and a gated no-op when no credential is
	/// available yet.
	pub fn connect(&self) {
		{
			let mut state = self.inner.state.lock();
			if *state != ConnectionState::Disconnected {
				debug!(state = ?*state, "connect ignored; client already active");
				return;
			}

			if self.inner.credentials.access_token().is_none() {
				warn!("no access token available; realtime connection not started");
				return;
			}

			*state = state.apply(StateEvent::ConnectRequested);
		}

		let handle = tokio::spawn(run_driver(self.inner.clone()));
		*self.inner.driver.lock() = Some(handle);
	}

	/// Tear the channel down and cancel any pending retry. Safe to call
	/// in any state.
	pub fn disconnect(&self) {
		let was_active = {
			let mut state = self.inner.state.lock();
			let previous = *state;
			*state = state.apply(StateEvent::DisconnectRequested);
			previous != ConnectionState::Disconnected
		};

		if let Some(handle) = self.inner.driver.lock().take() {
			handle.abort();
		}
		self.inner.outbound.lock().take();
		self.inner.attempts.store(0, Ordering::SeqCst);

		if was_active {
			info!("realtime channel closed");
			let _ = self.inner.status_tx.send(StatusEvent::Disconnected);
		}
	}

	pub fn state(&self) -> ConnectionState {
		*self.inner.state.lock()
	}

	pub fn is_connected(&self) -> bool {
		self.state().is_connected()
	}

	/// Consecutive failed connection attempts since the last success.
	pub fn reconnect_attempts(&self) -> u32 {
		self.inner.attempts.load(Ordering::SeqCst)
	}

	/// Subscribe to lifecycle notifications. Each call gets an
	/// independent receiver; slow readers miss events rather than
	/// backpressure the driver.
	pub fn status_feed(&self) -> broadcast::Receiver<StatusEvent> {
		self.inner.status_tx.subscribe()
	}

	/// Register `handler` for events on `topic`. Registration is purely
	/// local and works in any connection state.
	pub fn subscribe(&self, topic: Topic, handler: Handler) -> Subscription {
		self.inner.registry.subscribe(topic, handler)
	}

	/// Remove exactly this handler object from `topic`.
	pub fn unsubscribe(&self, topic: &Topic, handler: &Handler) {
		self.inner.registry.remove(topic, handler);
	}

	/// Remove every handler registered for `topic`.
	pub fn unsubscribe_all(&self, topic: &Topic) {
		self.inner.registry.remove_all(topic);
	}

	/// Send an application message upstream. Dropped with a warning when
	/// the channel is not connected.
	pub fn emit(&self, topic: Topic, payload: Option<Value>) {
		let message = OutboundMessage::new(topic, payload);
		let guard = self.inner.outbound.lock();
		match guard.as_ref() {
			Some(sender) => {
				if let Err(err) = sender.try_send(message) {
					warn!(error = %err, "outbound channel unavailable; message dropped");
				}
			}
			None => warn!(topic = %message.topic, "not connected; outbound message dropped"),
		}
	}

	/// Follow the progress feed of one decision session.
	pub fn subscribe_to_decision<S: Into<String>>(&self, session_id: S, handler: Handler) -> Subscription {
		self.announce(Announce::Decision(session_id.into()), handler)
	}

	/// Stop following a decision session. This is a whole-stream teardown:
	/// every handler registered for the stream is removed and the shared
	/// announcement is retracted, so other parts of the application
	/// following the same session stop receiving too. For scoped removal,
	/// cancel the [`Subscription`] token instead.
	pub fn unsubscribe_from_decision<S: Into<String>>(&self, session_id: S) {
		self.retract(Announce::Decision(session_id.into()));
	}

	/// Follow the progress feed of one workflow execution.
	pub fn subscribe_to_workflow<S: Into<String>>(&self, execution_id: S, handler: Handler) -> Subscription {
		self.announce(Announce::Workflow(execution_id.into()), handler)
	}

	/// Stop following a workflow execution. Whole-stream teardown; see
	/// [`unsubscribe_from_decision`](Self::unsubscribe_from_decision).
	pub fn unsubscribe_from_workflow<S: Into<String>>(&self, execution_id: S) {
		self.retract(Announce::Workflow(execution_id.into()));
	}

	/// Follow the account-wide alert feed.
	pub fn subscribe_to_alerts(&self, handler: Handler) -> Subscription {
		self.announce(Announce::Alerts, handler)
	}

	/// Stop following the alert feed. Whole-stream teardown; see
	/// [`unsubscribe_from_decision`](Self::unsubscribe_from_decision).
	pub fn unsubscribe_from_alerts(&self) {
		self.retract(Announce::Alerts);
	}

	/// Follow the account-wide health-score feed.
	pub fn subscribe_to_health(&self, handler: Handler) -> Subscription {
		self.announce(Announce::Health, handler)
	}

	/// Stop following the health-score feed. Whole-stream teardown; see
	/// [`unsubscribe_from_decision`](Self::unsubscribe_from_decision).
	pub fn unsubscribe_from_health(&self) {
		self.retract(Announce::Health);
	}

	/// Register the handler locally, remember the announcement for
	/// replay, and tell the server when a session is up. Announcing
	/// while disconnected is fine: the recorded announcement is sent
	/// once a session opens.
	fn announce(&self, announce: Announce, handler: Handler) -> Subscription {
		let token = self.inner.registry.subscribe(announce.stream_topic(), handler);
		let message = announce.subscribe_message();
		self.inner.announced.lock().insert(announce);
		self.send_if_connected(message);
		token
	}

	/// Drop the announcement record, clear every handler on its stream
	/// topic, and tell the server to stop pushing. One announcement per
	/// stream is shared client-wide, so this tears the stream down for
	/// every caller that announced it.
	fn retract(&self, announce: Announce) {
		self.inner.announced.lock().remove(&announce);
		self.inner.registry.remove_all(&announce.stream_topic());
		self.send_if_connected(announce.retract_message());
	}

	fn send_if_connected(&self, message: OutboundMessage) {
		if let Some(sender) = self.inner.outbound.lock().as_ref() {
			if let Err(err) = sender.try_send(message) {
				warn!(error = %err, "outbound channel unavailable; control message dropped");
			}
		}
	}
}

fn default_transports(preference: TransportPreference) -> Vec<Arc<dyn Transport>> {
	match preference {
		TransportPreference::WebSocketThenPolling => vec![Arc::new(WebSocketTransport::new()), Arc::new(PollingTransport::new())],
		TransportPreference::WebSocketOnly => vec![Arc::new(WebSocketTransport::new())],
		TransportPreference::PollingOnly => vec![Arc::new(PollingTransport::new())],
	}
}

fn transition(inner: &ClientInner, event: StateEvent) -> ConnectionState {
	let mut state = inner.state.lock();
	let next = state.apply(event);
	if next != *state {
		debug!(from = ?*state, to = ?next, event = ?event, "connection state changed");
		*state = next;
	}
	next
}

/// Try each configured transport in preference order with the current
/// credential. `None` means the whole attempt failed.
async fn open_session(inner: &ClientInner) -> Option<(&'static str, TransportLink)> {
	let Some(token) = inner.credentials.access_token() else {
		warn!("access token disappeared; connection attempt skipped");
		return None;
	};

	for transport in &inner.transports {
		match transport.open(&inner.config, &token).await {
			Ok(link) => return Some((transport.name(), link)),
			Err(err) => warn!(transport = transport.name(), error = %err, "transport failed to open"),
		}
	}

	None
}

async fn run_driver(inner: Arc<ClientInner>) {
	let mut retry = RetryPolicy::new(RetryConfig::from(&inner.config));

	loop {
		if let Some((transport, link)) = open_session(&inner).await {
			retry.reset();
			inner.attempts.store(0, Ordering::SeqCst);

			let TransportLink { outbound, mut inbound } = link;
			*inner.outbound.lock() = Some(outbound.clone());
			transition(&inner, StateEvent::TransportOpened);
			info!(transport, "realtime channel established");
			let _ = inner.status_tx.send(StatusEvent::Connected { transport });

			if inner.config.replay_announcements {
				replay_announcements(&inner, &outbound).await;
			}

			while let Some(envelope) = inbound.recv().await {
				inner.registry.dispatch(&envelope.topic, &envelope.payload);
			}

			inner.outbound.lock().take();
			warn!(transport, "realtime channel lost");
		}

		// A lost session and a failed open take the same path: count the
		// attempt and wait out the interval before reopening.
		transition(&inner, StateEvent::TransportLost);

		match retry.record_failure() {
			Some(delay) => {
				let attempt = retry.attempts();
				inner.attempts.store(attempt, Ordering::SeqCst);
				let _ = inner.status_tx.send(StatusEvent::Reconnecting { attempt });
				debug!(attempt, ?delay, "connection attempt failed; retrying");
				tokio::time::sleep(delay).await;
			}
			None => {
				let attempts = retry.attempts();
				inner.attempts.store(attempts, Ordering::SeqCst);
				transition(&inner, StateEvent::RetriesExhausted);
				error!(attempts, "reconnect ceiling reached; giving up");
				let _ = inner.status_tx.send(StatusEvent::GaveUp { attempts });
				inner.driver.lock().take();
				break;
			}
		}
	}
}

/// Re-issue every recorded topic announcement over a fresh session, so
/// server-side stream registrations survive a reconnect.
async fn replay_announcements(inner: &ClientInner, outbound: &mpsc::Sender<OutboundMessage>) {
	let messages: Vec<OutboundMessage> = inner.announced.lock().iter().map(Announce::subscribe_message).collect();

	for message in messages {
		if outbound.send(message).await.is_err() {
			break;
		}
	}
}
