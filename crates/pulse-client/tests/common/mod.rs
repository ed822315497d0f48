#![allow(dead_code)]

use async_trait::async_trait;
use pulse_client::{AccessToken, ClientConfig, Transport, TransportError, TransportLink};
use pulse_events::{EventEnvelope, OutboundMessage};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Test-side handle to one fake session. Push events at the client with
/// `events`, read what it sent with `outbound`, drop the whole handle to
/// simulate losing the connection.
pub struct SessionHandle {
	pub events: mpsc::Sender<EventEnvelope>,
	pub outbound: mpsc::Receiver<OutboundMessage>,
}

#[derive(Default)]
struct MockState {
	open_calls: AtomicUsize,
	fail_always: AtomicBool,
	// Opens succeed but the session ends the moment the client reads it.
	collapse_sessions: AtomicBool,
	// Scripted outcomes consumed front-to-back; once drained, opens succeed.
	outcomes: Mutex<VecDeque<bool>>,
	sessions: Mutex<VecDeque<SessionHandle>>,
}

/// In-memory transport double: opens succeed or fail on script, and each
/// successful open parks a [`SessionHandle`] for the test to drive.
#[derive(Clone, Default)]
pub struct MockTransport {
	state: Arc<MockState>,
}

impl MockTransport {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn open_calls(&self) -> usize {
		self.state.open_calls.load(Ordering::SeqCst)
	}

	/// Queue explicit outcomes for the next opens: `true` succeeds,
	/// `false` fails with a rejection.
	pub fn script(&self, outcomes: impl IntoIterator<Item = bool>) {
		self.state.outcomes.lock().unwrap().extend(outcomes);
	}

	pub fn fail_always(&self) {
		self.state.fail_always.store(true, Ordering::SeqCst);
	}

	/// Every open succeeds, then the session dies immediately — a server
	/// that accepts handshakes but drops connections right away.
	pub fn collapse_sessions(&self) {
		self.state.collapse_sessions.store(true, Ordering::SeqCst);
	}

	pub fn take_session(&self) -> Option<SessionHandle> {
		self.state.sessions.lock().unwrap().pop_front()
	}

	/// Wait until the client has opened a session and hand it over.
	pub async fn next_session(&self) -> SessionHandle {
		for _ in 0..500 {
			if let Some(session) = self.take_session() {
				return session;
			}
			tokio::time::sleep(Duration::from_millis(5)).await;
		}
		panic!("no session was opened within the wait budget");
	}
}

#[async_trait]
impl Transport for MockTransport {
	fn name(&self) -> &'static str {
		"mock"
	}

	async fn open(&self, _config: &ClientConfig, _token: &AccessToken) -> Result<TransportLink, TransportError> {
		self.state.open_calls.fetch_add(1, Ordering::SeqCst);

		let succeed = if self.state.fail_always.load(Ordering::SeqCst) {
			false
		} else {
			self.state.outcomes.lock().unwrap().pop_front().unwrap_or(true)
		};

		if !succeed {
			return Err(TransportError::Rejected("scripted failure".to_string()));
		}

		if self.state.collapse_sessions.load(Ordering::SeqCst) {
			// Drop the test-side halves so the inbound channel closes at once.
			let (out_tx, _) = mpsc::channel(64);
			let (_, in_rx) = mpsc::channel(64);
			return Ok(TransportLink { outbound: out_tx, inbound: in_rx });
		}

		let (out_tx, out_rx) = mpsc::channel(64);
		let (in_tx, in_rx) = mpsc::channel(64);

		self.state.sessions.lock().unwrap().push_back(SessionHandle { events: in_tx, outbound: out_rx });

		Ok(TransportLink { outbound: out_tx, inbound: in_rx })
	}
}

/// Route client logs through the test harness; honors `RUST_LOG`.
pub fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.with_test_writer()
		.try_init();
}

/// Poll `condition` until it holds or the wait budget runs out.
pub async fn wait_for<F: Fn() -> bool>(condition: F) -> bool {
	for _ in 0..500 {
		if condition() {
			return true;
		}
		tokio::time::sleep(Duration::from_millis(5)).await;
	}
	false
}
