mod common;

#[cfg(test)]
mod tests {
	use crate::common::{wait_for, MockTransport};
	use pulse_client::{handler, ClientConfig, ConnectionState, RealtimeClient, StatusEvent, TokenCell, Transport};
	use pulse_events::{EventEnvelope, OutboundMessage, Topic};
	use serde_json::json;
	use std::sync::{Arc, Mutex};
	use std::time::Duration;

	fn fast_config(ceiling: u32) -> ClientConfig {
		ClientConfig::builder()
			.reconnect_ceiling(ceiling)
			.retry_interval(Duration::from_millis(20))
			.build()
			.unwrap()
	}

	fn client_with(mock: &MockTransport, config: ClientConfig, tokens: TokenCell) -> RealtimeClient {
		crate::common::init_tracing();
		let transports: Vec<Arc<dyn Transport>> = vec![Arc::new(mock.clone())];
		RealtimeClient::with_transports(config, Arc::new(tokens), transports)
	}

	// ============================================================================
	// LIFECYCLE TESTS
	// ============================================================================

	#[tokio::test]
	async fn test_connect_is_idempotent() {
		let mock = MockTransport::new();
		let client = client_with(&mock, fast_config(5), TokenCell::with_token("jwt"));

		client.connect();
		client.connect();
		client.connect();

		assert!(wait_for(|| client.is_connected()).await, "client should reach Connected");
		tokio::time::sleep(Duration::from_millis(50)).await;
		assert_eq!(mock.open_calls(), 1, "repeat connect calls must not open extra sessions");

		client.disconnect();
		assert_eq!(client.state(), ConnectionState::Disconnected);
	}

	#[tokio::test]
	async fn test_missing_token_gates_connection() {
		let mock = MockTransport::new();
		let client = client_with(&mock, fast_config(5), TokenCell::new());

		client.connect();
		tokio::time::sleep(Duration::from_millis(50)).await;

		assert_eq!(client.state(), ConnectionState::Disconnected, "no token means no connection attempt");
		assert_eq!(mock.open_calls(), 0);
	}

	#[tokio::test]
	async fn test_emit_while_disconnected_is_dropped() {
		let mock = MockTransport::new();
		let client = client_with(&mock, fast_config(5), TokenCell::new());

		// Must not panic or queue anything.
		client.emit(Topic::Alerts, Some(json!({"n": 1})));
		assert_eq!(mock.open_calls(), 0);
	}

	#[tokio::test]
	async fn test_disconnect_then_reconnect_starts_clean() {
		let mock = MockTransport::new();
		let client = client_with(&mock, fast_config(5), TokenCell::with_token("jwt"));

		client.connect();
		assert!(wait_for(|| client.is_connected()).await);
		client.disconnect();
		assert!(!client.is_connected());

		client.connect();
		assert!(wait_for(|| client.is_connected()).await, "client should reconnect after an explicit disconnect");
		assert_eq!(mock.open_calls(), 2);
		client.disconnect();
	}

	// ============================================================================
	// RETRY TESTS
	// ============================================================================

	#[tokio::test]
	async fn test_reconnect_ceiling_is_honored() {
		let mock = MockTransport::new();
		mock.fail_always();
		let client = client_with(&mock, fast_config(3), TokenCell::with_token("jwt"));
		let mut feed = client.status_feed();

		client.connect();

		let gave_up = tokio::time::timeout(Duration::from_secs(2), async {
			loop {
				match feed.recv().await {
					Ok(StatusEvent::GaveUp { attempts }) => break attempts,
					Ok(_) => {}
					Err(err) => panic!("status feed closed early: {err}"),
				}
			}
		})
		.await
		.expect("client should give up within the wait budget");

		assert_eq!(gave_up, 3);
		assert_eq!(client.state(), ConnectionState::Disconnected);

		// No further attempt after giving up.
		tokio::time::sleep(Duration::from_millis(100)).await;
		assert_eq!(mock.open_calls(), 3, "ceiling of 3 means exactly 3 attempts");
	}

	#[tokio::test]
	async fn test_attempts_reset_after_recovery() {
		let mock = MockTransport::new();
		mock.script([false, true]);
		let client = client_with(&mock, fast_config(5), TokenCell::with_token("jwt"));

		client.connect();
		assert!(wait_for(|| client.is_connected()).await, "second attempt should succeed");
		assert_eq!(client.reconnect_attempts(), 0, "success clears the attempt counter");

		// Lose the session; the next open succeeds by default.
		let session = mock.next_session().await;
		drop(session);

		let _session = mock.next_session().await;
		assert!(wait_for(|| client.is_connected()).await, "client should recover from a dropped session");
		assert_eq!(client.reconnect_attempts(), 0);
		client.disconnect();
	}

	#[tokio::test]
	async fn test_session_loss_waits_out_the_retry_interval() {
		let mock = MockTransport::new();
		mock.collapse_sessions();
		let config = ClientConfig::builder()
			.reconnect_ceiling(5)
			.retry_interval(Duration::from_millis(500))
			.build()
			.unwrap();
		let client = client_with(&mock, config, TokenCell::with_token("jwt"));

		client.connect();
		assert!(wait_for(|| mock.open_calls() >= 1).await);

		// The first session dies immediately; the next open must wait the
		// full interval, so none lands inside this window.
		tokio::time::sleep(Duration::from_millis(300)).await;
		assert_eq!(mock.open_calls(), 1, "a lost session must not be reopened before the retry interval elapses");
		assert_eq!(client.state(), ConnectionState::Reconnecting);
		assert!(client.reconnect_attempts() >= 1, "session loss counts as a reconnect attempt");
		client.disconnect();
	}

	#[tokio::test]
	async fn test_disconnect_cancels_pending_retry() {
		let mock = MockTransport::new();
		mock.fail_always();
		let config = ClientConfig::builder()
			.reconnect_ceiling(5)
			.retry_interval(Duration::from_millis(500))
			.build()
			.unwrap();
		let client = client_with(&mock, config, TokenCell::with_token("jwt"));

		client.connect();
		assert!(wait_for(|| mock.open_calls() == 1).await);
		client.disconnect();

		// The retry that was sleeping must never fire.
		tokio::time::sleep(Duration::from_millis(700)).await;
		assert_eq!(mock.open_calls(), 1, "disconnect must cancel the pending retry");
		assert_eq!(client.state(), ConnectionState::Disconnected);
	}

	// ============================================================================
	// MESSAGING TESTS
	// ============================================================================

	#[tokio::test]
	async fn test_events_fan_out_to_handlers() {
		let mock = MockTransport::new();
		let client = client_with(&mock, fast_config(5), TokenCell::with_token("jwt"));
		client.connect();
		let session = mock.next_session().await;

		let seen = Arc::new(Mutex::new(Vec::new()));
		let sink = seen.clone();
		client.subscribe(
			Topic::Decision("42".into()),
			handler(move |payload| {
				sink.lock().unwrap().push(payload.clone());
				Ok(())
			}),
		);

		session
			.events
			.send(EventEnvelope::new(Topic::Decision("42".into()), json!({"progress": 50})))
			.await
			.unwrap();

		assert!(wait_for(|| !seen.lock().unwrap().is_empty()).await, "event should reach the handler");
		assert_eq!(seen.lock().unwrap()[0], json!({"progress": 50}));
		client.disconnect();
	}

	#[tokio::test]
	async fn test_emit_flows_over_the_session() {
		let mock = MockTransport::new();
		let client = client_with(&mock, fast_config(5), TokenCell::with_token("jwt"));
		client.connect();
		let mut session = mock.next_session().await;
		assert!(wait_for(|| client.is_connected()).await);

		client.emit(Topic::custom("ping"), Some(json!({"n": 1})));

		let sent = tokio::time::timeout(Duration::from_secs(1), session.outbound.recv())
			.await
			.expect("emit should reach the transport")
			.expect("session should still be open");
		assert_eq!(sent, OutboundMessage::new(Topic::custom("ping"), Some(json!({"n": 1}))));
		client.disconnect();
	}

	#[tokio::test]
	async fn test_announcements_replayed_after_reconnect() {
		let mock = MockTransport::new();
		let client = client_with(&mock, fast_config(5), TokenCell::with_token("jwt"));

		// Announce before any session exists; the announcement is recorded.
		client.subscribe_to_alerts(handler(|_| Ok(())));

		client.connect();
		let mut first = mock.next_session().await;
		let announced = tokio::time::timeout(Duration::from_secs(1), first.outbound.recv())
			.await
			.expect("announcement should be sent on connect")
			.unwrap();
		assert_eq!(announced.topic, Topic::custom("subscribe:alerts"));

		// Lose the session and expect the same announcement on the next one.
		drop(first);
		let mut second = mock.next_session().await;
		let replayed = tokio::time::timeout(Duration::from_secs(1), second.outbound.recv())
			.await
			.expect("announcement should be replayed after reconnect")
			.unwrap();
		assert_eq!(replayed.topic, Topic::custom("subscribe:alerts"));
		client.disconnect();
	}

	#[tokio::test]
	async fn test_typed_retract_clears_handlers_and_notifies_server() {
		let mock = MockTransport::new();
		let client = client_with(&mock, fast_config(5), TokenCell::with_token("jwt"));
		client.connect();
		let mut session = mock.next_session().await;
		assert!(wait_for(|| client.is_connected()).await);

		client.subscribe_to_decision("42", handler(|_| Ok(())));
		let subscribe_msg = tokio::time::timeout(Duration::from_secs(1), session.outbound.recv()).await.unwrap().unwrap();
		assert_eq!(subscribe_msg.topic, Topic::custom("subscribe:decision"));
		assert_eq!(subscribe_msg.payload, Some(json!({"sessionId": "42"})));

		client.unsubscribe_from_decision("42");
		let retract_msg = tokio::time::timeout(Duration::from_secs(1), session.outbound.recv()).await.unwrap().unwrap();
		assert_eq!(retract_msg.topic, Topic::custom("unsubscribe:decision"));
		client.disconnect();
	}

	#[tokio::test]
	async fn test_typed_unsubscribe_tears_down_the_whole_stream() {
		let mock = MockTransport::new();
		let client = client_with(&mock, fast_config(5), TokenCell::with_token("jwt"));
		client.connect();
		let session = mock.next_session().await;
		assert!(wait_for(|| client.is_connected()).await);

		// Two independent parts of the application follow the same session.
		let seen = Arc::new(Mutex::new(Vec::new()));
		for tag in ["widget", "sidebar"] {
			let sink = seen.clone();
			client.subscribe_to_decision(
				"42",
				handler(move |_| {
					sink.lock().unwrap().push(tag);
					Ok(())
				}),
			);
		}

		client.unsubscribe_from_decision("42");

		session
			.events
			.send(EventEnvelope::new(Topic::Decision("42".into()), json!({"progress": 10})))
			.await
			.unwrap();
		tokio::time::sleep(Duration::from_millis(100)).await;
		assert!(seen.lock().unwrap().is_empty(), "typed unsubscribe clears every handler on the stream");
		client.disconnect();
	}
}
