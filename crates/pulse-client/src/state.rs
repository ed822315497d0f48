use serde::{Deserialize, Serialize};

// Connection state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
	Disconnected,
	Connecting,
	Connected,
	Reconnecting,
}

// Events that can trigger state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateEvent {
	ConnectRequested,
	TransportOpened,
	TransportLost,
	RetriesExhausted,
	DisconnectRequested,
}

impl ConnectionState {
	/// Pure transition function. Events that make no sense in the current
	/// state leave it unchanged, which is what makes `connect()` and
	/// `disconnect()` idempotent at the call sites.
	pub fn apply(self, event: StateEvent) -> ConnectionState {
		use ConnectionState::*;
		use StateEvent::*;

		match (self, event) {
			(Disconnected, ConnectRequested) => Connecting,
			(Connecting | Reconnecting, TransportOpened) => Connected,
			(Connecting | Connected, TransportLost) => Reconnecting,
			(Reconnecting, RetriesExhausted) => Disconnected,
			(_, DisconnectRequested) => Disconnected,
			(state, _) => state, // no-op if event invalid in current state
		}
	}

	pub fn is_connected(self) -> bool {
		matches!(self, ConnectionState::Connected)
	}
}
