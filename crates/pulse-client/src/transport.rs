pub mod polling;
pub mod websocket;

use crate::config::ClientConfig;
use crate::credentials::AccessToken;
use async_trait::async_trait;
use pulse_events::{EventEnvelope, OutboundMessage};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum TransportError {
	#[error("websocket error: {0}")]
	WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
	#[error("http error: {0}")]
	Http(#[from] reqwest::Error),
	/// The server refused the session, typically a bad or expired token.
	#[error("connection rejected: {0}")]
	Rejected(String),
	#[error("handshake timed out after {0:?}")]
	Timeout(Duration),
	#[error("invalid endpoint: {0}")]
	Endpoint(String),
}

/// An open, authenticated session. Messages go out through `outbound`;
/// events arrive on `inbound`. The session is over when `inbound` drains
/// to `None`.
pub struct TransportLink {
	pub outbound: mpsc::Sender<OutboundMessage>,
	pub inbound: mpsc::Receiver<EventEnvelope>,
}

/// One way of reaching the push endpoint. Implementations own their wire
/// details behind the channel pair; the connection driver treats them all
/// the same.
#[async_trait]
pub trait Transport: Send + Sync {
	fn name(&self) -> &'static str;

	/// Establish an authenticated session. A returned link means the
	/// server accepted the credential and events may start flowing.
	async fn open(&self, config: &ClientConfig, token: &AccessToken) -> Result<TransportLink, TransportError>;
}
