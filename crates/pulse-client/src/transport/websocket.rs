use super::{Transport, TransportError, TransportLink};
use crate::config::ClientConfig;
use crate::credentials::AccessToken;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use pulse_events::EventEnvelope;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, warn};

const CHANNEL_CAPACITY: usize = 64;

/// Preferred transport: a persistent socket carrying JSON text frames in
/// both directions.
#[derive(Debug, Default)]
pub struct WebSocketTransport;

impl WebSocketTransport {
	pub fn new() -> Self {
		Self
	}
}

#[async_trait]
impl Transport for WebSocketTransport {
	fn name(&self) -> &'static str {
		"websocket"
	}

	async fn open(&self, config: &ClientConfig, token: &AccessToken) -> Result<TransportLink, TransportError> {
		let mut request = config.endpoint.clone().into_client_request()?;
		let bearer = HeaderValue::from_str(&format!("Bearer {}", token.as_str())).map_err(|_| TransportError::Rejected("token is not a valid header value".to_string()))?;
		request.headers_mut().insert(AUTHORIZATION, bearer);

		let (stream, _response) = tokio::time::timeout(config.connect_timeout, connect_async(request))
			.await
			.map_err(|_| TransportError::Timeout(config.connect_timeout))??;

		debug!(endpoint = %config.endpoint, "websocket session established");

		let (mut sink, mut source) = stream.split();
		let (out_tx, mut out_rx) = mpsc::channel(CHANNEL_CAPACITY);
		let (in_tx, in_rx) = mpsc::channel(CHANNEL_CAPACITY);

		// Pump task owns the socket; dropping in_tx on exit tells the
		// driver the session is gone.
		tokio::spawn(async move {
			loop {
				tokio::select! {
					outgoing = out_rx.recv() => {
						let Some(message) = outgoing else { break };
						let text = match serde_json::to_string(&message) {
							Ok(text) => text,
							Err(error) => {
								warn!(%error, "dropping unserializable outbound message");
								continue;
							}
						};
						if let Err(error) = sink.send(WsMessage::Text(text.into())).await {
							warn!(%error, "websocket send failed");
							break;
						}
					}
					incoming = source.next() => {
						match incoming {
							Some(Ok(WsMessage::Text(text))) => match serde_json::from_str::<EventEnvelope>(&text) {
								Ok(envelope) => {
									if in_tx.send(envelope).await.is_err() {
										break;
									}
								}
								Err(error) => warn!(%error, "ignoring malformed event frame"),
							},
							Some(Ok(WsMessage::Ping(payload))) => {
								if sink.send(WsMessage::Pong(payload)).await.is_err() {
									break;
								}
							}
							Some(Ok(WsMessage::Close(frame))) => {
								debug!(?frame, "server closed the websocket");
								break;
							}
							Some(Ok(_)) => {}
							Some(Err(error)) => {
								warn!(%error, "websocket read failed");
								break;
							}
							None => break,
						}
					}
				}
			}
		});

		Ok(TransportLink { outbound: out_tx, inbound: in_rx })
	}
}
