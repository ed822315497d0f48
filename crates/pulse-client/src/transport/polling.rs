use super::{Transport, TransportError, TransportLink};
use crate::config::ClientConfig;
use crate::credentials::AccessToken;
use async_trait::async_trait;
use pulse_events::EventEnvelope;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

const CHANNEL_CAPACITY: usize = 64;
const DEFAULT_FAILURE_CEILING: u32 = 3;

/// Fallback transport for networks that will not hold a socket open:
/// periodic GET for queued events, POST for outbound messages. The poll
/// cadence comes from [`ClientConfig::poll_interval`].
pub struct PollingTransport {
	http: reqwest::Client,
	failure_ceiling: u32,
}

impl PollingTransport {
	pub fn new() -> Self {
		Self {
			http: reqwest::Client::new(),
			failure_ceiling: DEFAULT_FAILURE_CEILING,
		}
	}

	/// Rewrite the push endpoint into its HTTP base: `wss://` hosts serve
	/// polling over `https://`, `ws://` over `http://`.
	fn http_base(endpoint: &str) -> Result<String, TransportError> {
		if let Some(rest) = endpoint.strip_prefix("wss://") {
			Ok(format!("https://{}", rest))
		} else if let Some(rest) = endpoint.strip_prefix("ws://") {
			Ok(format!("http://{}", rest))
		} else {
			Err(TransportError::Endpoint(format!("expected a ws:// or wss:// endpoint, got {}", endpoint)))
		}
	}
}

impl Default for PollingTransport {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl Transport for PollingTransport {
	fn name(&self) -> &'static str {
		"polling"
	}

	async fn open(&self, config: &ClientConfig, token: &AccessToken) -> Result<TransportLink, TransportError> {
		let base = Self::http_base(&config.endpoint)?;
		let poll_url = format!("{}/poll", base);
		let emit_url = format!("{}/emit", base);
		let bearer = token.as_str().to_string();

		// Probe once before reporting the session open, so an expired
		// token fails the attempt instead of silently polling nothing.
		let probe = tokio::time::timeout(config.connect_timeout, self.http.get(&poll_url).bearer_auth(&bearer).send())
			.await
			.map_err(|_| TransportError::Timeout(config.connect_timeout))??;
		if probe.status() == reqwest::StatusCode::UNAUTHORIZED {
			return Err(TransportError::Rejected("polling endpoint rejected the access token".to_string()));
		}
		let probe = probe.error_for_status()?;

		debug!(endpoint = %poll_url, "polling session established");

		let (out_tx, mut out_rx) = mpsc::channel(CHANNEL_CAPACITY);
		let (in_tx, in_rx) = mpsc::channel::<EventEnvelope>(CHANNEL_CAPACITY);

		// The probe response may already carry queued events.
		let mut backlog: Vec<EventEnvelope> = probe.json().await.unwrap_or_default();

		let http = self.http.clone();
		let interval = config.poll_interval;
		let failure_ceiling = self.failure_ceiling;

		tokio::spawn(async move {
			for envelope in backlog.drain(..) {
				if in_tx.send(envelope).await.is_err() {
					return;
				}
			}

			let mut ticker = tokio::time::interval(interval);
			ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
			let mut consecutive_failures: u32 = 0;

			loop {
				tokio::select! {
					outgoing = out_rx.recv() => {
						let Some(message) = outgoing else { break };
						if let Err(error) = http.post(&emit_url).bearer_auth(&bearer).json(&message).send().await {
							warn!(%error, "emit over polling transport failed");
						}
					}
					_ = ticker.tick() => {
						let events = match http.get(&poll_url).bearer_auth(&bearer).send().await {
							Ok(response) => match response.error_for_status() {
								Ok(response) => response.json::<Vec<EventEnvelope>>().await,
								Err(error) => Err(error),
							},
							Err(error) => Err(error),
						};

						match events {
							Ok(events) => {
								consecutive_failures = 0;
								for envelope in events {
									if in_tx.send(envelope).await.is_err() {
										return;
									}
								}
							}
							Err(error) => {
								consecutive_failures += 1;
								warn!(%error, consecutive_failures, "poll request failed");
								if consecutive_failures >= failure_ceiling {
									break;
								}
							}
						}
					}
				}
			}
		});

		Ok(TransportLink { outbound: out_tx, inbound: in_rx })
	}
}
