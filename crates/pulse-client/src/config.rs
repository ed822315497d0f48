use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Which transports a connection attempt may use, in preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportPreference {
	/// Persistent socket first, long-poll when the socket cannot be opened.
	WebSocketThenPolling,
	WebSocketOnly,
	PollingOnly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
	/// Push-event endpoint, `ws://` or `wss://`.
	pub endpoint: String,
	/// Consecutive failed attempts tolerated before the client gives up.
	pub reconnect_ceiling: u32,
	/// Delay before each reconnect attempt.
	pub retry_interval: Duration,
	/// 1.0 keeps the interval fixed; above 1.0 backs off multiplicatively.
	pub backoff_multiplier: f64,
	/// Upper bound on a backed-off retry interval.
	pub max_retry_interval: Duration,
	/// Budget for a single transport handshake.
	pub connect_timeout: Duration,
	/// Delay between poll requests on the long-poll fallback transport.
	pub poll_interval: Duration,
	/// Re-send recorded topic announcements after a reconnect.
	pub replay_announcements: bool,
	pub transports: TransportPreference,
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			endpoint: "ws://127.0.0.1:4000/realtime".to_string(),
			reconnect_ceiling: 5,
			retry_interval: Duration::from_secs(1),
			backoff_multiplier: 1.0,
			max_retry_interval: Duration::from_secs(30),
			connect_timeout: Duration::from_secs(10),
			poll_interval: Duration::from_secs(2),
			replay_announcements: true,
			transports: TransportPreference::WebSocketThenPolling,
		}
	}
}

impl ClientConfig {
	pub fn builder() -> ConfigBuilder {
		ConfigBuilder::new()
	}
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
	#[error("endpoint must not be empty")]
	EmptyEndpoint,
	#[error("reconnect ceiling must be at least 1")]
	ZeroReconnectCeiling,
	#[error("retry interval must be non-zero")]
	ZeroRetryInterval,
	#[error("multiple validation errors: {0:?}")]
	Multiple(Vec<ValidationError>),
}

/// Configuration builder with validation.
pub struct ConfigBuilder {
	config: ClientConfig,
	validation_errors: Vec<ValidationError>,
}

impl ConfigBuilder {
	pub fn new() -> Self {
		Self {
			config: ClientConfig::default(),
			validation_errors: Vec::new(),
		}
	}

	pub fn endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
		self.config.endpoint = endpoint.into();
		self
	}

	pub fn reconnect_ceiling(mut self, ceiling: u32) -> Self {
		self.config.reconnect_ceiling = ceiling;
		self
	}

	pub fn retry_interval(mut self, interval: Duration) -> Self {
		self.config.retry_interval = interval;
		self
	}

	pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
		self.config.backoff_multiplier = multiplier;
		self
	}

	pub fn max_retry_interval(mut self, interval: Duration) -> Self {
		self.config.max_retry_interval = interval;
		self
	}

	pub fn connect_timeout(mut self, timeout: Duration) -> Self {
		self.config.connect_timeout = timeout;
		self
	}

	pub fn poll_interval(mut self, interval: Duration) -> Self {
		self.config.poll_interval = interval;
		self
	}

	pub fn replay_announcements(mut self, replay: bool) -> Self {
		self.config.replay_announcements = replay;
		self
	}

	pub fn transports(mut self, preference: TransportPreference) -> Self {
		self.config.transports = preference;
		self
	}

	pub fn build(mut self) -> Result<ClientConfig, ValidationError> {
		self.validate()?;
		Ok(self.config)
	}

	fn validate(&mut self) -> Result<(), ValidationError> {
		if self.config.endpoint.is_empty() {
			self.validation_errors.push(ValidationError::EmptyEndpoint);
		}

		if self.config.reconnect_ceiling == 0 {
			self.validation_errors.push(ValidationError::ZeroReconnectCeiling);
		}

		if self.config.retry_interval.is_zero() {
			self.validation_errors.push(ValidationError::ZeroRetryInterval);
		}

		match self.validation_errors.len() {
			0 => Ok(()),
			1 => Err(self.validation_errors.remove(0)),
			_ => Err(ValidationError::Multiple(std::mem::take(&mut self.validation_errors))),
		}
	}
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}
