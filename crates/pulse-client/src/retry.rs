use crate::config::ClientConfig;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryConfig {
	pub max_attempts: u32,
	pub initial_delay: Duration,
	pub backoff_multiplier: f64,
	pub max_delay: Duration,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_attempts: 5,
			initial_delay: Duration::from_secs(1),
			backoff_multiplier: 1.0,
			max_delay: Duration::from_secs(30),
		}
	}
}

impl From<&ClientConfig> for RetryConfig {
	fn from(config: &ClientConfig) -> Self {
		Self {
			max_attempts: config.reconnect_ceiling,
			initial_delay: config.retry_interval,
			backoff_multiplier: config.backoff_multiplier,
			max_delay: config.max_retry_interval,
		}
	}
}

/// Bounded reconnect policy. Owns the consecutive-failure counter; the
/// caller does the sleeping so the arithmetic stays testable without
/// timers.
#[derive(Debug)]
pub struct RetryPolicy {
	config: RetryConfig,
	attempts: u32,
	current_delay: Duration,
}

impl RetryPolicy {
	pub fn new(config: RetryConfig) -> Self {
		let current_delay = config.initial_delay;
		Self {
			config,
			attempts: 0,
			current_delay,
		}
	}

	/// Consecutive failures recorded since the last reset.
	pub fn attempts(&self) -> u32 {
		self.attempts
	}

	/// Record one failed attempt. Returns the delay to wait before the
	/// next attempt, or `None` once the ceiling is reached and the caller
	/// should give up.
	pub fn record_failure(&mut self) -> Option<Duration> {
		self.attempts += 1;

		if self.attempts >= self.config.max_attempts {
			return None;
		}

		let delay = self.current_delay;
		let scaled = self.current_delay.as_millis() as f64 * self.config.backoff_multiplier;
		self.current_delay = Duration::from_millis(scaled as u64).min(self.config.max_delay);
		Some(delay)
	}

	/// A successful connection clears the failure count and the backoff.
	pub fn reset(&mut self) {
		self.attempts = 0;
		self.current_delay = self.config.initial_delay;
	}
}
