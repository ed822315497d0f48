use std::fmt;
use std::sync::{Arc, RwLock};

/// Bearer token attached to the transport handshake.
///
/// The debug representation is redacted so tokens never leak into logs.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
	inner: String,
}

impl AccessToken {
	pub fn new<S: Into<String>>(value: S) -> Self {
		Self { inner: value.into() }
	}

	pub fn as_str(&self) -> &str {
		&self.inner
	}

	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}
}

impl fmt::Debug for AccessToken {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "AccessToken([REDACTED])")
	}
}

/// Where the client reads its credential at connection-attempt time.
///
/// The client only ever queries this synchronously; refresh and expiry are
/// the owner's concern. Returning `None` gates the connection attempt off
/// entirely.
pub trait CredentialSource: Send + Sync {
	fn access_token(&self) -> Option<AccessToken>;
}

/// Shared token slot for application code: store a token on login, clear it
/// on logout. Clones share the same slot.
#[derive(Clone, Default)]
pub struct TokenCell {
	slot: Arc<RwLock<Option<AccessToken>>>,
}

impl TokenCell {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_token<S: Into<String>>(token: S) -> Self {
		let cell = Self::new();
		cell.store(AccessToken::new(token));
		cell
	}

	pub fn store(&self, token: AccessToken) {
		if let Ok(mut slot) = self.slot.write() {
			*slot = Some(token);
		}
	}

	pub fn clear(&self) {
		if let Ok(mut slot) = self.slot.write() {
			*slot = None;
		}
	}
}

impl CredentialSource for TokenCell {
	fn access_token(&self) -> Option<AccessToken> {
		self.slot.read().ok().and_then(|slot| slot.clone())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn debug_output_is_redacted() {
		let token = AccessToken::new("super-secret");
		let debug = format!("{:?}", token);
		assert!(!debug.contains("super-secret"));
		assert!(debug.contains("[REDACTED]"));
	}

	#[test]
	fn cell_clones_share_the_slot() {
		let cell = TokenCell::new();
		assert!(cell.access_token().is_none());

		let other = cell.clone();
		other.store(AccessToken::new("abc"));
		assert_eq!(cell.access_token().unwrap().as_str(), "abc");

		cell.clear();
		assert!(other.access_token().is_none());
	}
}
