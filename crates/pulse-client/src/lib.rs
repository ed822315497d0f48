//! Realtime update client for the dashboard's push channel.
//!
//! The client keeps one long-lived, authenticated session to the push
//! endpoint, multiplexes every event stream over it, and fans inbound
//! events out to topic-registered handlers. Connections are gated on a
//! [`CredentialSource`] and survive transient outages through a bounded
//! reconnect loop with an optional polling fallback.
//!
//! ```no_run
//! use pulse_client::{handler, ClientConfig, RealtimeClient, TokenCell};
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let tokens = TokenCell::with_token("session-jwt");
//! let config = ClientConfig::builder().endpoint("wss://push.example.com/realtime").build()?;
//!
//! let client = RealtimeClient::new(config, Arc::new(tokens));
//! client.connect();
//!
//! client.subscribe_to_decision(
//! 	"42",
//! 	handler(|payload| {
//! 		println!("decision progress: {payload}");
//! 		Ok(())
//! 	}),
//! );
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod credentials;
pub mod registry;
pub mod retry;
pub mod state;
pub mod transport;

pub use client::{RealtimeClient, StatusEvent};
pub use config::{ClientConfig, ConfigBuilder, TransportPreference, ValidationError};
pub use credentials::{AccessToken, CredentialSource, TokenCell};
pub use registry::{handler, DispatchReport, Handler, HandlerError, HandlerRegistry, Subscription};
pub use state::ConnectionState;
pub use transport::{Transport, TransportError, TransportLink};

pub use pulse_events::{Announce, EventEnvelope, OutboundMessage, Topic};
