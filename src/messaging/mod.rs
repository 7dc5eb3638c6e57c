//! Messaging service collaborator
//!
//! The relay never speaks the messaging protocol itself. It drives a client
//! through the `SessionStore` / `MessagingClient` traits:
//! - `client` - collaborator traits
//! - `events` - handshake and runtime event types
//! - `bridge` - NATS-backed implementation talking to an external bridge
//! - `wire` - JSON payloads exchanged with the bridge

pub mod bridge;
pub mod client;
pub mod events;
pub mod wire;

pub use bridge::{BridgeClient, NatsBridge};
pub use client::{MessagingClient, SessionStore};
pub use events::{ClientEvent, HandshakeEvent, InboundMessage, MediaRef, QuotedRef};
