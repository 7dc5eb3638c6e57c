use super::events::{ClientEvent, HandshakeEvent, MediaRef, QuotedRef};
use anyhow::Result;
use futures::stream::BoxStream;
use std::sync::Arc;

/// Persisted device/session store of the messaging service.
///
/// Implementations:
/// - `NatsBridge`: device store owned by an external bridge process, reached over NATS
/// - In-memory fakes in the integration tests
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Acquire the stored device identity (creating a fresh one if none
    /// exists) and build a client bound to it
    async fn open_client(&self) -> Result<Arc<dyn MessagingClient>>;
}

/// Client for a single device identity of the messaging service
#[async_trait::async_trait]
pub trait MessagingClient: Send + Sync {
    /// Whether the device already has an authenticated session
    /// (i.e. it can connect without pairing)
    fn has_session(&self) -> bool;

    /// Subscribe to the runtime event feed. Called once per client, before
    /// `connect`, so no event is missed.
    async fn subscribe(&self) -> Result<BoxStream<'static, ClientEvent>>;

    /// Open the pairing handshake channel. Must be opened before `connect`;
    /// the stream ends when the handshake is over.
    async fn open_handshake_channel(&self) -> Result<BoxStream<'static, HandshakeEvent>>;

    async fn connect(&self) -> Result<()>;

    async fn disconnect(&self) -> Result<()>;

    async fn is_connected(&self) -> bool;

    /// Download and decrypt media referenced by an inbound message
    async fn download(&self, media: &MediaRef) -> Result<Vec<u8>>;

    /// Send a text message quoting an earlier message
    async fn send(&self, recipient: &str, text: &str, quoted: &QuotedRef) -> Result<()>;

    /// Client name for logging
    fn name(&self) -> &str;
}
