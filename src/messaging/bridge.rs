use super::client::{MessagingClient, SessionStore};
use super::events::{ClientEvent, HandshakeEvent, MediaRef, QuotedRef};
use super::wire::{
    self, AcquireDeviceRequest, Command, CommandReply, CommandRequest, DeviceReply,
};
use crate::config::MessagingConfig;
use anyhow::{bail, Context, Result};
use async_nats::{Client, Event};
use base64::Engine;
use futures::stream::{BoxStream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Session store backed by an external messaging bridge reachable over NATS.
///
/// The bridge process speaks the messaging protocol and owns the device
/// store; this side only issues commands and consumes pushed events.
pub struct NatsBridge {
    client: Client,
    prefix: String,
    store: String,
    /// Bumped every time the NATS connection drops
    lost: watch::Receiver<u64>,
}

impl NatsBridge {
    /// Connect to the NATS server the bridge listens on
    pub async fn connect(config: &MessagingConfig) -> Result<Self> {
        info!("Connecting to messaging bridge via NATS at {}", config.nats_url);

        let (lost_tx, lost) = watch::channel(0u64);
        let lost_tx = Arc::new(lost_tx);

        let client = async_nats::ConnectOptions::new()
            .event_callback(move |event| {
                let dropped = matches!(event, Event::Disconnected);
                let lost_tx = Arc::clone(&lost_tx);
                async move {
                    if dropped {
                        warn!("Lost connection to NATS");
                        lost_tx.send_modify(|n| *n += 1);
                    }
                }
            })
            .request_timeout(Some(Duration::from_secs(config.request_timeout_secs)))
            // Keep starting up while the server is down; device requests fail
            // (and the attempt is marked failed) until it is reachable
            .retry_on_initial_connect()
            .connect(config.nats_url.as_str())
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        Ok(Self {
            client,
            prefix: config.subject_prefix.clone(),
            store: config.device_store.clone(),
            lost,
        })
    }
}

#[async_trait::async_trait]
impl SessionStore for NatsBridge {
    async fn open_client(&self) -> Result<Arc<dyn MessagingClient>> {
        let subject = format!("{}.device.acquire", self.prefix);
        let payload = serde_json::to_vec(&AcquireDeviceRequest {
            store: self.store.clone(),
        })?;

        let reply = self
            .client
            .request(subject, payload.into())
            .await
            .context("Device store request failed")?;
        let device: DeviceReply =
            serde_json::from_slice(&reply.payload).context("Invalid device store reply")?;

        if let Some(err) = device.error {
            bail!("device store error: {}", err);
        }
        if device.device_id.is_empty() {
            bail!("device store returned no device");
        }

        info!(
            "Acquired device {} (paired: {})",
            device.device_id,
            device.jid.is_some()
        );

        Ok(Arc::new(BridgeClient {
            nats: self.client.clone(),
            prefix: self.prefix.clone(),
            name: format!("bridge:{}", device.device_id),
            device_id: device.device_id,
            has_session: device.jid.is_some(),
            lost: self.lost.clone(),
        }))
    }
}

/// Messaging client for one bridge-managed device
pub struct BridgeClient {
    nats: Client,
    prefix: String,
    device_id: String,
    has_session: bool,
    name: String,
    lost: watch::Receiver<u64>,
}

impl BridgeClient {
    fn subject(&self, leaf: &str) -> String {
        format!("{}.{}.{}", self.prefix, self.device_id, leaf)
    }

    async fn command(&self, command: Command<'_>) -> Result<CommandReply> {
        let request = CommandRequest {
            request_id: Uuid::new_v4(),
            device_id: &self.device_id,
            command,
        };
        debug!("Bridge command {:?}", request);

        let payload = serde_json::to_vec(&request)?;
        let reply = self
            .nats
            .request(format!("{}.cmd", self.prefix), payload.into())
            .await
            .context("Bridge request failed")?;

        let reply: CommandReply =
            serde_json::from_slice(&reply.payload).context("Invalid bridge reply")?;
        if !reply.ok {
            bail!(
                "bridge error: {}",
                reply.error.as_deref().unwrap_or("unknown error")
            );
        }

        Ok(reply)
    }
}

#[async_trait::async_trait]
impl MessagingClient for BridgeClient {
    fn has_session(&self) -> bool {
        self.has_session
    }

    async fn subscribe(&self) -> Result<BoxStream<'static, ClientEvent>> {
        let subject = self.subject("events");
        let subscriber = self
            .nats
            .subscribe(subject.clone())
            .await
            .context("Failed to subscribe to client events")?;

        info!("Subscribed to {}", subject);

        Ok(subscriber
            .filter_map(|msg| async move {
                match wire::decode_event(&msg.payload) {
                    Ok(event) => Some(event),
                    Err(e) => {
                        warn!("Dropping client event: {:#}", e);
                        None
                    }
                }
            })
            .boxed())
    }

    async fn open_handshake_channel(&self) -> Result<BoxStream<'static, HandshakeEvent>> {
        let subject = self.subject("handshake");
        let subscriber = self
            .nats
            .subscribe(subject.clone())
            .await
            .context("Failed to subscribe to handshake events")?;

        info!("Subscribed to {}", subject);

        let events = subscriber
            .filter_map(|msg| async move {
                match wire::decode_handshake(&msg.payload) {
                    Ok(event) => Some(event),
                    Err(e) => {
                        warn!("Dropping handshake event: {:#}", e);
                        None
                    }
                }
            })
            .boxed();

        // Only drops that happen after the channel is opened end it
        let mut lost = self.lost.clone();
        lost.borrow_and_update();

        Ok(wire::handshake_channel(events, async move {
            let _ = lost.changed().await;
        }))
    }

    async fn connect(&self) -> Result<()> {
        self.command(Command::Connect).await?;
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.command(Command::Disconnect).await?;
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        match self.command(Command::IsConnected).await {
            Ok(reply) => reply.connected.unwrap_or(false),
            Err(e) => {
                warn!("Failed to query connection state: {:#}", e);
                false
            }
        }
    }

    async fn download(&self, media: &MediaRef) -> Result<Vec<u8>> {
        let reply = self.command(Command::Download { media }).await?;
        let data = reply.data.context("Bridge returned no media data")?;

        base64::engine::general_purpose::STANDARD
            .decode(data)
            .context("Invalid base64 media data")
    }

    async fn send(&self, recipient: &str, text: &str, quoted: &QuotedRef) -> Result<()> {
        self.command(Command::Send {
            recipient,
            text,
            quoted,
        })
        .await?;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
