use super::dispatcher::EventDispatcher;
use super::status::{ConnectionStatus, StatusStore};
use crate::error::ConnectionError;
use crate::messaging::{ClientEvent, HandshakeEvent, MessagingClient, SessionStore};
use crate::pairing;
use futures::stream::{BoxStream, StreamExt};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Client handle of the latest attempt, with the task consuming its events
struct ActiveClient {
    client: Arc<dyn MessagingClient>,
    feed: JoinHandle<()>,
}

/// Drives the connection state machine.
///
/// At most one attempt runs at a time: entry is claimed through
/// `StatusStore::try_begin_connect`, and only the winner ever touches the
/// client handle.
#[derive(Clone)]
pub struct ConnectionCoordinator {
    status: StatusStore,
    sessions: Arc<dyn SessionStore>,
    dispatcher: EventDispatcher,
    active: Arc<Mutex<Option<ActiveClient>>>,
    /// Cancels the attempt that last won the claim
    attempt: Arc<Mutex<Option<CancellationToken>>>,
}

impl ConnectionCoordinator {
    pub fn new(
        status: StatusStore,
        sessions: Arc<dyn SessionStore>,
        dispatcher: EventDispatcher,
    ) -> Self {
        Self {
            status,
            sessions,
            dispatcher,
            active: Arc::new(Mutex::new(None)),
            attempt: Arc::new(Mutex::new(None)),
        }
    }

    pub fn status(&self) -> &StatusStore {
        &self.status
    }

    /// Current client handle, if an attempt has created one
    pub fn client(&self) -> Option<Arc<dyn MessagingClient>> {
        self.lock_active().as_ref().map(|a| Arc::clone(&a.client))
    }

    /// Claim the attempt and run it in the background.
    ///
    /// Returns `None` (and changes nothing) when an attempt is already in
    /// flight or the client is connected.
    pub fn spawn_connect(&self) -> Option<JoinHandle<()>> {
        let cancel = self.claim()?;

        let coordinator = self.clone();
        Some(tokio::spawn(async move { coordinator.run_attempt(cancel).await }))
    }

    /// Claim the attempt and run it to completion on the current task.
    ///
    /// Returns `false` immediately if another attempt holds the claim.
    pub async fn request_connect(&self) -> bool {
        let Some(cancel) = self.claim() else {
            return false;
        };

        self.run_attempt(cancel).await;
        true
    }

    /// Claim and publish the cancel handle under one lock, so `disconnect`
    /// never sees a claimed attempt it cannot cancel.
    fn claim(&self) -> Option<CancellationToken> {
        let mut attempt = self.lock_attempt();
        if !self.status.try_begin_connect() {
            return None;
        }

        let cancel = CancellationToken::new();
        *attempt = Some(cancel.clone());
        Some(cancel)
    }

    async fn run_attempt(&self, cancel: CancellationToken) {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ConnectionError::Cancelled),
            result = self.connect_sequence() => result,
        };

        if let Err(e) = result {
            error!("Connection attempt failed: {}", e);
            self.status.set_failed();
        }
    }

    async fn connect_sequence(&self) -> Result<(), ConnectionError> {
        let client = self
            .sessions
            .open_client()
            .await
            .map_err(ConnectionError::SessionStore)?;

        // Subscribe before connecting so no event is missed
        let events = client.subscribe().await.map_err(ConnectionError::Subscribe)?;
        self.install(Arc::clone(&client), events).await;

        if client.has_session() {
            info!("Reconnecting {} with stored session", client.name());
            client.connect().await.map_err(ConnectionError::Connect)?;
            self.status.set_connected();
            return Ok(());
        }

        info!("No stored session for {}, starting pairing", client.name());
        let mut handshake = client
            .open_handshake_channel()
            .await
            .map_err(ConnectionError::Handshake)?;
        client.connect().await.map_err(ConnectionError::Connect)?;

        while let Some(event) = handshake.next().await {
            match event {
                HandshakeEvent::Code(code) => match pairing::encode_pairing_code(&code) {
                    Ok(png) => {
                        self.status.set_waiting_for_pairing(png);
                    }
                    Err(e) => warn!("Failed to render pairing code: {:#}", e),
                },
                HandshakeEvent::Success => {
                    self.status.set_connected();
                    return Ok(());
                }
                HandshakeEvent::Other(kind) => info!("Login event: {}", kind),
            }
        }

        Err(ConnectionError::HandshakeClosed)
    }

    /// Publish a new client handle and start dispatching its events,
    /// retiring the handle it replaces
    async fn install(
        &self,
        client: Arc<dyn MessagingClient>,
        events: BoxStream<'static, ClientEvent>,
    ) {
        let feed = self.dispatcher.spawn_feed(Arc::clone(&client), events);
        let previous = self.lock_active().replace(ActiveClient {
            client: Arc::clone(&client),
            feed,
        });

        let Some(previous) = previous else {
            return;
        };
        debug!("Replacing client {}", previous.client.name());
        previous.feed.abort();

        if same_client(&previous.client, &client) {
            return;
        }
        if previous.client.is_connected().await {
            info!("Disconnecting replaced client {}", previous.client.name());
            if let Err(e) = previous.client.disconnect().await {
                warn!("Error while disconnecting replaced client: {:#}", e);
            }
        }
    }

    /// Disconnect the client. No-op while `Disconnected`.
    ///
    /// An attempt still in flight is cancelled and ends in
    /// `ConnectionFailed`, from where a new attempt may start.
    pub async fn disconnect(&self) {
        let status = self.status.status();
        if status == ConnectionStatus::Disconnected {
            debug!("Disconnect requested while already disconnected");
            return;
        }

        if let Some(attempt) = self.lock_attempt().take() {
            attempt.cancel();
        }

        if status.is_attempting() {
            info!("Cancelling connection attempt ({:?})", status);
            if let Some(client) = self.client() {
                if let Err(e) = client.disconnect().await {
                    warn!("Error while disconnecting: {:#}", e);
                }
            }
            // The attempt may have reached Connected before it saw the cancel
            if !self.status.set_failed() {
                self.status.set_disconnected();
            }
            return;
        }

        let Some(client) = self.client() else {
            return;
        };
        if !client.is_connected().await {
            debug!("Client {} is not connected", client.name());
            return;
        }

        info!("Disconnecting {}", client.name());
        if let Err(e) = client.disconnect().await {
            warn!("Error while disconnecting: {:#}", e);
        }
        self.status.set_disconnected();
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<ActiveClient>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_attempt(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.attempt.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn same_client(a: &Arc<dyn MessagingClient>, b: &Arc<dyn MessagingClient>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}
