use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// Lifecycle of the messaging connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    WaitingForPairing,
    Connected,
    ConnectionFailed,
}

impl ConnectionStatus {
    /// Human-readable label shown in the status fragment
    pub fn label(self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting...",
            Self::WaitingForPairing => "Waiting for QR Scan",
            Self::Connected => "Connected",
            Self::ConnectionFailed => "Connection Failed",
        }
    }

    /// Coarse tag used for styling: `connected|disconnected|waiting|connecting`
    pub fn tag(self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Disconnected | Self::ConnectionFailed => "disconnected",
            Self::WaitingForPairing => "waiting",
            Self::Connecting => "connecting",
        }
    }

    /// Whether a new connection attempt may start from this status
    pub fn accepts_connect(self) -> bool {
        matches!(self, Self::Disconnected | Self::ConnectionFailed)
    }

    /// `Connecting` or `WaitingForPairing`
    pub fn is_attempting(self) -> bool {
        matches!(self, Self::Connecting | Self::WaitingForPairing)
    }
}

/// Point-in-time copy of the connection state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerState {
    pub status: ConnectionStatus,

    /// Encoded pairing image; present iff `status == WaitingForPairing`
    pub pairing_payload: Option<Vec<u8>>,

    /// Present iff `status == Connected`
    pub session_start: Option<DateTime<Utc>>,
}

impl ManagerState {
    fn disconnected() -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            pairing_payload: None,
            session_start: None,
        }
    }

    /// Time since the session started, when connected
    pub fn uptime(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        match (self.status, self.session_start) {
            (ConnectionStatus::Connected, Some(start)) => Some(now - start),
            _ => None,
        }
    }
}

impl Default for ManagerState {
    fn default() -> Self {
        Self::disconnected()
    }
}

/// Shared, guarded holder of the connection state.
///
/// Cloning yields another handle to the same state. Every read and write goes
/// through a single lock, and no critical section performs I/O, so readers
/// (HTTP polling) never wait on network activity.
#[derive(Debug, Clone, Default)]
pub struct StatusStore {
    inner: Arc<Mutex<ManagerState>>,
}

impl StatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ManagerState> {
        // Every write replaces the whole tuple before the guard drops, so a
        // poisoned lock still holds a consistent state.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> ManagerState {
        self.lock().clone()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.lock().status
    }

    /// Atomically claim the right to run a connection attempt.
    ///
    /// Returns `false` without touching the state unless the current status
    /// is `Disconnected` or `ConnectionFailed`. This is the only way into
    /// `Connecting`.
    pub fn try_begin_connect(&self) -> bool {
        let mut state = self.lock();
        if !state.status.accepts_connect() {
            debug!(status = ?state.status, "connect already in progress or established");
            return false;
        }
        let from = state.status;
        *state = ManagerState {
            status: ConnectionStatus::Connecting,
            pairing_payload: None,
            session_start: None,
        };
        drop(state);

        info!("Status: {:?} -> Connecting", from);
        true
    }

    /// Publish a (possibly rotated) pairing payload
    pub fn set_waiting_for_pairing(&self, payload: Vec<u8>) -> bool {
        self.transition(
            ConnectionStatus::WaitingForPairing,
            |from| from.is_attempting(),
            ManagerState {
                status: ConnectionStatus::WaitingForPairing,
                pairing_payload: Some(payload),
                session_start: None,
            },
        )
    }

    pub fn set_connected(&self) -> bool {
        self.transition(
            ConnectionStatus::Connected,
            |from| from.is_attempting(),
            ManagerState {
                status: ConnectionStatus::Connected,
                pairing_payload: None,
                session_start: Some(Utc::now()),
            },
        )
    }

    pub fn set_failed(&self) -> bool {
        self.transition(
            ConnectionStatus::ConnectionFailed,
            |from| from.is_attempting(),
            ManagerState {
                status: ConnectionStatus::ConnectionFailed,
                pairing_payload: None,
                session_start: None,
            },
        )
    }

    pub fn set_disconnected(&self) -> bool {
        self.transition(
            ConnectionStatus::Disconnected,
            |from| from == ConnectionStatus::Connected,
            ManagerState::disconnected(),
        )
    }

    /// Replace the state with `next` if `allowed(current)`; otherwise no-op.
    fn transition(
        &self,
        to: ConnectionStatus,
        allowed: impl FnOnce(ConnectionStatus) -> bool,
        next: ManagerState,
    ) -> bool {
        let mut state = self.lock();
        let from = state.status;
        if !allowed(from) {
            debug!("Rejected status transition {:?} -> {:?}", from, to);
            return false;
        }
        *state = next;
        drop(state);

        if from != to {
            info!("Status: {:?} -> {:?}", from, to);
        }
        true
    }
}
