pub mod config;
pub mod error;
pub mod http;
pub mod messaging;
pub mod pairing;
pub mod session;
pub mod transcription;

pub use config::Config;
pub use error::{ConfigError, ConnectionError, TranscriptionError};
pub use http::{create_router, AppState};
pub use messaging::{
    ClientEvent, HandshakeEvent, InboundMessage, MediaRef, MessagingClient, NatsBridge,
    QuotedRef, SessionStore,
};
pub use session::{
    ConnectionCoordinator, ConnectionStatus, EventDispatcher, ManagerState, StatusStore,
};
pub use transcription::{GroqTranscriber, TranscriptionService};
