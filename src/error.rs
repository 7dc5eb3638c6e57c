use thiserror::Error;

/// Startup configuration problems. Fatal: the process does not start.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required credential: {0}")]
    MissingCredential(&'static str),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Source(#[from] config::ConfigError),
}

/// Failures of a single connection attempt.
///
/// Never surfaced to HTTP callers; the coordinator logs them and moves the
/// status to `ConnectionFailed`.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("session store unavailable: {0:#}")]
    SessionStore(anyhow::Error),

    #[error("failed to subscribe to client events: {0:#}")]
    Subscribe(anyhow::Error),

    #[error("failed to open handshake channel: {0:#}")]
    Handshake(anyhow::Error),

    #[error("connect failed: {0:#}")]
    Connect(anyhow::Error),

    #[error("handshake channel closed before pairing succeeded")]
    HandshakeClosed,

    #[error("attempt cancelled by disconnect")]
    Cancelled,
}

/// Failures talking to the transcription service. The message is dropped.
#[derive(Debug, Error)]
pub enum TranscriptionError {
    #[error("audio payload is empty")]
    EmptyAudio,

    #[error("transcription request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("transcription API error {status}: {body}")]
    Api { status: u16, body: String },
}
