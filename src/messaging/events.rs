use serde::{Deserialize, Serialize};

/// Event on the pairing handshake channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeEvent {
    /// A fresh pairing code; replaces any previously shown code
    Code(String),
    /// The device was paired and the session is authenticated
    Success,
    /// Any other handshake event (timeout, error, ...), by name
    Other(String),
}

impl HandshakeEvent {
    /// Anything but a new code ends the handshake. An `Other("code")` is a
    /// code event that arrived without a payload, so it is not terminal.
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Code(_) => false,
            Self::Success => true,
            Self::Other(kind) => kind != "code",
        }
    }
}

/// Runtime event from the messaging client's event feed
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// The client lost (or closed) its connection
    Disconnected,
    /// An inbound message
    Message(InboundMessage),
    /// Anything the relay does not act on
    Other(String),
}

/// Opaque reference to downloadable media, understood by the messaging client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRef {
    #[serde(default)]
    pub mimetype: Option<String>,

    /// Client-specific descriptor (URL, keys, hashes, ...)
    pub descriptor: serde_json::Value,
}

/// A message received by the connected account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Message ID assigned by the messaging service
    pub id: String,

    /// Address of the sender
    pub sender: String,

    /// Audio attachment (voice note), if any
    #[serde(default)]
    pub audio: Option<MediaRef>,

    /// Original message content, carried verbatim for quoting
    #[serde(default)]
    pub content: serde_json::Value,
}

impl InboundMessage {
    /// Reference used to render a reply as a threaded response to this message
    pub fn quoted(&self) -> QuotedRef {
        QuotedRef {
            sender: self.sender.clone(),
            message_id: self.id.clone(),
            content: self.content.clone(),
        }
    }
}

/// Quoted-reply context: who sent the original, its ID and its content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotedRef {
    pub sender: String,
    pub message_id: String,
    pub content: serde_json::Value,
}
