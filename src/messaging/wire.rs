use super::events::{ClientEvent, HandshakeEvent, InboundMessage, MediaRef, QuotedRef};
use anyhow::{Context, Result};
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use std::future::Future;
use uuid::Uuid;

/// Request published on `{prefix}.device.acquire`
#[derive(Debug, Serialize, Deserialize)]
pub struct AcquireDeviceRequest {
    /// Bridge-side location of the device store
    pub store: String,
}

/// Reply to `AcquireDeviceRequest`
#[derive(Debug, Serialize, Deserialize)]
pub struct DeviceReply {
    #[serde(default)]
    pub device_id: String,

    /// Account address of the device; absent until the device has been paired
    #[serde(default)]
    pub jid: Option<String>,

    #[serde(default)]
    pub error: Option<String>,
}

/// Command for a device, published on `{prefix}.cmd`
#[derive(Debug, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command<'a> {
    Connect,
    Disconnect,
    IsConnected,
    Download {
        media: &'a MediaRef,
    },
    Send {
        recipient: &'a str,
        text: &'a str,
        quoted: &'a QuotedRef,
    },
}

#[derive(Debug, Serialize)]
pub struct CommandRequest<'a> {
    pub request_id: Uuid,
    pub device_id: &'a str,
    #[serde(flatten)]
    pub command: Command<'a>,
}

/// Reply to any `CommandRequest`
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CommandReply {
    pub ok: bool,

    #[serde(default)]
    pub error: Option<String>,

    /// Set by `is_connected`
    #[serde(default)]
    pub connected: Option<bool>,

    /// Base64-encoded media bytes, set by `download`
    #[serde(default)]
    pub data: Option<String>,
}

/// Handshake event pushed on `{prefix}.{device}.handshake`
#[derive(Debug, Serialize, Deserialize)]
pub struct HandshakeMessage {
    pub event: String,

    #[serde(default)]
    pub code: Option<String>,
}

/// Runtime event pushed on `{prefix}.{device}.events`
#[derive(Debug, Serialize, Deserialize)]
pub struct EventMessage {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub message: Option<InboundMessage>,
}

pub fn decode_handshake(payload: &[u8]) -> Result<HandshakeEvent> {
    let msg: HandshakeMessage =
        serde_json::from_slice(payload).context("Invalid handshake event payload")?;

    Ok(match (msg.event.as_str(), msg.code) {
        ("code", Some(code)) if !code.is_empty() => HandshakeEvent::Code(code),
        ("success", _) => HandshakeEvent::Success,
        (other, _) => HandshakeEvent::Other(other.to_string()),
    })
}

pub fn decode_event(payload: &[u8]) -> Result<ClientEvent> {
    let msg: EventMessage =
        serde_json::from_slice(payload).context("Invalid client event payload")?;

    Ok(match (msg.kind.as_str(), msg.message) {
        ("disconnected", _) => ClientEvent::Disconnected,
        ("message", Some(message)) => ClientEvent::Message(message),
        (other, _) => ClientEvent::Other(other.to_string()),
    })
}

/// Wrap a raw handshake subscription so it ends like a channel would.
///
/// A subject never ends on its own: the stream is closed right after the
/// first terminal event, or as soon as `lost` resolves.
pub fn handshake_channel<F>(
    events: BoxStream<'static, HandshakeEvent>,
    lost: F,
) -> BoxStream<'static, HandshakeEvent>
where
    F: Future<Output = ()> + Send + 'static,
{
    stream::unfold((events, false), |(mut events, done)| async move {
        if done {
            return None;
        }
        let event = match events.next().await {
            Some(event) => event,
            None => return None,
        };
        let terminal = event.is_terminal();
        Some((event, (events, terminal)))
    })
    .take_until(lost)
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::{mpsc, oneshot};
    use futures::executor::block_on;
    use futures::future::{self, FutureExt};

    #[test]
    fn test_decode_handshake_code() {
        let event = decode_handshake(br#"{"event":"code","code":"2@abc,def"}"#).unwrap();
        assert_eq!(event, HandshakeEvent::Code("2@abc,def".to_string()));
    }

    #[test]
    fn test_decode_handshake_code_without_payload_is_other() {
        let event = decode_handshake(br#"{"event":"code"}"#).unwrap();
        assert_eq!(event, HandshakeEvent::Other("code".to_string()));
    }

    #[test]
    fn test_decode_handshake_success_and_timeout() {
        assert_eq!(
            decode_handshake(br#"{"event":"success"}"#).unwrap(),
            HandshakeEvent::Success
        );
        assert_eq!(
            decode_handshake(br#"{"event":"timeout"}"#).unwrap(),
            HandshakeEvent::Other("timeout".to_string())
        );
    }

    #[test]
    fn test_decode_audio_message() {
        let json = r#"{
            "type": "message",
            "message": {
                "id": "3EB0C767D26A",
                "sender": "5511999990000@s.whatsapp.net",
                "audio": { "mimetype": "audio/ogg; codecs=opus", "descriptor": { "direct_path": "/v/t62" } },
                "content": { "audioMessage": { "seconds": 4 } }
            }
        }"#;

        let event = decode_event(json.as_bytes()).unwrap();
        let ClientEvent::Message(msg) = event else {
            panic!("expected message event");
        };
        assert_eq!(msg.id, "3EB0C767D26A");
        assert_eq!(msg.sender, "5511999990000@s.whatsapp.net");
        assert_eq!(
            msg.audio.unwrap().mimetype.as_deref(),
            Some("audio/ogg; codecs=opus")
        );
    }

    #[test]
    fn test_decode_disconnected_and_unknown() {
        assert_eq!(
            decode_event(br#"{"type":"disconnected"}"#).unwrap(),
            ClientEvent::Disconnected
        );
        assert_eq!(
            decode_event(br#"{"type":"receipt"}"#).unwrap(),
            ClientEvent::Other("receipt".to_string())
        );
    }

    #[test]
    fn test_command_request_is_tagged() {
        let req = CommandRequest {
            request_id: Uuid::nil(),
            device_id: "dev-1",
            command: Command::IsConnected,
        };

        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"command\":\"is_connected\""));
        assert!(json.contains("\"device_id\":\"dev-1\""));
    }

    fn open_channel() -> (
        mpsc::UnboundedSender<HandshakeEvent>,
        BoxStream<'static, HandshakeEvent>,
    ) {
        let (tx, rx) = mpsc::unbounded();
        (tx, handshake_channel(rx.boxed(), future::pending()))
    }

    #[test]
    fn test_handshake_channel_stays_open_across_codes() {
        let (tx, mut channel) = open_channel();
        tx.unbounded_send(HandshakeEvent::Code("first".to_string())).unwrap();
        tx.unbounded_send(HandshakeEvent::Other("code".to_string())).unwrap();
        tx.unbounded_send(HandshakeEvent::Code("second".to_string())).unwrap();

        assert_eq!(
            block_on(channel.next()),
            Some(HandshakeEvent::Code("first".to_string()))
        );
        assert_eq!(
            block_on(channel.next()),
            Some(HandshakeEvent::Other("code".to_string()))
        );
        assert_eq!(
            block_on(channel.next()),
            Some(HandshakeEvent::Code("second".to_string()))
        );
        assert!(channel.next().now_or_never().is_none(), "still waiting");
    }

    #[test]
    fn test_handshake_channel_closes_after_success() {
        let (tx, channel) = open_channel();
        tx.unbounded_send(HandshakeEvent::Code("abc".to_string())).unwrap();
        tx.unbounded_send(HandshakeEvent::Success).unwrap();
        tx.unbounded_send(HandshakeEvent::Code("late".to_string())).unwrap();

        let events: Vec<_> = block_on(channel.collect());
        assert_eq!(
            events,
            vec![HandshakeEvent::Code("abc".to_string()), HandshakeEvent::Success]
        );
    }

    #[test]
    fn test_handshake_channel_closes_after_timeout() {
        let (tx, channel) = open_channel();
        tx.unbounded_send(HandshakeEvent::Other("timeout".to_string())).unwrap();
        tx.unbounded_send(HandshakeEvent::Success).unwrap();

        let events: Vec<_> = block_on(channel.collect());
        assert_eq!(events, vec![HandshakeEvent::Other("timeout".to_string())]);
    }

    #[test]
    fn test_handshake_channel_closes_when_transport_lost() {
        let (tx, rx) = mpsc::unbounded();
        let (lost_tx, lost_rx) = oneshot::channel::<()>();
        let mut channel = handshake_channel(rx.boxed(), async move {
            let _ = lost_rx.await;
        });

        tx.unbounded_send(HandshakeEvent::Code("abc".to_string())).unwrap();
        assert_eq!(
            block_on(channel.next()),
            Some(HandshakeEvent::Code("abc".to_string()))
        );

        lost_tx.send(()).unwrap();
        assert_eq!(block_on(channel.next()), None);
    }
}
