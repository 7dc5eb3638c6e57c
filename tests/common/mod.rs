// In-memory fakes of the messaging and transcription collaborators
//
// Handshake and client events are fed through unbounded channels so tests
// decide exactly when each event arrives.

#![allow(dead_code)]

use anyhow::{bail, Result};
use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use voicenote_relay::config::ReplyConfig;
use voicenote_relay::session::DEFAULT_MESSAGE_DEADLINE;
use voicenote_relay::{
    ClientEvent, ConnectionCoordinator, EventDispatcher, HandshakeEvent, InboundMessage,
    MediaRef, MessagingClient, QuotedRef, SessionStore, StatusStore, TranscriptionError,
    TranscriptionService,
};

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub recipient: String,
    pub text: String,
    pub quoted: QuotedRef,
}

pub struct FakeClient {
    has_session: bool,
    handshake_rx: Mutex<Option<UnboundedReceiver<HandshakeEvent>>>,
    events_rx: Mutex<Option<UnboundedReceiver<ClientEvent>>>,
    connected: AtomicBool,
    pub fail_connect: AtomicBool,
    pub fail_download: AtomicBool,
    pub fail_send: AtomicBool,
    pub audio: Vec<u8>,
    pub calls: Mutex<Vec<&'static str>>,
    pub sent: Mutex<Vec<SentMessage>>,
}

pub struct FakeFeeds {
    pub handshake: UnboundedSender<HandshakeEvent>,
    pub events: UnboundedSender<ClientEvent>,
}

impl FakeClient {
    pub fn new(has_session: bool) -> (Arc<Self>, FakeFeeds) {
        let (handshake_tx, handshake_rx) = unbounded();
        let (events_tx, events_rx) = unbounded();

        let client = Arc::new(Self {
            has_session,
            handshake_rx: Mutex::new(Some(handshake_rx)),
            events_rx: Mutex::new(Some(events_rx)),
            connected: AtomicBool::new(false),
            fail_connect: AtomicBool::new(false),
            fail_download: AtomicBool::new(false),
            fail_send: AtomicBool::new(false),
            audio: b"OggS-fake-voice-note".to_vec(),
            calls: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
        });

        (
            client,
            FakeFeeds {
                handshake: handshake_tx,
                events: events_tx,
            },
        )
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| **c == call).count()
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl MessagingClient for FakeClient {
    fn has_session(&self) -> bool {
        self.has_session
    }

    async fn subscribe(&self) -> Result<BoxStream<'static, ClientEvent>> {
        self.record("subscribe");
        Ok(match self.events_rx.lock().unwrap().take() {
            Some(rx) => rx.boxed(),
            None => stream::pending().boxed(),
        })
    }

    async fn open_handshake_channel(&self) -> Result<BoxStream<'static, HandshakeEvent>> {
        self.record("open_handshake_channel");
        Ok(match self.handshake_rx.lock().unwrap().take() {
            Some(rx) => rx.boxed(),
            None => stream::pending().boxed(),
        })
    }

    async fn connect(&self) -> Result<()> {
        self.record("connect");
        if self.fail_connect.load(Ordering::SeqCst) {
            bail!("connection refused");
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.record("disconnect");
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.record("is_connected");
        self.connected.load(Ordering::SeqCst)
    }

    async fn download(&self, _media: &MediaRef) -> Result<Vec<u8>> {
        self.record("download");
        if self.fail_download.load(Ordering::SeqCst) {
            bail!("media expired");
        }
        Ok(self.audio.clone())
    }

    async fn send(&self, recipient: &str, text: &str, quoted: &QuotedRef) -> Result<()> {
        self.record("send");
        if self.fail_send.load(Ordering::SeqCst) {
            bail!("not connected");
        }
        self.sent.lock().unwrap().push(SentMessage {
            recipient: recipient.to_string(),
            text: text.to_string(),
            quoted: quoted.clone(),
        });
        Ok(())
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Hands out the queued clients in order, then keeps reusing the last one
pub struct FakeSessionStore {
    clients: Mutex<Vec<Arc<FakeClient>>>,
    pub opened: AtomicUsize,
    pub fail: AtomicBool,
}

impl FakeSessionStore {
    pub fn new(client: Arc<FakeClient>) -> Arc<Self> {
        Self::with_clients(vec![client])
    }

    pub fn with_clients(clients: Vec<Arc<FakeClient>>) -> Arc<Self> {
        Arc::new(Self {
            clients: Mutex::new(clients),
            opened: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        })
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SessionStore for FakeSessionStore {
    async fn open_client(&self) -> Result<Arc<dyn MessagingClient>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            bail!("database is locked");
        }
        let mut clients = self.clients.lock().unwrap();
        let next = if clients.len() > 1 {
            clients.remove(0)
        } else {
            clients[0].clone()
        };
        let client: Arc<dyn MessagingClient> = next;
        Ok(client)
    }
}

pub struct FakeTranscriber {
    /// `None` makes every call fail
    text: Option<String>,
    delay: Option<Duration>,
    pub calls: AtomicUsize,
    pub received: Mutex<Vec<Vec<u8>>>,
}

impl FakeTranscriber {
    pub fn returning(text: &str) -> Arc<Self> {
        Self::build(Some(text.to_string()), None)
    }

    pub fn failing() -> Arc<Self> {
        Self::build(None, None)
    }

    pub fn slow(text: &str, delay: Duration) -> Arc<Self> {
        Self::build(Some(text.to_string()), Some(delay))
    }

    fn build(text: Option<String>, delay: Option<Duration>) -> Arc<Self> {
        Arc::new(Self {
            text,
            delay,
            calls: AtomicUsize::new(0),
            received: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl TranscriptionService for FakeTranscriber {
    async fn transcribe(&self, audio: Vec<u8>) -> Result<String, TranscriptionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.received.lock().unwrap().push(audio);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.text {
            Some(text) => Ok(text.clone()),
            None => Err(TranscriptionError::Api {
                status: 500,
                body: "model overloaded".to_string(),
            }),
        }
    }
}

pub fn dispatcher(status: &StatusStore, transcriber: Arc<FakeTranscriber>) -> EventDispatcher {
    EventDispatcher::new(
        status.clone(),
        transcriber,
        ReplyConfig::default(),
        DEFAULT_MESSAGE_DEADLINE,
    )
}

pub struct Harness {
    pub status: StatusStore,
    pub client: Arc<FakeClient>,
    pub feeds: FakeFeeds,
    pub sessions: Arc<FakeSessionStore>,
    pub transcriber: Arc<FakeTranscriber>,
    pub coordinator: ConnectionCoordinator,
}

impl Harness {
    pub fn new(has_session: bool) -> Self {
        Self::with_transcriber(has_session, FakeTranscriber::returning("hello"))
    }

    pub fn with_transcriber(has_session: bool, transcriber: Arc<FakeTranscriber>) -> Self {
        let status = StatusStore::new();
        let (client, feeds) = FakeClient::new(has_session);
        let sessions = FakeSessionStore::new(client.clone());
        let coordinator = ConnectionCoordinator::new(
            status.clone(),
            sessions.clone(),
            dispatcher(&status, transcriber.clone()),
        );

        Self {
            status,
            client,
            feeds,
            sessions,
            transcriber,
            coordinator,
        }
    }
}

pub fn voice_note(id: &str, sender: &str) -> InboundMessage {
    InboundMessage {
        id: id.to_string(),
        sender: sender.to_string(),
        audio: Some(MediaRef {
            mimetype: Some("audio/ogg; codecs=opus".to_string()),
            descriptor: serde_json::json!({ "direct_path": "/v/t62.7117-24/abc" }),
        }),
        content: serde_json::json!({ "audioMessage": { "seconds": 3, "ptt": true } }),
    }
}

pub fn text_message(id: &str, sender: &str, text: &str) -> InboundMessage {
    InboundMessage {
        id: id.to_string(),
        sender: sender.to_string(),
        audio: None,
        content: serde_json::json!({ "conversation": text }),
    }
}

/// Poll `cond` until it holds, failing the test after two seconds
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached within 2s");
}
