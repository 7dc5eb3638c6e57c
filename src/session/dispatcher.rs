use super::status::StatusStore;
use crate::config::ReplyConfig;
use crate::messaging::{ClientEvent, InboundMessage, MediaRef, MessagingClient};
use crate::transcription::TranscriptionService;
use futures::stream::{BoxStream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Default deadline for handling one voice note end to end
pub const DEFAULT_MESSAGE_DEADLINE: Duration = Duration::from_secs(30);

/// Reacts to the messaging client's runtime events.
///
/// Each voice note is handled by its own task with its own deadline; tasks
/// share nothing mutable, so a slow or failing message never affects another
/// one or the connection state.
#[derive(Clone)]
pub struct EventDispatcher {
    status: StatusStore,
    transcriber: Arc<dyn TranscriptionService>,
    reply: Arc<ReplyConfig>,
    deadline: Duration,
}

impl EventDispatcher {
    pub fn new(
        status: StatusStore,
        transcriber: Arc<dyn TranscriptionService>,
        reply: ReplyConfig,
        deadline: Duration,
    ) -> Self {
        Self {
            status,
            transcriber,
            reply: Arc::new(reply),
            deadline,
        }
    }

    /// Consume a client's event feed until it ends
    pub fn spawn_feed(
        &self,
        client: Arc<dyn MessagingClient>,
        mut events: BoxStream<'static, ClientEvent>,
    ) -> JoinHandle<()> {
        let dispatcher = self.clone();

        tokio::spawn(async move {
            info!("Event feed started for {}", client.name());

            while let Some(event) = events.next().await {
                dispatcher.dispatch(&client, event);
            }

            info!("Event feed ended for {}", client.name());
        })
    }

    /// Classify one event. Returns the handle of the spawned handling task,
    /// if the event needed one.
    pub fn dispatch(
        &self,
        client: &Arc<dyn MessagingClient>,
        event: ClientEvent,
    ) -> Option<JoinHandle<()>> {
        match event {
            ClientEvent::Disconnected => {
                info!("Client reported disconnect");
                self.status.set_disconnected();
                None
            }
            ClientEvent::Message(message) => {
                let audio = message.audio.clone()?;
                Some(self.spawn_voice_note(Arc::clone(client), message, audio))
            }
            ClientEvent::Other(kind) => {
                debug!("Ignoring client event: {}", kind);
                None
            }
        }
    }

    fn spawn_voice_note(
        &self,
        client: Arc<dyn MessagingClient>,
        message: InboundMessage,
        audio: MediaRef,
    ) -> JoinHandle<()> {
        let transcriber = Arc::clone(&self.transcriber);
        let reply = Arc::clone(&self.reply);
        let deadline = self.deadline;

        tokio::spawn(async move {
            let handling = handle_voice_note(
                client.as_ref(),
                transcriber.as_ref(),
                &reply,
                &message,
                &audio,
            );

            if tokio::time::timeout(deadline, handling).await.is_err() {
                warn!(
                    "Abandoned voice note {} from {} after {:?}",
                    message.id, message.sender, deadline
                );
            }
        })
    }
}

async fn handle_voice_note(
    client: &dyn MessagingClient,
    transcriber: &dyn TranscriptionService,
    reply: &ReplyConfig,
    message: &InboundMessage,
    audio: &MediaRef,
) {
    info!("🎙️ Received voice note from {}", message.sender);

    let bytes = match client.download(audio).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("Error downloading audio: {:#}", e);
            return;
        }
    };

    let transcript = match transcriber.transcribe(bytes).await {
        Ok(text) => text,
        Err(e) => {
            error!("❌ Transcription error: {}", e);
            return;
        }
    };

    let text = compose_reply(reply, &transcript);
    if let Err(e) = client.send(&message.sender, &text, &message.quoted()).await {
        error!("Error sending reply to {}: {:#}", message.sender, e);
        return;
    }

    info!("Replied to {} ({})", message.sender, message.id);
}

/// Reply text embedding the transcript between the configured header and footer
pub fn compose_reply(reply: &ReplyConfig, transcript: &str) -> String {
    let mut text = format!("{}\n\n\"{}\"", reply.header, transcript);
    if !reply.footer.is_empty() {
        text.push_str("\n\n");
        text.push_str(&reply.footer);
    }
    text
}
