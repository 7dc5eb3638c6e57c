//! Audio transcription collaborator
//!
//! `TranscriptionService` is the seam the dispatcher uses; `GroqTranscriber`
//! talks to any OpenAI-compatible `/audio/transcriptions` endpoint.

use crate::config::TranscriptionConfig;
use crate::error::TranscriptionError;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Speech-to-text service: audio bytes in, text out
#[async_trait::async_trait]
pub trait TranscriptionService: Send + Sync {
    async fn transcribe(&self, audio: Vec<u8>) -> Result<String, TranscriptionError>;
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// HTTP client for the Groq (OpenAI-compatible) transcription API
pub struct GroqTranscriber {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GroqTranscriber {
    pub fn new(config: &TranscriptionConfig) -> Result<Self, TranscriptionError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait::async_trait]
impl TranscriptionService for GroqTranscriber {
    async fn transcribe(&self, audio: Vec<u8>) -> Result<String, TranscriptionError> {
        if audio.is_empty() {
            return Err(TranscriptionError::EmptyAudio);
        }

        debug!(
            "Sending {} bytes to {} (model: {})",
            audio.len(),
            self.endpoint,
            self.model
        );

        let form = Form::new()
            .part("file", Part::bytes(audio).file_name("audio.ogg"))
            .text("model", self.model.clone());

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(TranscriptionError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TranscriptionResponse = response.json().await?;
        debug!("Transcription completed ({} chars)", parsed.text.len());

        Ok(parsed.text.trim().to_string())
    }
}
