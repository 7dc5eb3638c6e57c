use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;

/// Environment variable holding the transcription API key
pub const API_KEY_ENV: &str = "GROQ_API_KEY";

/// Prefix for environment overrides, e.g. `VOICENOTE__HTTP__PORT=9090`
pub const ENV_PREFIX: &str = "VOICENOTE";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub http: HttpConfig,
    pub messaging: MessagingConfig,
    pub transcription: TranscriptionConfig,
    pub bot: BotConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
    /// htmx shell served at `/`
    pub index_file: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessagingConfig {
    pub nats_url: String,
    pub subject_prefix: String,
    /// Bridge-side device store location
    pub device_store: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionConfig {
    pub endpoint: String,
    pub model: String,
    #[serde(default)]
    pub api_key: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    pub connect_on_startup: bool,
    /// Deadline for handling one inbound message
    pub message_deadline_secs: u64,
    pub reply: ReplyConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplyConfig {
    pub header: String,
    pub footer: String,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            header: "🎙️ *Transcrição do áudio:*".to_string(),
            footer: "_Powered by Cris AI 🤖_".to_string(),
        }
    }
}

impl Config {
    /// Load from an optional file at `path` (any format `config` detects from
    /// the extension), then `VOICENOTE__*` and `GROQ_API_KEY` overrides.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let settings = Self::defaults()?
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .set_override_option("transcription.api_key", std::env::var(API_KEY_ENV).ok())?
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        cfg.validate()
    }

    /// Load from a single file with defaults, ignoring the environment
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let settings = Self::defaults()?
            .add_source(config::File::from(path))
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        cfg.validate()
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        let reply = ReplyConfig::default();

        Ok(config::Config::builder()
            .set_default("http.bind", "0.0.0.0")?
            .set_default("http.port", 8080)?
            .set_default("http.index_file", "static/index.html")?
            .set_default("messaging.nats_url", "nats://localhost:4222")?
            .set_default("messaging.subject_prefix", "whatsapp")?
            .set_default("messaging.device_store", "file:login-store.db?_foreign_keys=on")?
            .set_default("messaging.request_timeout_secs", 10)?
            .set_default(
                "transcription.endpoint",
                "https://api.groq.com/openai/v1/audio/transcriptions",
            )?
            .set_default("transcription.model", "whisper-large-v3-turbo")?
            .set_default("transcription.api_key", "")?
            .set_default("transcription.timeout_secs", 20)?
            .set_default("bot.connect_on_startup", false)?
            .set_default("bot.message_deadline_secs", 30)?
            .set_default("bot.reply.header", reply.header)?
            .set_default("bot.reply.footer", reply.footer)?)
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.transcription.api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential(API_KEY_ENV));
        }
        if self.bot.message_deadline_secs == 0 {
            return Err(ConfigError::Invalid(
                "bot.message_deadline_secs must be greater than zero".to_string(),
            ));
        }
        Ok(self)
    }
}
