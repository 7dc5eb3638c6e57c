use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use voicenote_relay::{
    create_router, AppState, Config, ConnectionCoordinator, EventDispatcher, GroqTranscriber,
    NatsBridge, StatusStore,
};

/// Transcribes incoming voice notes and replies with the text
#[derive(Debug, Parser)]
#[command(name = "voicenote-relay", version)]
struct Args {
    /// Configuration file (extension optional)
    #[arg(short, long, default_value = "config/voicenote-relay")]
    config: String,

    /// Override the HTTP bind address
    #[arg(long)]
    bind: Option<String>,

    /// Override the HTTP port
    #[arg(short, long)]
    port: Option<u16>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Start connecting as soon as the server is up
    #[arg(long)]
    connect: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .init();

    let cfg = Config::load(&args.config).context("Failed to load configuration")?;

    info!("Voice Note Relay v{}", env!("CARGO_PKG_VERSION"));
    info!("Transcription model: {}", cfg.transcription.model);

    let status = StatusStore::new();
    let transcriber = Arc::new(GroqTranscriber::new(&cfg.transcription)?);
    let dispatcher = EventDispatcher::new(
        status.clone(),
        transcriber,
        cfg.bot.reply.clone(),
        Duration::from_secs(cfg.bot.message_deadline_secs),
    );
    let bridge = Arc::new(NatsBridge::connect(&cfg.messaging).await?);
    let coordinator = ConnectionCoordinator::new(status, bridge, dispatcher);

    if cfg.bot.connect_on_startup || args.connect {
        coordinator.spawn_connect();
    }

    let app = create_router(AppState::new(coordinator.clone(), &cfg.http.index_file));

    let bind = args.bind.unwrap_or(cfg.http.bind);
    let port = args.port.unwrap_or(cfg.http.port);
    let addr = format!("{}:{}", bind, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Starting web server on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Shutting down...");
    coordinator.disconnect().await;

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
