use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use medmentor::{
    create_router, ApiClient, AppState, AuthSession, CaptureConfig, Config, MemoryProfileStore,
};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "medmentor", about = "MedMentor patient session service")]
struct Args {
    /// Path to the configuration file (without extension)
    #[arg(long, default_value = "config/medmentor")]
    config: String,

    /// Override the configured HTTP port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;
    let port = args.port.unwrap_or(cfg.service.http.port);

    info!("MedMentor session service v0.1.0");
    info!("Loaded config: {}", cfg.service.name);
    info!("Backend: {}", cfg.backend.base_url);

    let api = Arc::new(ApiClient::new(
        &cfg.backend.base_url,
        Duration::from_secs(cfg.backend.request_timeout_secs),
    )?);

    let capture = CaptureConfig {
        sample_rate: cfg.audio.sample_rate,
        channels: cfg.audio.channels,
        ..CaptureConfig::default()
    };

    let state = AppState::new(
        api.clone(),
        api.clone(),
        api,
        AuthSession::new(),
        Arc::new(MemoryProfileStore::new()),
        capture,
        Some(PathBuf::from(&cfg.audio.recordings_path)),
    );

    let router = create_router(state);

    let listener =
        tokio::net::TcpListener::bind((cfg.service.http.bind.as_str(), port)).await?;
    info!("Listening on {}:{}", cfg.service.http.bind, port);

    axum::serve(listener, router).await?;

    Ok(())
}
