use subforge_api::{build_router, state::AppState};
use subforge_config::Settings;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file (silently ignore if missing)
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "subforge_api=debug,subforge_transcription=debug,tower_http=debug".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load config
    let settings = Settings::load()?;
    info!("Starting Subforge API on {}:{}", settings.app.host, settings.app.port);
    info!(
        backend = %settings.transcription.backend,
        default_model = %settings.transcription.default_model,
        diarization = %settings.diarization.endpoint,
        ollama = %settings.translation.ollama_url,
        "Pipeline config"
    );

    let app_state = AppState::new(settings.clone())?;
    if !app_state.converter.is_available() {
        warn!("ffmpeg not found; transcription requests will fail until it is installed");
    }

    let app = build_router(app_state.clone());

    // Start server
    let addr = format!("{}:{}", settings.app.host, settings.app.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    app_state.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(%e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
