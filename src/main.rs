use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use face_detect_web::{app, config::Settings, detection::load_detector};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::from_env();
    let detector = load_detector(settings.detector, settings.model_path())
        .context("face detector could not be loaded")?;
    let state = app::AppState::new(settings.upload_dir.clone(), detector);
    let router = app::router(state);

    let tcp_listener = tokio::net::TcpListener::bind(&settings.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_address))?;
    tracing::info!(
        upload_dir = %settings.upload_dir.display(),
        detector = %settings.detector,
        "face detection server started at http://{}",
        settings.bind_address
    );

    axum::serve(tcp_listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
