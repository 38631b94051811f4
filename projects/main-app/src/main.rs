mod app_state;
mod camera;
mod capture;
mod config;
mod core;
mod predict;
mod sampler;
mod web;

use std::sync::Arc;

use anyhow::Context;
use app_state::AppState;
use camera::{ffmpeg_backend::FfmpegBackend, live_view::LiveView};
use config::AppConfig;
use crate::core::state::DisplayBoard;
use predict::client::HttpPredictionClient;
use sampler::{FrameSampler, SamplerSettings};
use tracing::info;
use tracing_appender::rolling;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tokio::fs::create_dir_all("logs").await?;
    let file_appender = rolling::daily("logs", "emocam.log");
    let (non_blocking, _log_guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = AppConfig::from_env()?;
    info!(
        "{} starting: device={} predict_url={}",
        config.app_name, config.camera_device, config.predict_url
    );

    let display = Arc::new(DisplayBoard::new());
    let (live_view, feed) = LiveView::pending();

    let client = HttpPredictionClient::new(config.predict_url.clone(), config.predict_timeout)?;
    match config.predict_timeout {
        Some(timeout) => info!("posting frames to {} (timeout {timeout:?})", client.url()),
        None => info!("posting frames to {} (no timeout)", client.url()),
    }

    let sampler = FrameSampler::new(
        live_view.clone(),
        client,
        display.clone(),
        SamplerSettings::from_config(&config),
    );
    let busy = sampler.busy_flag();
    tokio::spawn(sampler.run());

    let state = Arc::new(AppState::new(
        config.clone(),
        display.clone(),
        live_view.clone(),
        busy,
    ));
    let app = web::routes::build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!("{} dashboard on http://{}", config.app_name, config.bind_addr);

    let backend = FfmpegBackend::new(
        config.camera_device.clone(),
        config.camera_input_format.clone(),
    );
    tokio::spawn(async move {
        camera::start_camera(&backend, &display, feed).await;
        info!("camera {} is {:?}", backend.device(), live_view.camera_state());
    });

    axum::serve(listener, app).await?;

    Ok(())
}
