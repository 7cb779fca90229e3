use std::time::Duration;

use axum::Router;
use murmur_common::Result;
use tracing::{error, info};

use crate::router::build_router;
use crate::state::SharedState;

const CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);

/// Bind and serve the gateway until shutdown, running the image retention
/// task alongside.
pub async fn run(state: SharedState, twilio_routes: Option<Router>) -> Result<()> {
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let images_dir = state.config.images_dir.clone();
    let retention = Duration::from_secs(state.config.image_retention_hours * 3600);

    std::fs::create_dir_all(&images_dir)?;

    let app = build_router(state, twilio_routes);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("gateway listening on {addr}");

    let cleanup_task = tokio::spawn(cleanup_loop(images_dir, retention));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The retention task holds no state worth draining; stop it cleanly.
    cleanup_task.abort();
    info!("gateway stopped");
    Ok(())
}

/// Periodic generated-image retention sweep. One failed iteration is logged
/// and does not cancel future iterations.
async fn cleanup_loop(images_dir: std::path::PathBuf, retention: Duration) {
    let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
    loop {
        interval.tick().await;
        let dir = images_dir.clone();
        let result =
            tokio::task::spawn_blocking(move || murmur_media::cleanup_old_images(&dir, retention))
                .await;
        match result {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => error!("image cleanup task error: {e}"),
            Err(e) => error!("image cleanup task panicked: {e}"),
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {e}");
    }
}
