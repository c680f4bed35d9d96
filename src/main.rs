use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lecture_tracker::api::router;
use lecture_tracker::client::HttpTrackerApi;
use lecture_tracker::config::TrackerConfig;
use lecture_tracker::state::AppState;

/// Local, single-user dashboard in front of the tracker backend.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "lecture_tracker=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = TrackerConfig::new_from_env()?;
    let api = Arc::new(HttpTrackerApi::new(&config)?);
    info!("using backend at {}", config.backend_url);

    let app = router(AppState::new(api));

    info!("listening on http://{}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
