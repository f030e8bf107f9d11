use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mystery_room::{auth, broadcast, build_router, config::GameConfig, state::AppState};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mystery_room=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting mystery room...");

    let config = GameConfig::from_env();
    let admin = Arc::new(auth::AdminAuth::from_env());
    let addr = config.bind_addr;

    let state = match AppState::from_config(config).await {
        Ok(state) => Arc::new(state),
        Err(e) => {
            tracing::error!("Failed to initialise game state: {}", e);
            std::process::exit(1);
        }
    };

    // Forward store changes to connected sessions as leaderboard updates
    broadcast::spawn_leaderboard_broadcaster(state.clone());

    let app = build_router(state, admin);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    tracing::info!("Listening on http://{}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
