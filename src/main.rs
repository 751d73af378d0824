use std::time::Duration;

use axum::{Router, http::HeaderValue};
use dotenv::dotenv;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::FmtSubscriber;

use crate::{common::app_state::AppState, config::config::CONFIG};

mod common;
mod config;
mod game;
mod health;
mod question;
mod room;
mod round;
mod tests;
mod ws;

/// How long in-flight connections get to drain on shutdown.
const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    // Initialize .env
    dotenv().ok();

    // Initialize logging
    let level = match CONFIG.server.mode.as_str() {
        "production" => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set global tracing");

    // Initialize state
    let state = AppState::from_connection_string(&CONFIG.database_url())
        .await
        .unwrap_or_else(|e| panic!("{}", e));

    // Run migrations
    if let Err(e) = sqlx::migrate!().run(state.get_pool()).await {
        error!("Failed to run migrations: {}", e);
        std::process::exit(1);
    }

    // Spawn the idle-room reaper
    state.spawn_room_cleanup();

    let app = Router::new()
        .nest("/api", room::handlers::room_routes(state.clone()))
        .nest("/health", health::handlers::health_routes(state.clone()))
        .merge(ws::handlers::ws_routes(state.clone()))
        .layer(cors_layer());

    // Initialize webserver
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", CONFIG.server.port))
        .await
        .unwrap_or_else(|e| {
            error!("Failed to bind port {}: {}", CONFIG.server.port, e);
            std::process::exit(1);
        });

    info!(
        "Server listening on address: {}",
        listener.local_addr().unwrap()
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutting down server...");
        let _ = shutdown_tx.send(true);
    });

    let drain_rx = shutdown_rx.clone();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        let mut rx = shutdown_rx;
        let _ = rx.changed().await;
    });

    // Long-lived connections must not hold the process open past the drain
    // deadline.
    tokio::select! {
        result = server => {
            if let Err(e) = result {
                error!("Server error: {}", e);
                std::process::exit(1);
            }
        }
        _ = async move {
            let mut rx = drain_rx;
            let _ = rx.changed().await;
            tokio::time::sleep(SHUTDOWN_DEADLINE).await;
        } => {
            warn!("Drain deadline reached, forcing shutdown");
        }
    }

    info!("Server exited");
}

fn cors_layer() -> CorsLayer {
    match &CONFIG.server.allowed_origin {
        Some(origin) => CorsLayer::new()
            .allow_methods(Any)
            .allow_headers(Any)
            .allow_origin(origin.parse::<HeaderValue>().expect("Invalid ALLOWED_ORIGIN")),
        None => CorsLayer::permissive(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
