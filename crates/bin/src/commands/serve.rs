//! Serve command - runs the castgate web server.

use std::time::Duration;

use axum::{Router, http::StatusCode, routing::post};
use tokio::signal::unix::{SignalKind, signal};

use castgate::{
    service::{self, AppState, protect_ingest},
    session::SessionConfig,
    user::generate_stream_key,
};

use crate::backend::open_store;
use crate::cli::ServeArgs;

/// Build the session settings from the command line.
fn session_config(args: &ServeArgs) -> Result<SessionConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.session_key {
        Some(encoded) => SessionConfig::new(SessionConfig::key_from_base64(encoded)?),
        None => {
            tracing::warn!(
                "No --session-key configured; generated a random key, \
                 sessions will not survive a restart"
            );
            SessionConfig::generated()
        }
    };
    config.cookie_name = args.cookie_name.clone();
    config.secure = args.cookie_secure;
    config.max_age = args.session_max_age_secs.map(Duration::from_secs);
    Ok(config)
}

/// Handler for POST /api/whip/{username}
///
/// Reached only after the stream-key gate accepted the bearer token. Media
/// negotiation happens in the ingest engine.
async fn handle_whip_authorized() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Wait for SIGTERM or SIGINT.
async fn shutdown_signal() {
    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(term), Ok(int)) => (term, int),
        (Err(e), _) | (_, Err(e)) => {
            tracing::error!("Failed to install signal handlers: {e}");
            return std::future::pending().await;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => tracing::info!("Received SIGTERM, initiating graceful shutdown..."),
        _ = sigint.recv() => tracing::info!("Received SIGINT, initiating graceful shutdown..."),
    }
}

/// Run the castgate server
pub async fn run(args: &ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(&args.backend_config).await?;

    // Seed an empty store with the configured admin account
    if let (Some(username), Some(password)) = (&args.admin_username, &args.admin_password) {
        let stream_key = args
            .admin_stream_key
            .clone()
            .unwrap_or_else(generate_stream_key);
        if store.bootstrap(username, password, &stream_key).await? {
            println!("Seeded admin user '{username}'");
            if args.admin_stream_key.is_none() {
                println!("Admin stream key: {stream_key}");
            }
        } else {
            tracing::info!("Store already has users, skipping admin seeding");
        }
    }

    // Pay for the decoy hash now rather than inside the first failed login
    store.hasher().warm_up().await?;

    let state = AppState::new(store, session_config(args)?)
        .with_request_timeout(Duration::from_secs(args.request_timeout_secs));

    let ingest = Router::new().route("/api/whip/{username}", post(handle_whip_authorized));
    let app = service::router(state.clone()).merge(protect_ingest(ingest, &state));

    // Bind server
    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    println!("castgate listening on http://{local_addr}");
    println!();
    println!("Available endpoints:");
    println!("  POST /auth/login          - Log in (form: username, password)");
    println!("  POST /auth/logout         - Log out (requires session)");
    println!("  GET  /user/info           - Current username (requires session)");
    println!("  GET  /health              - Backend status");
    println!("  POST /api/whip/{{username}} - Ingest authorization (Bearer stream key)");
    println!();
    println!("Press Ctrl+C to shutdown");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Every committed change is already durable, nothing to flush
    println!("Server shut down");
    Ok(())
}
