//! API gateway binary
//!
//! Loads configuration, builds the gate, and serves until shutdown.

use api_gateway::config::Settings;
use api_gateway::routes::create_router;
use api_gateway::state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber for structured logging
    init_tracing();

    info!("🚀 Starting API gateway...");

    let settings = Settings::load()?;
    info!("📋 Configuration loaded successfully");

    let state = Arc::new(AppState::from_settings(&settings)?);
    info!(
        rules = state.gate.index().rules().len(),
        "🔐 Route authorization index built"
    );
    if state.gate.index().rules().is_empty() {
        warn!("⚠️  No route rules configured: every gated path will be rejected");
    }

    let app = create_router(state.clone());

    let addr = SocketAddr::from((settings.server.host, settings.server.port));

    info!("🌐 Gateway listening on http://{}", addr);
    info!("");
    info!("📚 Routes:");
    info!("   ─── Gated ───");
    info!("   /users/find    → {}", state.upstreams.manage_user);
    info!("   /manage/**     → {}", state.upstreams.event_management);
    info!("   /user/**       → {}", state.upstreams.event_management);
    info!("   ─── Open ───");
    info!("   /users/login   → {}", state.upstreams.manage_user);
    info!("   /users/enroll  → {}", state.upstreams.manage_user);
    info!("   /health");
    info!("");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Gateway shutdown complete");
    Ok(())
}

/// Initialize tracing with structured logging
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,api_gateway=debug,tower_http=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("📴 Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("📴 Received terminate signal, initiating graceful shutdown...");
        },
    }
}
