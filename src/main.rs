//! QOP API - Freelance web proposal builder
//!
//! Owners assemble a priced website offer for a local business, share it as a
//! public link or PDF, and follow the prospect's response:
//! - Catalog: packs, options and the context pickers of the form
//! - Pricing: totals, deposit split and delivery planning
//! - Proposals: versioned records with an owner-only edit token
//! - Public page: view, accept or decline with the share token alone
//! - Remote sync: optional mirror through a hosted RPC backend

mod catalog;
mod config;
mod db;
mod document;
mod error;
mod messages;
mod models;
mod pricing;
mod proposal;
mod remote;
mod routes;
mod state;
mod sync;

use crate::config::Settings;
use crate::db::PgProposalStore;
use crate::proposal::{KeyValueStore, ProposalRepository, ProposalService};
use crate::remote::{RemoteBackend, RpcClient};
use crate::routes::create_router;
use crate::state::AppState;
use crate::sync::RemoteSync;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber for structured logging
    init_tracing();

    info!("🚀 Starting QOP - proposal builder API...");

    // Load configuration
    let settings = Settings::load()?;
    info!("📋 Configuration loaded successfully");

    let repo = init_repository(&settings).await?;

    let remote: Option<Arc<dyn RemoteBackend>> = match &settings.remote {
        Some(config) => {
            info!("🔗 Remote sync enabled ({})", config.url);
            let client: Arc<dyn RemoteBackend> = Arc::new(RpcClient::new(config)?);
            Some(client)
        }
        None => {
            warn!("⚠️  REMOTE_RPC_URL not set, proposals stay local-only");
            None
        }
    };
    let sync = Arc::new(RemoteSync::new(remote, settings.sync.debounce));

    let service = ProposalService::new(
        repo,
        sync,
        settings.proposals.public_base_url.clone(),
        settings.proposals.validity_days,
    );
    let state = Arc::new(AppState::new(service));

    // Build the router
    let app = create_router(state, &settings);

    // Create socket address
    let addr = SocketAddr::from((settings.server.host, settings.server.port));

    info!("🌐 Server listening on http://{}", addr);
    info!("🔗 Public links: {}p/<token>", settings.proposals.public_base_url);
    info!("");
    info!("📚 API Endpoints:");
    info!("   ─── Catalog ───");
    info!("   GET    /api/catalog/packs                 - List packs");
    info!("   GET    /api/catalog/options?packId=       - Options for a pack");
    info!("   GET    /api/catalog/problems              - Problems and goals");
    info!("   POST   /api/pricing/quote                 - Price a selection");
    info!("");
    info!("   ─── Owner (Authorization: Bearer <editToken>) ───");
    info!("   POST   /api/proposals                     - Create proposal");
    info!("   POST   /api/proposals/dashboard           - List owned proposals");
    info!("   POST   /api/proposals/refresh-statuses    - Pull remote statuses");
    info!("   GET    /api/proposals/{{token}}             - Get proposal");
    info!("   PATCH  /api/proposals/{{token}}             - Edit proposal");
    info!("   DELETE /api/proposals/{{token}}             - Delete proposal");
    info!("   POST   /api/proposals/{{token}}/share       - Mark as sent");
    info!("   POST   /api/proposals/{{token}}/duplicate   - Duplicate");
    info!("   GET    /api/proposals/{{token}}/messages    - Ready-to-send messages");
    info!("   GET    /api/proposals/{{token}}/pdf         - Download PDF");
    info!("");
    info!("   ─── Prospect ───");
    info!("   GET    /api/public/{{token}}                - View proposal");
    info!("   POST   /api/public/{{token}}/accept         - Accept");
    info!("   POST   /api/public/{{token}}/decline        - Decline");
    info!("   GET    /api/public/{{token}}/pdf            - Download PDF");
    info!("");

    // Create TCP listener and serve
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server shutdown complete");
    Ok(())
}

/// Initialize tracing with structured logging
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,qop_api=debug,tower_http=debug"));

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

/// Postgres when DATABASE_URL is set, otherwise the in-process key-value store
async fn init_repository(settings: &Settings) -> anyhow::Result<Arc<dyn ProposalRepository>> {
    let Some(database) = &settings.database else {
        warn!("⚠️  DATABASE_URL not set, using in-memory storage (data is lost on restart)");
        return Ok(Arc::new(KeyValueStore::new()));
    };

    let pool = db::create_pool(database).await?;
    info!("✅ Database pool created successfully");

    if let Err(e) = db::init_schema(&pool).await {
        warn!("⚠️  Warning creating tables: {}", e);
    }

    Ok(Arc::new(PgProposalStore::new(pool)))
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
