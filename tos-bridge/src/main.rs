//! tos-bridge - Content index and trust context for the Bridge assistant
//!
//! Default port 5732; shares the tos database with tos-gov.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};

use tos_bridge::{build_router, AppState, DEFAULT_PORT};
use tos_common::config::{self, TomlConfig, DATABASE_FILE};
use tos_common::db::{init_database_pool, settings::resolve_trust_thresholds};
use tos_common::events::EventBus;
use tos_common::index::SqliteContentIndex;
use tos_common::TrustPolicy;

#[derive(Parser, Debug)]
#[command(name = "tos-bridge")]
#[command(about = "Trust-classified content index for the Bridge assistant")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides [bridge] port)
    #[arg(short, long, env = "TOS_BRIDGE_PORT")]
    port: Option<u16>,

    /// Root folder holding the database
    #[arg(short, long, env = "TOS_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Bootstrap TOML file
    #[arg(short, long, env = "TOS_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = config::resolve_config_path(args.config.as_deref());
    let toml_config = TomlConfig::load(&config_path).context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| toml_config.logging.level.clone().into()),
        )
        .init();

    // Build identification first, before any database delay
    info!(
        "Starting tos-bridge v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = config::resolve_root_folder(args.root_folder.as_deref(), &toml_config);
    let db_path = root_folder.join(DATABASE_FILE);
    info!("Database path: {}", db_path.display());

    let pool = init_database_pool(&db_path)
        .await
        .context("Failed to open database")?;

    let thresholds = resolve_trust_thresholds(&pool, &toml_config.trust)
        .await
        .context("Failed to read trust thresholds")?;
    let policy = TrustPolicy::new(thresholds, toml_config.trust_score.clone());

    let index = Arc::new(SqliteContentIndex::new(pool.clone()));
    let state = AppState::new(index, policy, EventBus::default()).with_settings(pool);
    let app = build_router(state);

    let port = args.port.or(toml_config.bridge.port).unwrap_or(DEFAULT_PORT);
    let addr: SocketAddr = format!("{}:{}", toml_config.bridge.host, port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", toml_config.bridge.host, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("tos-bridge listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            warn!("Ctrl+C handler unavailable: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
