//! tos-gov - Governance microservice
//!
//! Proposals, member ratings, AI quality assessment and moderation.
//! Default port 5731; shares the tos database with tos-bridge.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tos_common::config::{self, TomlConfig, DATABASE_FILE};
use tos_common::events::EventBus;
use tos_common::index::SqliteContentIndex;
use tos_common::TrustPolicy;
use tos_gov::llm::{AnthropicClient, LlmClient};
use tos_gov::repo::Repos;
use tos_gov::services::{FlagManager, QualityAssessor};
use tos_gov::worker::{BackgroundWorker, TaskQueue};
use tos_gov::{AppState, DEFAULT_PORT};

/// Command-line arguments for tos-gov
#[derive(Parser, Debug)]
#[command(name = "tos-gov")]
#[command(about = "Governance microservice: proposals, ratings and moderation")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides [gov] port)
    #[arg(short, long, env = "TOS_GOV_PORT")]
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

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| toml_config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting tos-gov (Governance) microservice");
    info!(
        "Version: {} ({}), built {} [{}]",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = config::resolve_root_folder(args.root_folder.as_deref(), &toml_config);
    let db_path = root_folder.join(DATABASE_FILE);
    info!("Database: {}", db_path.display());

    let db_pool = tos_gov::db::init_database_pool(&db_path)
        .await
        .context("Failed to open database")?;

    let event_bus = EventBus::default();
    let repos = Repos::sqlite(db_pool.clone());
    let flags = FlagManager::new(repos.reviews.clone(), event_bus.clone());

    let llm: Option<Arc<dyn LlmClient>> = match config::resolve_llm_api_key(&toml_config) {
        Some(key) => match AnthropicClient::new(&toml_config.llm, key) {
            Ok(client) => {
                info!("AI quality assessment enabled (model {})", client.model());
                Some(Arc::new(client))
            }
            Err(e) => {
                warn!("AI quality assessment disabled: {}", e);
                None
            }
        },
        None => None,
    };
    let assessor = QualityAssessor::new(llm);

    let (tasks, task_rx) = TaskQueue::channel(toml_config.worker.queue_capacity);
    let state = AppState::new(
        repos.clone(),
        flags.clone(),
        tasks,
        event_bus.clone(),
        toml_config.urgency.clone(),
    )
    .with_ai_assessment(assessor.is_enabled());

    let policy = TrustPolicy::new(toml_config.trust.clone(), toml_config.trust_score.clone());
    let worker = BackgroundWorker::new(repos, assessor, flags, event_bus)
        .with_index(Arc::new(SqliteContentIndex::new(db_pool.clone())), policy)
        .with_settings(db_pool)
        .with_error_sink(state.last_error.clone());
    tokio::spawn(worker.run(task_rx));

    let app = tos_gov::build_router(state);

    let port = args.port.or(toml_config.gov.port).unwrap_or(DEFAULT_PORT);
    let addr: SocketAddr = format!("{}:{}", toml_config.gov.host, port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", toml_config.gov.host, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Ctrl+C handler unavailable: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("SIGTERM handler unavailable: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
