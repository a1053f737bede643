//! tos-bridge library - content index for the Bridge assistant
//!
//! Keeps community content classified by trust tier and serves ranked
//! search results and prompt-ready context blocks.

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

use tos_common::events::EventBus;
use tos_common::index::ContentIndex;
use tos_common::TrustPolicy;

pub mod api;
pub mod error;
pub mod pagination;
pub mod prompt;

pub use error::{ApiError, ApiResult};

/// Default listen port
pub const DEFAULT_PORT: u16 = 5732;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub index: Arc<dyn ContentIndex>,
    /// Policy applied to every (re)classification
    pub policy: Arc<RwLock<TrustPolicy>>,
    /// Settings store for runtime threshold changes; `None` keeps them in memory only
    pub db: Option<SqlitePool>,
    pub event_bus: EventBus,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(index: Arc<dyn ContentIndex>, policy: TrustPolicy, event_bus: EventBus) -> Self {
        Self {
            index,
            policy: Arc::new(RwLock::new(policy)),
            db: None,
            event_bus,
            startup_time: Utc::now(),
        }
    }

    pub fn with_settings(mut self, db: SqlitePool) -> Self {
        self.db = Some(db);
        self
    }

    /// Snapshot of the policy in effect
    pub async fn current_policy(&self) -> TrustPolicy {
        self.policy.read().await.clone()
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::index_routes())
        .merge(api::search_routes())
        .merge(api::trust_routes())
        .merge(api::health_routes())
        .route("/events", get(api::event_stream))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
