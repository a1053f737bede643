//! tos-gov library interface
//!
//! Proposal lifecycle, member ratings, AI quality assessment and the
//! moderation pipeline, plus the HTTP surface over them.

pub mod api;
pub mod db;
pub mod domain;
pub mod error;
pub mod llm;
pub mod repo;
pub mod services;
pub mod worker;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

use crate::repo::Repos;
use crate::services::{FlagManager, ProposalService, QueuePrioritizer, RatingService};
use crate::worker::TaskQueue;
use tos_common::events::EventBus;
use tos_common::policy::UrgencyWeights;

/// Default listen port
pub const DEFAULT_PORT: u16 = 5731;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub repos: Repos,
    pub proposals: ProposalService,
    pub ratings: RatingService,
    /// Shared with the background worker so flagging stays serialized
    pub flags: FlagManager,
    pub queue: QueuePrioritizer,
    pub event_bus: EventBus,
    pub ai_assessment: bool,
    pub startup_time: DateTime<Utc>,
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(
        repos: Repos,
        flags: FlagManager,
        tasks: TaskQueue,
        event_bus: EventBus,
        urgency: UrgencyWeights,
    ) -> Self {
        Self {
            proposals: ProposalService::new(repos.clone(), tasks.clone(), event_bus.clone()),
            ratings: RatingService::new(repos.clone(), tasks, event_bus.clone()),
            queue: QueuePrioritizer::new(repos.clone(), urgency),
            repos,
            flags,
            event_bus,
            ai_assessment: false,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_ai_assessment(mut self, enabled: bool) -> Self {
        self.ai_assessment = enabled;
        self
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::proposal_routes())
        .merge(api::rating_routes())
        .merge(api::moderation_routes())
        .merge(api::health_routes())
        .route("/events", get(api::event_stream))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
