//! Index maintenance endpoints
//!
//! POST /api/index, PUT /api/index/:type/:id/engagement,
//! DELETE /api/index/:type/:id

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, post, put},
    Json, Router,
};
use tracing::{debug, info};

use super::parse_content_type;
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use tos_common::events::TosEvent;
use tos_common::index::{IndexContentInput, IndexedContent};
use tos_common::{time, ContentEngagement, Error};

fn emit_indexed(state: &AppState, item: &IndexedContent) {
    state.event_bus.emit_lossy(TosEvent::ContentIndexed {
        content_type: item.content_type,
        content_id: item.content_id.clone(),
        trust_tier: item.trust_tier,
        timestamp: item.indexed_at,
    });
}

/// POST /api/index - insert or replace one item
pub async fn index_content(
    State(state): State<AppState>,
    Json(input): Json<IndexContentInput>,
) -> ApiResult<Json<IndexedContent>> {
    let policy = state.current_policy().await;
    let item = state.index.index_content(input, &policy).await?;

    info!(
        content_type = %item.content_type,
        content_id = %item.content_id,
        tier = %item.trust_tier,
        "Indexed content"
    );
    emit_indexed(&state, &item);
    Ok(Json(item))
}

/// PUT /api/index/:type/:id/engagement
pub async fn update_engagement(
    State(state): State<AppState>,
    Path((content_type, content_id)): Path<(String, String)>,
    Json(engagement): Json<ContentEngagement>,
) -> ApiResult<Json<IndexedContent>> {
    let content_type = parse_content_type(&content_type)?;
    let policy = state.current_policy().await;
    let item = state
        .index
        .update_engagement(content_type, &content_id, engagement, &policy)
        .await?;

    debug!(%content_type, %content_id, tier = %item.trust_tier, "Engagement refreshed");
    emit_indexed(&state, &item);
    Ok(Json(item))
}

/// DELETE /api/index/:type/:id - 204, or 404 when nothing was indexed
pub async fn remove_content(
    State(state): State<AppState>,
    Path((content_type, content_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let content_type = parse_content_type(&content_type)?;
    if !state.index.remove_from_index(content_type, &content_id).await? {
        return Err(ApiError::from(Error::NotFound(format!(
            "Indexed {} {}",
            content_type, content_id
        ))));
    }

    info!(%content_type, %content_id, "Removed from index");
    state.event_bus.emit_lossy(TosEvent::ContentRemoved {
        content_type,
        content_id,
        timestamp: time::now(),
    });
    Ok(StatusCode::NO_CONTENT)
}

pub fn index_routes() -> Router<AppState> {
    Router::new()
        .route("/api/index", post(index_content))
        .route("/api/index/:content_type/:content_id/engagement", put(update_engagement))
        .route("/api/index/:content_type/:content_id", delete(remove_content))
}
