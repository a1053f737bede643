//! Moderation endpoints
//!
//! GET /api/moderation/queue, GET /api/moderation/reviews/:id and the
//! review, appeal and appeal-review actions.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Actor;
use crate::domain::ModerationReview;
use crate::error::ApiResult;
use crate::services::QueueItem;
use crate::AppState;
use tos_common::models::{ModerationAction, ModerationStatus, ReviewDecision};
use tos_common::Error;

#[derive(Debug, Deserialize)]
pub struct QueueQuery {
    #[serde(default)]
    pub status: Option<ModerationStatus>,
}

#[derive(Debug, Serialize)]
pub struct QueueResponse {
    pub items: Vec<QueueItem>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub decision: ReviewDecision,
    pub action: ModerationAction,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AppealRequest {
    pub appeal_text: String,
}

#[derive(Debug, Deserialize)]
pub struct AppealReviewRequest {
    pub decision: ReviewDecision,
    #[serde(default)]
    pub notes: Option<String>,
}

pub async fn get_queue(
    State(state): State<AppState>,
    Query(query): Query<QueueQuery>,
) -> ApiResult<Json<QueueResponse>> {
    let status = query.status.unwrap_or(ModerationStatus::Pending);
    let items = state.queue.get_queue(status).await?;
    Ok(Json(QueueResponse {
        total: items.len(),
        items,
    }))
}

pub async fn get_review(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ModerationReview>> {
    Ok(Json(state.flags.get_review(id).await?))
}

pub async fn review_proposal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    moderator: Actor,
    Json(request): Json<ReviewRequest>,
) -> ApiResult<Json<ModerationReview>> {
    let review = state
        .flags
        .review_proposal(id, moderator.id(), request.decision, request.action, request.notes)
        .await?;
    Ok(Json(review))
}

/// Only the proposal's author may appeal
pub async fn submit_appeal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: Actor,
    Json(request): Json<AppealRequest>,
) -> ApiResult<Json<ModerationReview>> {
    let review = state.flags.get_review(id).await?;
    let proposal = state.proposals.get(review.proposal_id).await?;
    if proposal.author_id != actor.id() {
        return Err(Error::Forbidden("Only the proposal author may appeal".into()).into());
    }
    Ok(Json(state.flags.submit_appeal(id, request.appeal_text).await?))
}

pub async fn review_appeal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    moderator: Actor,
    Json(request): Json<AppealReviewRequest>,
) -> ApiResult<Json<ModerationReview>> {
    let review = state
        .flags
        .review_appeal(id, moderator.id(), request.decision, request.notes)
        .await?;
    Ok(Json(review))
}

pub fn moderation_routes() -> Router<AppState> {
    Router::new()
        .route("/api/moderation/queue", get(get_queue))
        .route("/api/moderation/reviews/:id", get(get_review))
        .route("/api/moderation/reviews/:id/review", post(review_proposal))
        .route("/api/moderation/reviews/:id/appeal", post(submit_appeal))
        .route("/api/moderation/reviews/:id/appeal/review", post(review_appeal))
}
