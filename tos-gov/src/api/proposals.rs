//! Proposal endpoints
//!
//! POST/GET /api/proposals, GET/PATCH/DELETE /api/proposals/:id,
//! GET /api/proposals/:id/ai-rating, POST /api/proposals/:id/flag

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use super::Actor;
use crate::domain::{AiRating, ModerationReview, NewProposal, Proposal, ProposalChanges};
use crate::error::ApiResult;
use crate::repo::ProposalFilter;
use crate::services::ProposalPage;
use crate::AppState;
use tos_common::models::{FlagReason, ScopeType};
use tos_common::Error;

/// POST /api/proposals request; the author is the caller
#[derive(Debug, Deserialize)]
pub struct CreateProposalRequest {
    pub scope_type: ScopeType,
    /// Defaults to the caller for individual proposals
    pub scope_id: Option<Uuid>,
    pub title: String,
    pub summary: String,
}

pub async fn create_proposal(
    State(state): State<AppState>,
    actor: Actor,
    Json(request): Json<CreateProposalRequest>,
) -> ApiResult<(StatusCode, Json<Proposal>)> {
    let scope_id = match (request.scope_type, request.scope_id) {
        (_, Some(id)) => id,
        (ScopeType::Individual, None) => actor.id(),
        (ScopeType::Group, None) => {
            return Err(Error::Validation("scope_id is required for group proposals".into()).into())
        }
    };

    let proposal = state
        .proposals
        .create(NewProposal {
            scope_type: request.scope_type,
            scope_id,
            author_id: actor.id(),
            title: request.title,
            summary: request.summary,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(proposal)))
}

pub async fn list_proposals(
    State(state): State<AppState>,
    Query(filter): Query<ProposalFilter>,
) -> ApiResult<Json<ProposalPage>> {
    Ok(Json(state.proposals.list(&filter).await?))
}

pub async fn get_proposal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Proposal>> {
    Ok(Json(state.proposals.get(id).await?))
}

pub async fn update_proposal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: Actor,
    Json(changes): Json<ProposalChanges>,
) -> ApiResult<Json<Proposal>> {
    Ok(Json(state.proposals.update(id, actor.id(), changes).await?))
}

pub async fn delete_proposal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: Actor,
) -> ApiResult<StatusCode> {
    state.proposals.delete(id, actor.id()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// AI assessment, once the background assessor has stored one
pub async fn get_ai_rating(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<AiRating>> {
    state.proposals.get(id).await?;
    let rating = state
        .repos
        .ai_ratings
        .find_by_proposal(id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("AI rating for proposal {}", id)))?;
    Ok(Json(rating))
}

/// Member report; returns the proposal's review, new or existing
pub async fn flag_proposal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: Actor,
) -> ApiResult<Json<ModerationReview>> {
    state.proposals.get(id).await?;
    tracing::info!(proposal_id = %id, reporter = %actor.id(), "Manual report received");
    let review = state.flags.flag_proposal(id, FlagReason::ManualReport).await?;
    Ok(Json(review))
}

pub fn proposal_routes() -> Router<AppState> {
    Router::new()
        .route("/api/proposals", post(create_proposal).get(list_proposals))
        .route(
            "/api/proposals/:id",
            get(get_proposal).patch(update_proposal).delete(delete_proposal),
        )
        .route("/api/proposals/:id/ai-rating", get(get_ai_rating))
        .route("/api/proposals/:id/flag", post(flag_proposal))
}
