//! Rating endpoints
//!
//! PUT/GET /api/proposals/:id/ratings, POST /api/proposals/ratings/batch

use axum::{
    extract::{Path, State},
    routing::{post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::Actor;
use crate::domain::{Rating, RatingAggregate, RatingInput};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Upper bound on ids in one batch request
pub const MAX_BATCH: usize = 100;

#[derive(Debug, Serialize)]
pub struct RatingsResponse {
    pub aggregate: RatingAggregate,
    /// The caller's own rating, when the caller identified themselves
    #[serde(skip_serializing_if = "Option::is_none")]
    pub my_rating: Option<Rating>,
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub proposal_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub aggregates: HashMap<Uuid, RatingAggregate>,
}

pub async fn submit_rating(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: Actor,
    Json(input): Json<RatingInput>,
) -> ApiResult<Json<Rating>> {
    Ok(Json(state.ratings.submit_rating(id, actor.id(), input).await?))
}

pub async fn get_ratings(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: Option<Actor>,
) -> ApiResult<Json<RatingsResponse>> {
    state.proposals.get(id).await?;
    let aggregate = state.ratings.get_aggregate(id).await?;
    let my_rating = match actor {
        Some(actor) => state.ratings.get_rating(id, actor.id()).await?,
        None => None,
    };
    Ok(Json(RatingsResponse { aggregate, my_rating }))
}

pub async fn batch_aggregates(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> ApiResult<Json<BatchResponse>> {
    if request.proposal_ids.len() > MAX_BATCH {
        return Err(ApiError::BadRequest(format!(
            "At most {} proposal ids per batch",
            MAX_BATCH
        )));
    }
    let aggregates = state.ratings.get_aggregates(&request.proposal_ids).await?;
    Ok(Json(BatchResponse { aggregates }))
}

pub fn rating_routes() -> Router<AppState> {
    Router::new()
        .route("/api/proposals/:id/ratings", put(submit_rating).get(get_ratings))
        .route("/api/proposals/ratings/batch", post(batch_aggregates))
}
