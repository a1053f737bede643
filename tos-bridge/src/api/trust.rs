//! Runtime trust thresholds
//!
//! GET /api/trust/thresholds returns the thresholds in effect.
//! PUT /api/trust/thresholds validates and stores new ones, then
//! reclassifies every indexed item under them.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tracing::info;

use crate::error::ApiResult;
use crate::AppState;
use tos_common::db::settings::set_trust_thresholds;
use tos_common::TrustThresholds;

#[derive(Debug, Serialize)]
pub struct ThresholdsUpdated {
    pub thresholds: TrustThresholds,
    /// Items whose tier and score were recomputed
    pub reclassified: usize,
}

pub async fn get_thresholds(State(state): State<AppState>) -> Json<TrustThresholds> {
    Json(state.policy.read().await.thresholds.clone())
}

pub async fn put_thresholds(
    State(state): State<AppState>,
    Json(thresholds): Json<TrustThresholds>,
) -> ApiResult<Json<ThresholdsUpdated>> {
    thresholds.validate()?;

    if let Some(db) = &state.db {
        set_trust_thresholds(db, &thresholds).await?;
    }

    // Index writes wait until every item is reclassified
    let mut policy = state.policy.write().await;
    policy.thresholds = thresholds.clone();
    let reclassified = state.index.reclassify_all(&policy).await?;
    drop(policy);

    info!(reclassified, "Trust thresholds updated");
    Ok(Json(ThresholdsUpdated {
        thresholds,
        reclassified,
    }))
}

pub fn trust_routes() -> Router<AppState> {
    Router::new().route("/api/trust/thresholds", get(get_thresholds).put(put_thresholds))
}
