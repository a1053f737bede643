//! Search and prompt context
//!
//! GET /api/search ranks indexed content for a free-text query;
//! GET /api/context renders the top hits as a prompt block.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::parse_content_type;
use crate::error::{ApiError, ApiResult};
use crate::pagination::{calculate_pagination, total_pages};
use crate::prompt::format_content_block_for_prompt;
use crate::AppState;
use tos_common::index::{SearchOptions, SearchResult};
use tos_common::models::ContentType;
use tos_common::TrustTier;

/// Items rendered into a context block when no limit is given
pub const DEFAULT_CONTEXT_ITEMS: usize = 8;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Blank lists everything admitted by the filters, by trust
    #[serde(default)]
    pub q: String,
    pub limit: Option<usize>,
    pub page: Option<usize>,
    /// Lowest tier to include, e.g. `medium`
    pub min_trust: Option<String>,
    /// Comma-separated content types
    pub types: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchResult>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

#[derive(Debug, Deserialize)]
pub struct ContextQuery {
    pub q: String,
    pub limit: Option<usize>,
    pub min_trust: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ContextResponse {
    pub query: String,
    pub count: usize,
    /// Empty when nothing matched
    pub block: String,
}

fn require_query(q: &str) -> ApiResult<String> {
    let q = q.trim();
    if q.is_empty() {
        return Err(ApiError::BadRequest("q must not be empty".into()));
    }
    Ok(q.to_string())
}

fn parse_min_trust(raw: Option<&str>) -> ApiResult<Option<TrustTier>> {
    raw.filter(|s| !s.is_empty())
        .map(|s| TrustTier::from_str(s).map_err(ApiError::from))
        .transpose()
}

fn parse_types(raw: Option<&str>) -> ApiResult<Vec<ContentType>> {
    raw.unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_content_type)
        .collect()
}

/// GET /api/search?q=&limit=&page=&min_trust=&types=
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<SearchResponse>> {
    let q = query.q.trim().to_string();
    let pagination = calculate_pagination(query.page, query.limit);

    let options = SearchOptions {
        limit: pagination.page_size,
        offset: pagination.offset,
        min_trust: parse_min_trust(query.min_trust.as_deref())?,
        types: parse_types(query.types.as_deref())?,
    };
    let page = state.index.search(&q, &options).await?;

    Ok(Json(SearchResponse {
        query: q,
        total_pages: total_pages(page.total, pagination.page_size),
        total: page.total,
        results: page.results,
        page: pagination.page,
        page_size: pagination.page_size,
    }))
}

/// GET /api/context?q=&limit=&min_trust=
pub async fn context(
    State(state): State<AppState>,
    Query(query): Query<ContextQuery>,
) -> ApiResult<Json<ContextResponse>> {
    let q = require_query(&query.q)?;
    let options = SearchOptions {
        limit: query.limit.unwrap_or(DEFAULT_CONTEXT_ITEMS),
        min_trust: parse_min_trust(query.min_trust.as_deref())?,
        ..Default::default()
    };
    let page = state.index.search(&q, &options).await?;

    Ok(Json(ContextResponse {
        query: q,
        count: page.results.len(),
        block: format_content_block_for_prompt(page.results.iter().map(|r| &r.item)),
    }))
}

pub fn search_routes() -> Router<AppState> {
    Router::new()
        .route("/api/search", get(search))
        .route("/api/context", get(context))
}
