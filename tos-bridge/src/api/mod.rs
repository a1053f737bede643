//! HTTP API handlers for tos-bridge

pub mod health;
pub mod index;
pub mod search;
pub mod sse;
pub mod trust;

pub use health::health_routes;
pub use index::index_routes;
pub use search::search_routes;
pub use sse::event_stream;
pub use trust::trust_routes;

use std::str::FromStr;

use crate::error::ApiError;
use tos_common::models::ContentType;

/// Content type from a path segment such as `forum_post`
pub(crate) fn parse_content_type(raw: &str) -> Result<ContentType, ApiError> {
    ContentType::from_str(raw).map_err(ApiError::from)
}
