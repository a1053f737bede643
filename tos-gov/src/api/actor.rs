//! Caller identity from the `X-Member-Id` header
//!
//! Authentication happens upstream; this service only needs to know which
//! member is acting.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::ApiError;
use tos_common::Error;

pub const MEMBER_ID_HEADER: &str = "x-member-id";

/// The member making the request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor(pub Uuid);

impl Actor {
    pub fn id(&self) -> Uuid {
        self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(MEMBER_ID_HEADER)
            .ok_or_else(|| Error::Unauthorized("Missing X-Member-Id header".into()))?;

        let id = value
            .to_str()
            .ok()
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
            .filter(|id| !id.is_nil())
            .ok_or_else(|| Error::Unauthorized("X-Member-Id is not a valid member id".into()))?;

        Ok(Actor(id))
    }
}
