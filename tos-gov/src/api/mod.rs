//! HTTP API handlers for tos-gov

pub mod actor;
pub mod health;
pub mod moderation;
pub mod proposals;
pub mod ratings;
pub mod sse;

pub use actor::Actor;
pub use health::health_routes;
pub use moderation::moderation_routes;
pub use proposals::proposal_routes;
pub use ratings::rating_routes;
pub use sse::event_stream;
