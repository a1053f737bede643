//! # tos Common Library
//!
//! Shared code for the tos governance microservices:
//! - Error taxonomy and configuration loading
//! - Governance enums and scoring policy tables
//! - Trust tier classification and trust score
//! - Content index contract with memory and SQLite backends
//! - Database bootstrap, settings and lock retry
//! - Event bus and SSE stream

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod index;
pub mod models;
pub mod policy;
pub mod sse;
pub mod time;
pub mod trust;

pub use error::{Error, Result};
pub use trust::{ContentEngagement, TrustPolicy, TrustThresholds, TrustTier};
