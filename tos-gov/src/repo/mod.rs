//! Persistence ports for the governance entities
//!
//! One async trait per entity. `memory` backs tests and single-process runs;
//! the SQLite implementations live in `crate::db`.

pub mod memory;

use async_trait::async_trait;
use serde::Deserialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{AiRating, ModerationReview, Proposal, Rating};
use tos_common::models::{ModerationStatus, ProposalStatus, ScopeType};
use tos_common::Result;

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 200;

/// List filter for proposals; soft-deleted proposals never match
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProposalFilter {
    pub scope_type: Option<ScopeType>,
    pub scope_id: Option<Uuid>,
    pub status: Option<ProposalStatus>,
    pub author_id: Option<Uuid>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

impl ProposalFilter {
    pub fn limit(&self) -> usize {
        match self.limit {
            None | Some(0) => DEFAULT_PAGE_SIZE,
            Some(n) => n.min(MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> usize {
        self.offset.unwrap_or(0)
    }

    /// 1-based page number implied by offset and limit
    pub fn page(&self) -> usize {
        (self.offset() / self.limit()).saturating_add(1)
    }

    pub fn matches(&self, proposal: &Proposal) -> bool {
        !proposal.is_deleted()
            && self.scope_type.map_or(true, |v| proposal.scope_type == v)
            && self.scope_id.map_or(true, |v| proposal.scope_id == v)
            && self.status.map_or(true, |v| proposal.status == v)
            && self.author_id.map_or(true, |v| proposal.author_id == v)
    }
}

#[async_trait]
pub trait ProposalRepo: Send + Sync {
    /// Insert or replace by id
    async fn save(&self, proposal: &Proposal) -> Result<()>;

    /// Live proposal by id; soft-deleted proposals read as absent
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Proposal>>;

    /// Page of matching proposals, newest first
    async fn list(&self, filter: &ProposalFilter) -> Result<Vec<Proposal>>;

    /// Matches ignoring pagination
    async fn count(&self, filter: &ProposalFilter) -> Result<u64>;
}

#[async_trait]
pub trait RatingRepo: Send + Sync {
    /// Insert, or update the existing (proposal, member) row keeping its id
    async fn upsert(&self, rating: &Rating) -> Result<Rating>;

    async fn find_by_member(&self, proposal_id: Uuid, member_id: Uuid) -> Result<Option<Rating>>;

    async fn list_for_proposal(&self, proposal_id: Uuid) -> Result<Vec<Rating>>;
}

#[async_trait]
pub trait AiRatingRepo: Send + Sync {
    /// Replace any earlier assessment of the same proposal
    async fn upsert(&self, rating: &AiRating) -> Result<AiRating>;

    async fn find_by_proposal(&self, proposal_id: Uuid) -> Result<Option<AiRating>>;
}

#[async_trait]
pub trait ModerationRepo: Send + Sync {
    /// Store `review` unless the proposal already has one
    ///
    /// Returns the stored review and whether it was newly created.
    async fn insert_if_absent(&self, review: &ModerationReview) -> Result<(ModerationReview, bool)>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ModerationReview>>;

    async fn find_by_proposal(&self, proposal_id: Uuid) -> Result<Option<ModerationReview>>;

    /// Overwrite an existing review
    async fn update(&self, review: &ModerationReview) -> Result<()>;

    /// Reviews in `status`, oldest flag first
    async fn list_by_status(&self, status: ModerationStatus) -> Result<Vec<ModerationReview>>;
}

/// The four repositories wired together
#[derive(Clone)]
pub struct Repos {
    pub proposals: Arc<dyn ProposalRepo>,
    pub ratings: Arc<dyn RatingRepo>,
    pub ai_ratings: Arc<dyn AiRatingRepo>,
    pub reviews: Arc<dyn ModerationRepo>,
}

impl Repos {
    pub fn in_memory() -> Self {
        Self {
            proposals: Arc::new(memory::MemoryProposalRepo::default()),
            ratings: Arc::new(memory::MemoryRatingRepo::default()),
            ai_ratings: Arc::new(memory::MemoryAiRatingRepo::default()),
            reviews: Arc::new(memory::MemoryModerationRepo::default()),
        }
    }

    pub fn sqlite(pool: SqlitePool) -> Self {
        Self {
            proposals: Arc::new(crate::db::SqliteProposalRepo::new(pool.clone())),
            ratings: Arc::new(crate::db::SqliteRatingRepo::new(pool.clone())),
            ai_ratings: Arc::new(crate::db::SqliteAiRatingRepo::new(pool.clone())),
            reviews: Arc::new(crate::db::SqliteModerationRepo::new(pool)),
        }
    }
}
