//! In-memory repositories

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AiRatingRepo, ModerationRepo, ProposalFilter, ProposalRepo, RatingRepo};
use crate::domain::{AiRating, ModerationReview, Proposal, Rating};
use tos_common::models::ModerationStatus;
use tos_common::{Error, Result};

#[derive(Default)]
pub struct MemoryProposalRepo {
    proposals: RwLock<HashMap<Uuid, Proposal>>,
}

impl MemoryProposalRepo {
    async fn matching(&self, filter: &ProposalFilter) -> Vec<Proposal> {
        let proposals = self.proposals.read().await;
        let mut found: Vec<Proposal> = proposals
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        found
    }
}

#[async_trait]
impl ProposalRepo for MemoryProposalRepo {
    async fn save(&self, proposal: &Proposal) -> Result<()> {
        self.proposals
            .write()
            .await
            .insert(proposal.id, proposal.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Proposal>> {
        Ok(self
            .proposals
            .read()
            .await
            .get(&id)
            .filter(|p| !p.is_deleted())
            .cloned())
    }

    async fn list(&self, filter: &ProposalFilter) -> Result<Vec<Proposal>> {
        Ok(self
            .matching(filter)
            .await
            .into_iter()
            .skip(filter.offset())
            .take(filter.limit())
            .collect())
    }

    async fn count(&self, filter: &ProposalFilter) -> Result<u64> {
        Ok(self.matching(filter).await.len() as u64)
    }
}

#[derive(Default)]
pub struct MemoryRatingRepo {
    ratings: RwLock<HashMap<(Uuid, Uuid), Rating>>,
}

#[async_trait]
impl RatingRepo for MemoryRatingRepo {
    async fn upsert(&self, rating: &Rating) -> Result<Rating> {
        let mut ratings = self.ratings.write().await;
        let key = (rating.proposal_id, rating.member_id);
        let stored = match ratings.get(&key) {
            Some(existing) => Rating {
                id: existing.id,
                rated_at: existing.rated_at,
                ..rating.clone()
            },
            None => rating.clone(),
        };
        ratings.insert(key, stored.clone());
        Ok(stored)
    }

    async fn find_by_member(&self, proposal_id: Uuid, member_id: Uuid) -> Result<Option<Rating>> {
        Ok(self
            .ratings
            .read()
            .await
            .get(&(proposal_id, member_id))
            .cloned())
    }

    async fn list_for_proposal(&self, proposal_id: Uuid) -> Result<Vec<Rating>> {
        let mut found: Vec<Rating> = self
            .ratings
            .read()
            .await
            .values()
            .filter(|r| r.proposal_id == proposal_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.rated_at.cmp(&b.rated_at));
        Ok(found)
    }
}

#[derive(Default)]
pub struct MemoryAiRatingRepo {
    ratings: RwLock<HashMap<Uuid, AiRating>>,
}

#[async_trait]
impl AiRatingRepo for MemoryAiRatingRepo {
    async fn upsert(&self, rating: &AiRating) -> Result<AiRating> {
        self.ratings
            .write()
            .await
            .insert(rating.proposal_id, rating.clone());
        Ok(rating.clone())
    }

    async fn find_by_proposal(&self, proposal_id: Uuid) -> Result<Option<AiRating>> {
        Ok(self.ratings.read().await.get(&proposal_id).cloned())
    }
}

#[derive(Default)]
pub struct MemoryModerationRepo {
    reviews: RwLock<HashMap<Uuid, ModerationReview>>,
}

#[async_trait]
impl ModerationRepo for MemoryModerationRepo {
    async fn insert_if_absent(&self, review: &ModerationReview) -> Result<(ModerationReview, bool)> {
        let mut reviews = self.reviews.write().await;
        if let Some(existing) = reviews.values().find(|r| r.proposal_id == review.proposal_id) {
            return Ok((existing.clone(), false));
        }
        reviews.insert(review.id, review.clone());
        Ok((review.clone(), true))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ModerationReview>> {
        Ok(self.reviews.read().await.get(&id).cloned())
    }

    async fn find_by_proposal(&self, proposal_id: Uuid) -> Result<Option<ModerationReview>> {
        Ok(self
            .reviews
            .read()
            .await
            .values()
            .find(|r| r.proposal_id == proposal_id)
            .cloned())
    }

    async fn update(&self, review: &ModerationReview) -> Result<()> {
        let mut reviews = self.reviews.write().await;
        match reviews.get_mut(&review.id) {
            Some(slot) => {
                *slot = review.clone();
                Ok(())
            }
            None => Err(Error::NotFound(format!("Moderation review {}", review.id))),
        }
    }

    async fn list_by_status(&self, status: ModerationStatus) -> Result<Vec<ModerationReview>> {
        let mut found: Vec<ModerationReview> = self
            .reviews
            .read()
            .await
            .values()
            .filter(|r| r.status == status)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.flagged_at.cmp(&b.flagged_at).then_with(|| a.id.cmp(&b.id)));
        Ok(found)
    }
}
