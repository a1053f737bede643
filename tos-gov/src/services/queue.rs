//! Moderation queue prioritizer

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::domain::{AiRating, ModerationReview, RatingAggregate};
use crate::repo::Repos;
use tos_common::models::{FlagReason, ModerationStatus};
use tos_common::policy::UrgencyWeights;
use tos_common::time::{self, hours_between};
use tos_common::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AiAssessmentSummary {
    pub clarity: u8,
    pub constructiveness: u8,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommunityRatingsSummary {
    pub red_flag_count: u32,
    pub total_ratings: u32,
}

/// One open review with the context a moderator needs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueItem {
    pub review_id: Uuid,
    pub proposal_id: Uuid,
    pub proposal_title: String,
    pub proposal_author_id: Uuid,
    pub flag_reason: FlagReason,
    pub status: ModerationStatus,
    pub urgency_score: f64,
    pub flagged_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_assessment: Option<AiAssessmentSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub community_ratings: Option<CommunityRatingsSummary>,
}

/// Additive urgency heuristic for one review
pub fn urgency_score(
    review: &ModerationReview,
    ai_rating: Option<&AiRating>,
    aggregate: Option<&RatingAggregate>,
    weights: &UrgencyWeights,
    now: DateTime<Utc>,
) -> f64 {
    let mut score = weights.for_reason(review.flag_reason);

    if aggregate.is_some_and(|a| a.red_flag_count > weights.red_flag_threshold) {
        score += weights.community_red_flags;
    }
    if ai_rating.is_some_and(|r| r.constructiveness == 1) {
        score += weights.ai_red_constructiveness;
    }

    score + weights.for_age(hours_between(review.flagged_at, now))
}

#[derive(Clone)]
pub struct QueuePrioritizer {
    repos: Repos,
    weights: UrgencyWeights,
}

impl QueuePrioritizer {
    pub fn new(repos: Repos, weights: UrgencyWeights) -> Self {
        Self { repos, weights }
    }

    pub async fn get_queue(&self, status: ModerationStatus) -> Result<Vec<QueueItem>> {
        self.get_queue_at(status, time::now()).await
    }

    /// Reviews in `status`, most urgent first; ties keep flagged order
    pub async fn get_queue_at(&self, status: ModerationStatus, now: DateTime<Utc>) -> Result<Vec<QueueItem>> {
        let reviews = self.repos.reviews.list_by_status(status).await?;
        let mut items = Vec::with_capacity(reviews.len());

        for review in reviews {
            let Some(proposal) = self.repos.proposals.find_by_id(review.proposal_id).await? else {
                debug!(review_id = %review.id, proposal_id = %review.proposal_id, "Skipping review of missing proposal");
                continue;
            };

            let ai_rating = self.repos.ai_ratings.find_by_proposal(proposal.id).await?;
            let ratings = self.repos.ratings.list_for_proposal(proposal.id).await?;
            let aggregate =
                (!ratings.is_empty()).then(|| RatingAggregate::calculate(Some(proposal.id), &ratings));

            let urgency_score = urgency_score(
                &review,
                ai_rating.as_ref(),
                aggregate.as_ref(),
                &self.weights,
                now,
            );

            items.push(QueueItem {
                review_id: review.id,
                proposal_id: proposal.id,
                proposal_title: proposal.title,
                proposal_author_id: proposal.author_id,
                flag_reason: review.flag_reason,
                status: review.status,
                urgency_score,
                flagged_at: review.flagged_at,
                ai_assessment: ai_rating.map(|r| AiAssessmentSummary {
                    clarity: r.clarity,
                    constructiveness: r.constructiveness,
                    issues: r.issues,
                }),
                community_ratings: aggregate.map(|a| CommunityRatingsSummary {
                    red_flag_count: a.red_flag_count,
                    total_ratings: a.total_ratings,
                }),
            });
        }

        // sort_by is stable
        items.sort_by(|a, b| b.urgency_score.total_cmp(&a.urgency_score));
        Ok(items)
    }
}
