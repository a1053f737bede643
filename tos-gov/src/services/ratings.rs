//! Member rating submission and aggregation

use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use crate::domain::{Rating, RatingAggregate, RatingInput};
use crate::repo::Repos;
use crate::worker::{Task, TaskQueue};
use tos_common::events::{EventBus, TosEvent};
use tos_common::{time, Error, Result};

#[derive(Clone)]
pub struct RatingService {
    repos: Repos,
    tasks: TaskQueue,
    events: EventBus,
}

impl RatingService {
    pub fn new(repos: Repos, tasks: TaskQueue, events: EventBus) -> Self {
        Self { repos, tasks, events }
    }

    /// Create or replace `member_id`'s rating of a live proposal
    ///
    /// A red rating schedules a red-flag check; every rating schedules an
    /// index engagement refresh.
    pub async fn submit_rating(&self, proposal_id: Uuid, member_id: Uuid, input: RatingInput) -> Result<Rating> {
        input.validate()?;
        if self.repos.proposals.find_by_id(proposal_id).await?.is_none() {
            return Err(Error::NotFound(format!("Proposal {}", proposal_id)));
        }

        let now = time::now();
        let candidate = match self.repos.ratings.find_by_member(proposal_id, member_id).await? {
            Some(existing) => existing.resubmit(input, now),
            None => Rating::new(proposal_id, member_id, input, now),
        };
        let rating = self.repos.ratings.upsert(&candidate).await?;

        info!(%proposal_id, %member_id, constructiveness = rating.constructiveness, "Rating submitted");
        self.events.emit_lossy(TosEvent::RatingSubmitted {
            proposal_id,
            member_id,
            constructiveness: rating.constructiveness,
            timestamp: rating.updated_at,
        });

        if rating.is_red_flag() {
            self.tasks.enqueue(Task::CheckRedFlags { proposal_id });
        }
        self.tasks.enqueue(Task::RefreshEngagement { proposal_id });

        Ok(rating)
    }

    pub async fn get_rating(&self, proposal_id: Uuid, member_id: Uuid) -> Result<Option<Rating>> {
        self.repos.ratings.find_by_member(proposal_id, member_id).await
    }

    pub async fn list_ratings(&self, proposal_id: Uuid) -> Result<Vec<Rating>> {
        self.repos.ratings.list_for_proposal(proposal_id).await
    }

    pub async fn get_aggregate(&self, proposal_id: Uuid) -> Result<RatingAggregate> {
        let ratings = self.repos.ratings.list_for_proposal(proposal_id).await?;
        Ok(RatingAggregate::calculate(Some(proposal_id), &ratings))
    }

    /// Aggregates keyed by proposal id; unrated proposals get the zero aggregate
    pub async fn get_aggregates(&self, proposal_ids: &[Uuid]) -> Result<HashMap<Uuid, RatingAggregate>> {
        let mut aggregates = HashMap::with_capacity(proposal_ids.len());
        for &proposal_id in proposal_ids {
            if !aggregates.contains_key(&proposal_id) {
                aggregates.insert(proposal_id, self.get_aggregate(proposal_id).await?);
            }
        }
        Ok(aggregates)
    }
}
