//! Moderation flag manager
//!
//! Opens at most one review per proposal and advances it through moderator
//! and appeal decisions. Flagging is serialized within the process; the
//! unique index on `moderation_reviews.proposal_id` covers other processes.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::ModerationReview;
use crate::repo::ModerationRepo;
use tos_common::events::{EventBus, TosEvent};
use tos_common::models::{FlagReason, ModerationAction, ReviewDecision};
use tos_common::time;
use tos_common::{Error, Result};

#[derive(Clone)]
pub struct FlagManager {
    reviews: Arc<dyn ModerationRepo>,
    events: EventBus,
    flag_lock: Arc<Mutex<()>>,
}

impl FlagManager {
    pub fn new(reviews: Arc<dyn ModerationRepo>, events: EventBus) -> Self {
        Self {
            reviews,
            events,
            flag_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Open a pending review, or return the proposal's existing one unchanged
    pub async fn flag_proposal(&self, proposal_id: Uuid, reason: FlagReason) -> Result<ModerationReview> {
        let _guard = self.flag_lock.lock().await;

        if let Some(existing) = self.reviews.find_by_proposal(proposal_id).await? {
            debug!(%proposal_id, review_id = %existing.id, "Proposal already has a review");
            return Ok(existing);
        }

        let candidate = ModerationReview::open(proposal_id, reason, time::now());
        let (review, created) = self.reviews.insert_if_absent(&candidate).await?;

        if created {
            info!(%proposal_id, review_id = %review.id, reason = %reason, "Opened moderation review");
            self.events.emit_lossy(TosEvent::ReviewOpened {
                review_id: review.id,
                proposal_id,
                flag_reason: reason,
                timestamp: review.flagged_at,
            });
        }
        Ok(review)
    }

    /// Escalate on community red flags: one is a member concern, two or more
    /// are multiple concerns, zero does nothing
    pub async fn check_and_flag_proposal(
        &self,
        proposal_id: Uuid,
        red_flag_count: u32,
    ) -> Result<Option<ModerationReview>> {
        let reason = match red_flag_count {
            0 => return Ok(None),
            1 => FlagReason::MemberRedRating,
            _ => FlagReason::MultipleConcerns,
        };
        self.flag_proposal(proposal_id, reason).await.map(Some)
    }

    pub async fn review_proposal(
        &self,
        review_id: Uuid,
        moderator_id: Uuid,
        decision: ReviewDecision,
        action: ModerationAction,
        notes: Option<String>,
    ) -> Result<ModerationReview> {
        let current = self.get_review(review_id).await?;
        let next = current.review(moderator_id, decision, action, notes, time::now())?;
        self.reviews.update(&next).await?;

        info!(%review_id, %moderator_id, status = %next.status, action = %action, "Review decided");
        self.events.emit_lossy(TosEvent::ReviewDecided {
            review_id,
            proposal_id: next.proposal_id,
            decision,
            action,
            timestamp: time::now(),
        });
        Ok(next)
    }

    pub async fn submit_appeal(&self, review_id: Uuid, appeal_text: String) -> Result<ModerationReview> {
        let current = self.get_review(review_id).await?;
        let next = current.appeal(appeal_text, time::now())?;
        self.reviews.update(&next).await?;

        info!(%review_id, "Appeal submitted");
        self.events.emit_lossy(TosEvent::AppealSubmitted {
            review_id,
            proposal_id: next.proposal_id,
            timestamp: time::now(),
        });
        Ok(next)
    }

    pub async fn review_appeal(
        &self,
        review_id: Uuid,
        moderator_id: Uuid,
        decision: ReviewDecision,
        notes: Option<String>,
    ) -> Result<ModerationReview> {
        let current = self.get_review(review_id).await?;
        let next = current.review_appeal(moderator_id, decision, notes, time::now())?;
        self.reviews.update(&next).await?;

        info!(%review_id, %moderator_id, status = %next.status, "Appeal decided");
        self.events.emit_lossy(TosEvent::AppealDecided {
            review_id,
            proposal_id: next.proposal_id,
            status: next.status,
            timestamp: time::now(),
        });
        Ok(next)
    }

    pub async fn get_review(&self, review_id: Uuid) -> Result<ModerationReview> {
        self.reviews
            .find_by_id(review_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Moderation review {}", review_id)))
    }

    pub async fn get_review_for_proposal(&self, proposal_id: Uuid) -> Result<Option<ModerationReview>> {
        self.reviews.find_by_proposal(proposal_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::memory::MemoryModerationRepo;
    use tos_common::models::ModerationStatus;

    fn manager() -> FlagManager {
        FlagManager::new(Arc::new(MemoryModerationRepo::default()), EventBus::new(16))
    }

    #[tokio::test]
    async fn test_flag_twice_returns_same_review() {
        let flags = manager();
        let proposal_id = Uuid::new_v4();

        let first = flags.flag_proposal(proposal_id, FlagReason::AiFlagged).await.unwrap();
        let second = flags
            .flag_proposal(proposal_id, FlagReason::ManualReport)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.flag_reason, FlagReason::AiFlagged);
        assert_eq!(first.status, ModerationStatus::Pending);
        assert!(!first.author_notified);
    }

    #[tokio::test]
    async fn test_concurrent_flags_open_one_review() {
        let flags = manager();
        let proposal_id = Uuid::new_v4();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let flags = flags.clone();
                tokio::spawn(async move {
                    flags
                        .flag_proposal(proposal_id, FlagReason::MemberRedRating)
                        .await
                        .unwrap()
                        .id
                })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
    }

    #[tokio::test]
    async fn test_check_and_flag_reason_by_count() {
        let flags = manager();

        let none = flags.check_and_flag_proposal(Uuid::new_v4(), 0).await.unwrap();
        assert!(none.is_none());

        let one = flags.check_and_flag_proposal(Uuid::new_v4(), 1).await.unwrap().unwrap();
        assert_eq!(one.flag_reason, FlagReason::MemberRedRating);

        let two = flags.check_and_flag_proposal(Uuid::new_v4(), 2).await.unwrap().unwrap();
        assert_eq!(two.flag_reason, FlagReason::MultipleConcerns);
    }

    #[tokio::test]
    async fn test_zero_red_flags_creates_nothing() {
        let flags = manager();
        let proposal_id = Uuid::new_v4();
        flags.check_and_flag_proposal(proposal_id, 0).await.unwrap();
        assert!(flags.get_review_for_proposal(proposal_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_review_then_appeal_flow() {
        let flags = manager();
        let moderator = Uuid::new_v4();
        let review = flags
            .flag_proposal(Uuid::new_v4(), FlagReason::ManualReport)
            .await
            .unwrap();

        let reviewed = flags
            .review_proposal(
                review.id,
                moderator,
                ReviewDecision::Approve,
                ModerationAction::Hidden,
                Some("Personal attack in summary".into()),
            )
            .await
            .unwrap();
        assert_eq!(reviewed.status, ModerationStatus::Approved);
        assert!(reviewed.author_notified);
        assert!(reviewed.reviewed_at.is_some());

        let appealed = flags
            .submit_appeal(review.id, "The quote was taken out of context.".into())
            .await
            .unwrap();
        assert_eq!(appealed.status, ModerationStatus::Appealed);

        let decided = flags
            .review_appeal(review.id, moderator, ReviewDecision::Reject, None)
            .await
            .unwrap();
        assert_eq!(decided.status, ModerationStatus::AppealRejected);
        assert_eq!(decided.moderator_notes.as_deref(), Some("Personal attack in summary"));
        assert_eq!(flags.get_review(review.id).await.unwrap(), decided);
    }

    #[tokio::test]
    async fn test_appeal_on_pending_review_fails() {
        let flags = manager();
        let review = flags
            .flag_proposal(Uuid::new_v4(), FlagReason::AiFlagged)
            .await
            .unwrap();

        let err = flags
            .submit_appeal(review.id, "Please reconsider this.".into())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidStateTransition { .. }));
    }

    #[tokio::test]
    async fn test_unknown_review_is_not_found() {
        let err = manager().get_review(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_review_opened_event_emitted_once() {
        let flags = manager();
        let mut rx = flags.events.subscribe();
        let proposal_id = Uuid::new_v4();

        flags.flag_proposal(proposal_id, FlagReason::AiFlagged).await.unwrap();
        flags.flag_proposal(proposal_id, FlagReason::AiFlagged).await.unwrap();

        assert!(matches!(rx.try_recv(), Ok(TosEvent::ReviewOpened { .. })));
        assert!(rx.try_recv().is_err());
    }
}
