//! Moderation review value and its status rules

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::check_length;
use tos_common::models::{FlagReason, ModerationAction, ModerationStatus, ReviewDecision};
use tos_common::{Error, Result};

pub const APPEAL_MIN: usize = 10;
pub const APPEAL_MAX: usize = 2000;

/// At most one per proposal; never deleted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationReview {
    pub id: Uuid,
    pub proposal_id: Uuid,
    pub flag_reason: FlagReason,
    pub status: ModerationStatus,
    pub moderator_id: Option<Uuid>,
    pub moderator_notes: Option<String>,
    pub action: Option<ModerationAction>,
    pub author_notified: bool,
    pub flagged_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub appeal_text: Option<String>,
    pub appealed_at: Option<DateTime<Utc>>,
    /// Moderator who decided the appeal; `moderator_id` keeps the first reviewer
    pub appeal_moderator_id: Option<Uuid>,
    pub appeal_reviewed_at: Option<DateTime<Utc>>,
}

impl ModerationReview {
    /// New pending review
    pub fn open(proposal_id: Uuid, flag_reason: FlagReason, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            proposal_id,
            flag_reason,
            status: ModerationStatus::Pending,
            moderator_id: None,
            moderator_notes: None,
            action: None,
            author_notified: false,
            flagged_at: now,
            reviewed_at: None,
            appeal_text: None,
            appealed_at: None,
            appeal_moderator_id: None,
            appeal_reviewed_at: None,
        }
    }

    fn ensure_can_move_to(&self, target: ModerationStatus) -> Result<()> {
        if self.status.allowed_transitions().contains(&target) {
            Ok(())
        } else {
            Err(Error::invalid_transition(
                self.status,
                target,
                self.status.allowed_transitions(),
            ))
        }
    }

    /// First moderator decision on a pending review
    pub fn review(
        &self,
        moderator_id: Uuid,
        decision: ReviewDecision,
        action: ModerationAction,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let target = match decision {
            ReviewDecision::Approve => ModerationStatus::Approved,
            ReviewDecision::Reject => ModerationStatus::Rejected,
        };
        self.ensure_can_move_to(target)?;

        let mut next = self.clone();
        next.status = target;
        next.moderator_id = Some(moderator_id);
        next.moderator_notes = notes;
        next.action = Some(action);
        next.author_notified = true;
        next.reviewed_at = Some(now);
        Ok(next)
    }

    /// Author contests an approved review
    pub fn appeal(&self, appeal_text: String, now: DateTime<Utc>) -> Result<Self> {
        check_length("appeal_text", &appeal_text, APPEAL_MIN, APPEAL_MAX)?;
        self.ensure_can_move_to(ModerationStatus::Appealed)?;

        let mut next = self.clone();
        next.status = ModerationStatus::Appealed;
        next.appeal_text = Some(appeal_text);
        next.appealed_at = Some(now);
        Ok(next)
    }

    /// Moderator decision on an appeal; `notes` replace the earlier notes when given
    pub fn review_appeal(
        &self,
        moderator_id: Uuid,
        decision: ReviewDecision,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let target = match decision {
            ReviewDecision::Approve => ModerationStatus::AppealApproved,
            ReviewDecision::Reject => ModerationStatus::AppealRejected,
        };
        self.ensure_can_move_to(target)?;

        let mut next = self.clone();
        next.status = target;
        next.appeal_moderator_id = Some(moderator_id);
        if notes.is_some() {
            next.moderator_notes = notes;
        }
        next.appeal_reviewed_at = Some(now);
        Ok(next)
    }
}
