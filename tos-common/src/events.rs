//! Domain events for the tos event system
//!
//! Services emit events after a state change has been persisted. Nothing in
//! the pipeline depends on delivery; the SSE endpoint is the only consumer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::{
    ContentType, FlagReason, ModerationAction, ModerationStatus, ProposalStatus, ReviewDecision,
};
use crate::trust::TrustTier;

/// tos event types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TosEvent {
    ProposalCreated {
        proposal_id: Uuid,
        author_id: Uuid,
        title: String,
        timestamp: DateTime<Utc>,
    },

    /// Content edit or status transition
    ProposalUpdated {
        proposal_id: Uuid,
        status: ProposalStatus,
        timestamp: DateTime<Utc>,
    },

    /// Soft delete
    ProposalDeleted {
        proposal_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    RatingSubmitted {
        proposal_id: Uuid,
        member_id: Uuid,
        constructiveness: u8,
        timestamp: DateTime<Utc>,
    },

    AiRatingStored {
        proposal_id: Uuid,
        flagged_for_review: bool,
        timestamp: DateTime<Utc>,
    },

    /// A moderation review was created (never re-emitted for an existing review)
    ReviewOpened {
        review_id: Uuid,
        proposal_id: Uuid,
        flag_reason: FlagReason,
        timestamp: DateTime<Utc>,
    },

    ReviewDecided {
        review_id: Uuid,
        proposal_id: Uuid,
        decision: ReviewDecision,
        action: ModerationAction,
        timestamp: DateTime<Utc>,
    },

    AppealSubmitted {
        review_id: Uuid,
        proposal_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    AppealDecided {
        review_id: Uuid,
        proposal_id: Uuid,
        status: ModerationStatus,
        timestamp: DateTime<Utc>,
    },

    ContentIndexed {
        content_type: ContentType,
        content_id: String,
        trust_tier: TrustTier,
        timestamp: DateTime<Utc>,
    },

    ContentRemoved {
        content_type: ContentType,
        content_id: String,
        timestamp: DateTime<Utc>,
    },
}

impl TosEvent {
    /// SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            TosEvent::ProposalCreated { .. } => "ProposalCreated",
            TosEvent::ProposalUpdated { .. } => "ProposalUpdated",
            TosEvent::ProposalDeleted { .. } => "ProposalDeleted",
            TosEvent::RatingSubmitted { .. } => "RatingSubmitted",
            TosEvent::AiRatingStored { .. } => "AiRatingStored",
            TosEvent::ReviewOpened { .. } => "ReviewOpened",
            TosEvent::ReviewDecided { .. } => "ReviewDecided",
            TosEvent::AppealSubmitted { .. } => "AppealSubmitted",
            TosEvent::AppealDecided { .. } => "AppealDecided",
            TosEvent::ContentIndexed { .. } => "ContentIndexed",
            TosEvent::ContentRemoved { .. } => "ContentRemoved",
        }
    }
}

/// Broadcast bus for [`TosEvent`]
///
/// Slow subscribers lose the oldest events once `capacity` is exceeded.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<TosEvent>,
    capacity: usize,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Receive all events emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<TosEvent> {
        self.tx.subscribe()
    }

    /// Emit to all subscribers; `Err` when nobody is listening
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: TosEvent) -> Result<usize, broadcast::error::SendError<TosEvent>> {
        self.tx.send(event)
    }

    /// Emit, ignoring the no-subscriber case
    pub fn emit_lossy(&self, event: TosEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deleted() -> TosEvent {
        TosEvent::ProposalDeleted {
            proposal_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_emit_without_subscribers_fails() {
        let bus = EventBus::new(10);
        assert!(bus.emit(deleted()).is_err());
        bus.emit_lossy(deleted());
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_subscriber_receives_event() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();
        let event = deleted();
        assert_eq!(bus.emit(event.clone()).unwrap(), 1);
        assert_eq!(rx.recv().await.unwrap(), event);
    }

    #[test]
    fn test_serialized_form_is_tagged() {
        let json = serde_json::to_value(TosEvent::ReviewOpened {
            review_id: Uuid::nil(),
            proposal_id: Uuid::nil(),
            flag_reason: FlagReason::ManualReport,
            timestamp: Utc::now(),
        })
        .unwrap();
        assert_eq!(json["type"], "ReviewOpened");
        assert_eq!(json["flag_reason"], "manual_report");
    }
}
