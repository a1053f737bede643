//! Background tasks triggered by proposal and rating requests
//!
//! Handlers enqueue and return; the worker drains the channel and hands AI
//! assessments to a second lane. A full or closed queue is logged and the
//! task dropped. Task failures are logged
//! with the task name and proposal id and never reach the original caller.

use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::{Proposal, RatingAggregate};
use crate::repo::Repos;
use crate::services::{FlagManager, QualityAssessor};
use tos_common::db::settings::resolve_trust_thresholds;
use tos_common::events::{EventBus, TosEvent};
use tos_common::index::{ContentIndex, IndexContentInput};
use tos_common::models::{ContentType, FlagReason};
use tos_common::{time, ContentEngagement, Error, Result, TrustPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// Run the AI assessor and flag if warranted
    AssessProposal { proposal_id: Uuid },
    /// Recount red ratings and escalate
    CheckRedFlags { proposal_id: Uuid },
    IndexProposal { proposal_id: Uuid },
    /// Push the current rating counts into the content index
    RefreshEngagement { proposal_id: Uuid },
    RemoveFromIndex { proposal_id: Uuid },
}

impl Task {
    pub fn name(&self) -> &'static str {
        match self {
            Task::AssessProposal { .. } => "assess_proposal",
            Task::CheckRedFlags { .. } => "check_red_flags",
            Task::IndexProposal { .. } => "index_proposal",
            Task::RefreshEngagement { .. } => "refresh_engagement",
            Task::RemoveFromIndex { .. } => "remove_from_index",
        }
    }

    pub fn proposal_id(&self) -> Uuid {
        match *self {
            Task::AssessProposal { proposal_id }
            | Task::CheckRedFlags { proposal_id }
            | Task::IndexProposal { proposal_id }
            | Task::RefreshEngagement { proposal_id }
            | Task::RemoveFromIndex { proposal_id } => proposal_id,
        }
    }
}

/// Sending half handed to services
#[derive(Clone)]
pub struct TaskQueue {
    tx: mpsc::Sender<Task>,
}

impl TaskQueue {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Task>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Enqueue without waiting
    pub fn enqueue(&self, task: Task) {
        match self.tx.try_send(task) {
            Ok(()) => debug!(task = task.name(), proposal_id = %task.proposal_id(), "Task enqueued"),
            Err(TrySendError::Full(task)) => {
                warn!(task = task.name(), proposal_id = %task.proposal_id(), "Task queue full, dropping task")
            }
            Err(TrySendError::Closed(task)) => {
                warn!(task = task.name(), proposal_id = %task.proposal_id(), "Task queue closed, dropping task")
            }
        }
    }
}

/// Pending assessments held while the LLM lane is busy
pub const ASSESSMENT_QUEUE_CAPACITY: usize = 256;

/// Public link for a proposal in the content index
pub fn proposal_url(proposal_id: Uuid) -> String {
    format!("/governance/{}", proposal_id)
}

/// Engagement snapshot of a proposal derived from member ratings
///
/// Raters count as participants; ratings use a different scale from the
/// index's `rating_avg`, so that stays unset.
pub fn proposal_engagement(aggregate: &RatingAggregate) -> ContentEngagement {
    ContentEngagement {
        participant_count: aggregate.total_ratings as i64,
        ..ContentEngagement::default()
    }
}

pub struct BackgroundWorker {
    repos: Repos,
    assessor: QualityAssessor,
    flags: FlagManager,
    events: EventBus,
    index: Option<Arc<dyn ContentIndex>>,
    policy: TrustPolicy,
    settings_db: Option<SqlitePool>,
    last_error: Option<Arc<RwLock<Option<String>>>>,
}

impl BackgroundWorker {
    pub fn new(repos: Repos, assessor: QualityAssessor, flags: FlagManager, events: EventBus) -> Self {
        Self {
            repos,
            assessor,
            flags,
            events,
            index: None,
            policy: TrustPolicy::default(),
            settings_db: None,
            last_error: None,
        }
    }

    /// Maintain proposal entries in `index`, classified under `policy`
    pub fn with_index(mut self, index: Arc<dyn ContentIndex>, policy: TrustPolicy) -> Self {
        self.index = Some(index);
        self.policy = policy;
        self
    }

    /// Prefer thresholds stored in the settings table over the configured ones
    pub fn with_settings(mut self, db: SqlitePool) -> Self {
        self.settings_db = Some(db);
        self
    }

    /// Record the most recent task failure in `sink`
    pub fn with_error_sink(mut self, sink: Arc<RwLock<Option<String>>>) -> Self {
        self.last_error = Some(sink);
        self
    }

    /// Drain `rx` until every sender is dropped
    ///
    /// Assessments wait on the LLM, so they run on their own lane and never
    /// hold up red-flag escalation or index maintenance.
    pub async fn run(self, mut rx: mpsc::Receiver<Task>) {
        info!("Background worker started");
        let worker = Arc::new(self);
        let (assess_tx, assess_rx) = mpsc::channel(ASSESSMENT_QUEUE_CAPACITY);
        let assessments = tokio::spawn(Arc::clone(&worker).run_lane(assess_rx));
        let assess_queue = TaskQueue { tx: assess_tx };

        while let Some(task) = rx.recv().await {
            match task {
                Task::AssessProposal { .. } => assess_queue.enqueue(task),
                _ => worker.run_logged(task).await,
            }
        }

        drop(assess_queue);
        if let Err(e) = assessments.await {
            error!(error = %e, "Assessment lane stopped abnormally");
        }
        info!("Background worker stopped");
    }

    async fn run_lane(self: Arc<Self>, mut rx: mpsc::Receiver<Task>) {
        while let Some(task) = rx.recv().await {
            self.run_logged(task).await;
        }
    }

    async fn run_logged(&self, task: Task) {
        if let Err(e) = self.run_task(task).await {
            error!(
                task = task.name(),
                proposal_id = %task.proposal_id(),
                error = %e,
                "Background task failed"
            );
            if let Some(sink) = &self.last_error {
                *sink.write().await = Some(format!("{} {}: {}", task.name(), task.proposal_id(), e));
            }
        }
    }

    pub async fn run_task(&self, task: Task) -> Result<()> {
        match task {
            Task::AssessProposal { proposal_id } => self.assess(proposal_id).await,
            Task::CheckRedFlags { proposal_id } => self.check_red_flags(proposal_id).await,
            Task::IndexProposal { proposal_id } => self.index_proposal(proposal_id).await,
            Task::RefreshEngagement { proposal_id } => self.refresh_engagement(proposal_id).await,
            Task::RemoveFromIndex { proposal_id } => self.remove_from_index(proposal_id).await,
        }
    }

    async fn live_proposal(&self, proposal_id: Uuid) -> Result<Option<Proposal>> {
        let proposal = self.repos.proposals.find_by_id(proposal_id).await?;
        if proposal.is_none() {
            debug!(%proposal_id, "Proposal gone before background task ran");
        }
        Ok(proposal)
    }

    async fn assess(&self, proposal_id: Uuid) -> Result<()> {
        let Some(proposal) = self.live_proposal(proposal_id).await? else {
            return Ok(());
        };
        let Some(rating) = self.assessor.rate_proposal(&proposal).await else {
            return Ok(());
        };

        let stored = self.repos.ai_ratings.upsert(&rating).await?;
        self.events.emit_lossy(TosEvent::AiRatingStored {
            proposal_id,
            flagged_for_review: stored.flagged_for_review,
            timestamp: stored.assessed_at,
        });

        if QualityAssessor::should_flag_for_moderation(&stored) {
            self.flags.flag_proposal(proposal_id, FlagReason::AiFlagged).await?;
        }
        Ok(())
    }

    async fn aggregate(&self, proposal_id: Uuid) -> Result<RatingAggregate> {
        let ratings = self.repos.ratings.list_for_proposal(proposal_id).await?;
        Ok(RatingAggregate::calculate(Some(proposal_id), &ratings))
    }

    async fn check_red_flags(&self, proposal_id: Uuid) -> Result<()> {
        let aggregate = self.aggregate(proposal_id).await?;
        self.flags
            .check_and_flag_proposal(proposal_id, aggregate.red_flag_count)
            .await?;
        Ok(())
    }

    async fn current_policy(&self) -> TrustPolicy {
        let Some(db) = &self.settings_db else {
            return self.policy.clone();
        };
        match resolve_trust_thresholds(db, &self.policy.thresholds).await {
            Ok(thresholds) => TrustPolicy::new(thresholds, self.policy.score_weights.clone()),
            Err(e) => {
                warn!(error = %e, "Could not read stored trust thresholds");
                self.policy.clone()
            }
        }
    }

    async fn index_proposal(&self, proposal_id: Uuid) -> Result<()> {
        let Some(index) = &self.index else {
            return Ok(());
        };
        let Some(proposal) = self.live_proposal(proposal_id).await? else {
            return Ok(());
        };

        let aggregate = self.aggregate(proposal_id).await?;
        let input = IndexContentInput {
            content_type: ContentType::Proposal,
            content_id: proposal.id.to_string(),
            url: proposal_url(proposal.id),
            title: proposal.title,
            summary: Some(proposal.summary),
            full_text: proposal.minority_report,
            author_id: Some(proposal.author_id),
            created_at: proposal.created_at,
            engagement: proposal_engagement(&aggregate),
        };

        let indexed = index.index_content(input, &self.current_policy().await).await?;
        self.emit_indexed(indexed.content_id, indexed.trust_tier);
        Ok(())
    }

    async fn refresh_engagement(&self, proposal_id: Uuid) -> Result<()> {
        let Some(index) = &self.index else {
            return Ok(());
        };

        let engagement = proposal_engagement(&self.aggregate(proposal_id).await?);
        let policy = self.current_policy().await;
        match index
            .update_engagement(ContentType::Proposal, &proposal_id.to_string(), engagement, &policy)
            .await
        {
            Ok(indexed) => {
                self.emit_indexed(indexed.content_id, indexed.trust_tier);
                Ok(())
            }
            Err(Error::NotFound(_)) => self.index_proposal(proposal_id).await,
            Err(e) => Err(e),
        }
    }

    async fn remove_from_index(&self, proposal_id: Uuid) -> Result<()> {
        let Some(index) = &self.index else {
            return Ok(());
        };
        let content_id = proposal_id.to_string();
        if index.remove_from_index(ContentType::Proposal, &content_id).await? {
            self.events.emit_lossy(TosEvent::ContentRemoved {
                content_type: ContentType::Proposal,
                content_id,
                timestamp: time::now(),
            });
        }
        Ok(())
    }

    fn emit_indexed(&self, content_id: String, trust_tier: tos_common::TrustTier) {
        self.events.emit_lossy(TosEvent::ContentIndexed {
            content_type: ContentType::Proposal,
            content_id,
            trust_tier,
            timestamp: time::now(),
        });
    }
}
