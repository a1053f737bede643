//! End-to-end background pipeline: proposal creation, AI assessment,
//! community red flags, moderation queue and content indexing

use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use tos_common::events::EventBus;
use tos_common::index::{ContentIndex, MemoryContentIndex};
use tos_common::models::{ContentType, FlagReason, ModerationStatus, ScopeType};
use tos_common::policy::UrgencyWeights;
use tos_common::TrustPolicy;
use tos_gov::db::init_memory_pool;
use tos_gov::domain::{NewProposal, RatingInput};
use tos_gov::llm::MockLlmClient;
use tos_gov::repo::Repos;
use tos_gov::services::{FlagManager, ProposalService, QualityAssessor, QueuePrioritizer, RatingService};
use tos_gov::worker::{BackgroundWorker, Task, TaskQueue};

struct Pipeline {
    proposals: ProposalService,
    ratings: RatingService,
    queue: QueuePrioritizer,
    flags: FlagManager,
    worker: BackgroundWorker,
    index: Arc<MemoryContentIndex>,
    rx: mpsc::Receiver<Task>,
}

impl Pipeline {
    fn new(llm_response: &str) -> Self {
        Self::with_repos(Repos::in_memory(), llm_response)
    }

    fn with_repos(repos: Repos, llm_response: &str) -> Self {
        let events = EventBus::new(100);
        let (tasks, rx) = TaskQueue::channel(100);
        let flags = FlagManager::new(repos.reviews.clone(), events.clone());
        let assessor = QualityAssessor::new(Some(Arc::new(MockLlmClient::with_response(llm_response))));
        let index = Arc::new(MemoryContentIndex::default());

        let worker = BackgroundWorker::new(repos.clone(), assessor, flags.clone(), events.clone())
            .with_index(index.clone(), TrustPolicy::default());

        Self {
            proposals: ProposalService::new(repos.clone(), tasks.clone(), events.clone()),
            ratings: RatingService::new(repos.clone(), tasks, events),
            queue: QueuePrioritizer::new(repos, UrgencyWeights::default()),
            flags,
            worker,
            index,
            rx,
        }
    }

    /// Run every queued task to completion, including tasks they enqueue
    async fn drain(&mut self) {
        while let Ok(task) = self.rx.try_recv() {
            self.worker.run_task(task).await.unwrap();
        }
    }

    async fn create(&self, title: &str) -> Uuid {
        let author = Uuid::new_v4();
        self.proposals
            .create(NewProposal {
                scope_type: ScopeType::Individual,
                scope_id: author,
                author_id: author,
                title: title.to_string(),
                summary: "Convert the empty lot into shared garden beds.".to_string(),
            })
            .await
            .unwrap()
            .id
    }

    async fn rate(&self, proposal_id: Uuid, constructiveness: u8) {
        self.ratings
            .submit_rating(
                proposal_id,
                Uuid::new_v4(),
                RatingInput {
                    clarity: 2,
                    importance: 3,
                    urgency: 3,
                    is_innovative: false,
                    constructiveness,
                    feedback: None,
                },
            )
            .await
            .unwrap();
    }
}

const CONSTRUCTIVE: &str = r#"{"clarity": 3, "constructiveness": 3, "flaggedForReview": false, "issues": []}"#;
const HOSTILE: &str = r#"```json
{"clarity": 2, "constructiveness": 1, "flaggedForReview": true, "issues": ["personal attack"]}
```"#;

#[tokio::test]
async fn test_constructive_proposal_is_indexed_not_flagged() {
    let mut p = Pipeline::new(CONSTRUCTIVE);
    let id = p.create("Community garden").await;
    p.drain().await;

    assert!(p.queue.get_queue(ModerationStatus::Pending).await.unwrap().is_empty());

    let indexed = p
        .index
        .get(ContentType::Proposal, &id.to_string())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(indexed.title, "Community garden");
    assert_eq!(indexed.url, format!("/governance/{}", id));
}

#[tokio::test]
async fn test_hostile_assessment_opens_ai_review() {
    let mut p = Pipeline::new(HOSTILE);
    let id = p.create("Community garden").await;
    p.drain().await;

    let queue = p.queue.get_queue(ModerationStatus::Pending).await.unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].proposal_id, id);
    assert_eq!(queue[0].flag_reason, FlagReason::AiFlagged);
    let ai = queue[0].ai_assessment.as_ref().unwrap();
    assert_eq!(ai.constructiveness, 1);
    // reason weight plus the red-constructiveness bonus
    assert!(queue[0].urgency_score >= 60.0);
}

#[tokio::test]
async fn test_red_ratings_escalate_and_rank_first() {
    let mut p = Pipeline::new(CONSTRUCTIVE);
    let calm = p.create("Community garden").await;
    let contested = p.create("Close the library").await;
    p.drain().await;

    p.rate(calm, 1).await;
    for _ in 0..5 {
        p.rate(contested, 1).await;
    }
    p.drain().await;

    let queue = p.queue.get_queue(ModerationStatus::Pending).await.unwrap();
    assert_eq!(queue.len(), 2);
    assert_eq!(queue[0].proposal_id, contested);
    // red flags are counted when the check runs, after all five landed
    assert_eq!(queue[0].flag_reason, FlagReason::MultipleConcerns);
    assert_eq!(queue[0].community_ratings.as_ref().unwrap().red_flag_count, 5);
    assert_eq!(queue[1].proposal_id, calm);
    assert_eq!(queue[1].flag_reason, FlagReason::MemberRedRating);
}

#[tokio::test]
async fn test_ratings_refresh_index_engagement() {
    let mut p = Pipeline::new(CONSTRUCTIVE);
    let id = p.create("Community garden").await;
    p.drain().await;

    p.rate(id, 3).await;
    p.rate(id, 2).await;
    p.drain().await;

    let indexed = p
        .index
        .get(ContentType::Proposal, &id.to_string())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(indexed.engagement.participant_count, 2);
}

#[tokio::test]
async fn test_deleted_proposal_leaves_index() {
    let mut p = Pipeline::new(CONSTRUCTIVE);
    let id = p.create("Community garden").await;
    p.drain().await;

    let author = p.proposals.get(id).await.unwrap().author_id;
    p.proposals.delete(id, author).await.unwrap();
    p.drain().await;

    assert!(p
        .index
        .get(ContentType::Proposal, &id.to_string())
        .await
        .unwrap()
        .is_none());
}

async fn assert_deleted_proposal_leaves_queue(mut p: Pipeline) {
    let kept = p.create("Community garden").await;
    let removed = p.create("Close the library").await;
    p.drain().await;

    p.flags.flag_proposal(kept, FlagReason::ManualReport).await.unwrap();
    p.flags.flag_proposal(removed, FlagReason::ManualReport).await.unwrap();
    assert_eq!(p.queue.get_queue(ModerationStatus::Pending).await.unwrap().len(), 2);

    let author = p.proposals.get(removed).await.unwrap().author_id;
    p.proposals.delete(removed, author).await.unwrap();
    p.drain().await;

    let queue = p.queue.get_queue(ModerationStatus::Pending).await.unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].proposal_id, kept);
}

#[tokio::test]
async fn test_deleted_proposal_leaves_queue_in_memory() {
    assert_deleted_proposal_leaves_queue(Pipeline::new(CONSTRUCTIVE)).await;
}

#[tokio::test]
async fn test_deleted_proposal_leaves_queue_in_sqlite() {
    let pool = init_memory_pool().await.expect("schema");
    assert_deleted_proposal_leaves_queue(Pipeline::with_repos(Repos::sqlite(pool), CONSTRUCTIVE)).await;
}
