//! SQLite repository tests against an in-memory database

use chrono::Utc;
use uuid::Uuid;

use tos_common::models::{
    FlagReason, ModerationAction, ModerationStatus, ProposalStatus, ReviewDecision, ScopeType,
};
use tos_gov::db::init_memory_pool;
use tos_gov::domain::{AiRating, ModerationReview, NewProposal, Proposal, Rating, RatingInput};
use tos_gov::repo::{ProposalFilter, Repos};

async fn repos() -> Repos {
    let pool = init_memory_pool().await.expect("schema");
    Repos::sqlite(pool)
}

fn proposal(author: Uuid, title: &str) -> Proposal {
    Proposal::create(NewProposal {
        scope_type: ScopeType::Individual,
        scope_id: author,
        author_id: author,
        title: title.to_string(),
        summary: "Convert the empty lot into shared garden beds.".to_string(),
    })
    .unwrap()
}

fn input(clarity: u8, constructiveness: u8) -> RatingInput {
    RatingInput {
        clarity,
        importance: 3,
        urgency: 2,
        is_innovative: false,
        constructiveness,
        feedback: None,
    }
}

#[tokio::test]
async fn test_proposal_save_and_reload() {
    let repos = repos().await;
    let p = proposal(Uuid::new_v4(), "Community garden");
    repos.proposals.save(&p).await.unwrap();

    let loaded = repos.proposals.find_by_id(p.id).await.unwrap().unwrap();
    assert_eq!(loaded.id, p.id);
    assert_eq!(loaded.title, p.title);
    assert_eq!(loaded.status, ProposalStatus::Draft);
    assert_eq!(loaded.scope_type, ScopeType::Individual);
    assert!(!loaded.bridge_similarity_check_done);

    let research = loaded.transition_to(ProposalStatus::Research).unwrap();
    repos.proposals.save(&research).await.unwrap();
    let reloaded = repos.proposals.find_by_id(p.id).await.unwrap().unwrap();
    assert_eq!(reloaded.status, ProposalStatus::Research);
}

#[tokio::test]
async fn test_soft_deleted_proposal_hidden() {
    let repos = repos().await;
    let p = proposal(Uuid::new_v4(), "Community garden");
    repos.proposals.save(&p).await.unwrap();
    repos.proposals.save(&p.delete()).await.unwrap();

    assert!(repos.proposals.find_by_id(p.id).await.unwrap().is_none());
    assert_eq!(repos.proposals.count(&ProposalFilter::default()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_list_filters_and_count() {
    let repos = repos().await;
    let author = Uuid::new_v4();
    for n in 0..3 {
        repos.proposals.save(&proposal(author, &format!("Garden {}", n))).await.unwrap();
    }
    repos.proposals.save(&proposal(Uuid::new_v4(), "Other")).await.unwrap();

    let filter = ProposalFilter {
        author_id: Some(author),
        limit: Some(2),
        ..Default::default()
    };
    assert_eq!(repos.proposals.count(&filter).await.unwrap(), 3);
    let page = repos.proposals.list(&filter).await.unwrap();
    assert_eq!(page.len(), 2);
    assert!(page.iter().all(|p| p.author_id == author));

    let drafts = ProposalFilter {
        status: Some(ProposalStatus::Research),
        ..Default::default()
    };
    assert_eq!(repos.proposals.count(&drafts).await.unwrap(), 0);
}

#[tokio::test]
async fn test_list_offset_past_the_end_is_empty() {
    let repos = repos().await;
    repos.proposals.save(&proposal(Uuid::new_v4(), "Garden")).await.unwrap();

    let filter = ProposalFilter {
        offset: Some(usize::MAX),
        limit: Some(1),
        ..Default::default()
    };
    assert!(repos.proposals.list(&filter).await.unwrap().is_empty());
    assert_eq!(filter.page(), usize::MAX);
}

#[tokio::test]
async fn test_rating_upsert_keeps_identity() {
    let repos = repos().await;
    let p = proposal(Uuid::new_v4(), "Community garden");
    repos.proposals.save(&p).await.unwrap();
    let member = Uuid::new_v4();

    let first = repos
        .ratings
        .upsert(&Rating::new(p.id, member, input(1, 1), Utc::now()))
        .await
        .unwrap();

    // A fresh id from a second writer must not replace the stored one
    let second = repos
        .ratings
        .upsert(&Rating::new(p.id, member, input(3, 3), Utc::now()))
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.clarity, 3);
    assert_eq!(second.constructiveness, 3);
    assert_eq!(repos.ratings.list_for_proposal(p.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_ai_rating_lists_round_trip() {
    let repos = repos().await;
    let p = proposal(Uuid::new_v4(), "Community garden");
    repos.proposals.save(&p).await.unwrap();

    let rating = AiRating {
        id: Uuid::new_v4(),
        proposal_id: p.id,
        clarity: 2,
        constructiveness: 2,
        flagged_for_review: false,
        reasoning: Some("Somewhat sharp".into()),
        issues: vec!["tone".into(), "scope".into()],
        suggestions: vec!["soften wording".into()],
        confidence: Some(0.7),
        assessed_at: Utc::now(),
    };
    repos.ai_ratings.upsert(&rating).await.unwrap();

    let replacement = AiRating {
        id: Uuid::new_v4(),
        clarity: 3,
        issues: Vec::new(),
        ..rating.clone()
    };
    repos.ai_ratings.upsert(&replacement).await.unwrap();

    let stored = repos.ai_ratings.find_by_proposal(p.id).await.unwrap().unwrap();
    assert_eq!(stored.clarity, 3);
    assert!(stored.issues.is_empty());
    assert_eq!(stored.suggestions, vec!["soften wording".to_string()]);
    assert_eq!(stored.confidence, Some(0.7));
}

#[tokio::test]
async fn test_review_insert_if_absent() {
    let repos = repos().await;
    let p = proposal(Uuid::new_v4(), "Community garden");
    repos.proposals.save(&p).await.unwrap();

    let first = ModerationReview::open(p.id, FlagReason::AiFlagged, Utc::now());
    let (stored, created) = repos.reviews.insert_if_absent(&first).await.unwrap();
    assert!(created);
    assert_eq!(stored.id, first.id);

    let second = ModerationReview::open(p.id, FlagReason::ManualReport, Utc::now());
    let (stored, created) = repos.reviews.insert_if_absent(&second).await.unwrap();
    assert!(!created);
    assert_eq!(stored.id, first.id);
    assert_eq!(stored.flag_reason, FlagReason::AiFlagged);

    let pending = repos.reviews.list_by_status(ModerationStatus::Pending).await.unwrap();
    assert_eq!(pending.len(), 1);
}

#[tokio::test]
async fn test_review_update_requires_existing_row() {
    let repos = repos().await;
    let orphan = ModerationReview::open(Uuid::new_v4(), FlagReason::AiFlagged, Utc::now());
    assert!(repos.reviews.update(&orphan).await.is_err());
}

#[tokio::test]
async fn test_review_keeps_both_moderators() {
    let repos = repos().await;
    let p = proposal(Uuid::new_v4(), "Community garden");
    repos.proposals.save(&p).await.unwrap();
    let (review, _) = repos
        .reviews
        .insert_if_absent(&ModerationReview::open(p.id, FlagReason::ManualReport, Utc::now()))
        .await
        .unwrap();

    let first = Uuid::new_v4();
    let second = Uuid::new_v4();
    let decided = review
        .review(first, ReviewDecision::Approve, ModerationAction::EditRequired, None, Utc::now())
        .unwrap()
        .appeal("The edit request was unfair".into(), Utc::now())
        .unwrap()
        .review_appeal(second, ReviewDecision::Reject, None, Utc::now())
        .unwrap();
    repos.reviews.update(&decided).await.unwrap();

    let stored = repos.reviews.find_by_id(review.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ModerationStatus::AppealRejected);
    assert_eq!(stored.moderator_id, Some(first));
    assert_eq!(stored.appeal_moderator_id, Some(second));
}
