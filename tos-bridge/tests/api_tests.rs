//! Integration tests for tos-bridge API endpoints
//!
//! Memory index behind the real router; threshold persistence uses an
//! in-memory SQLite settings table.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot`

use tos_bridge::{build_router, AppState};
use tos_common::db::init_memory_pool;
use tos_common::db::settings::get_trust_thresholds;
use tos_common::events::EventBus;
use tos_common::index::MemoryContentIndex;
use tos_common::TrustPolicy;

fn setup_app() -> Router {
    let state = AppState::new(
        Arc::new(MemoryContentIndex::new()),
        TrustPolicy::default(),
        EventBus::default(),
    );
    build_router(state)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Should parse JSON")
    };
    (status, value)
}

fn item(content_type: &str, id: &str, title: &str, engagement: Value) -> Value {
    json!({
        "content_type": content_type,
        "content_id": id,
        "url": format!("/{}/{}", content_type, id),
        "title": title,
        "summary": format!("{} summary", title),
        "created_at": (Utc::now() - Duration::hours(48)).to_rfc3339(),
        "engagement": engagement,
    })
}

async fn seed(app: &Router) {
    for body in [
        item("forum_topic", "t1", "Garden watering rota", json!({"vote_score": 4})),
        item("proposal", "p1", "Garden expansion", json!({"total_sp": 25, "sp_allocator_count": 5})),
        item("article", "a1", "Library hours", json!({})),
    ] {
        let (status, _) = send(app, "POST", "/api/index", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = setup_app();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "tos-bridge");
    assert_eq!(body["settings_store"], false);
}

#[tokio::test]
async fn test_index_classifies_item() {
    let app = setup_app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/index",
        Some(item("proposal", "p1", "Garden expansion", json!({"total_sp": 25}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["trust_tier"], "high");
    assert!(body["trust_score"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn test_index_rejects_blank_title() {
    let app = setup_app();
    let (status, body) = send(&app, "POST", "/api/index", Some(item("wiki", "w1", " ", json!({})))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_search_ranks_and_filters() {
    let app = setup_app();
    seed(&app).await;

    let (status, body) = send(&app, "GET", "/api/search?q=garden", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["page"], 1);
    assert_eq!(body["total_pages"], 1);
    // equal relevance, higher trust score first
    assert_eq!(body["results"][0]["content_id"], "p1");

    let (_, high_only) = send(&app, "GET", "/api/search?q=garden&min_trust=high", None).await;
    assert_eq!(high_only["total"], 1);
    assert_eq!(high_only["results"][0]["trust_tier"], "high");

    let (_, topics) = send(&app, "GET", "/api/search?q=garden&types=forum_topic", None).await;
    assert_eq!(topics["total"], 1);
    assert_eq!(topics["results"][0]["content_type"], "forum_topic");
}

#[tokio::test]
async fn test_search_pagination() {
    let app = setup_app();
    seed(&app).await;

    let (_, body) = send(&app, "GET", "/api/search?q=garden&limit=1&page=2", None).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["page_size"], 1);
    assert_eq!(body["total_pages"], 2);
    assert_eq!(body["results"].as_array().unwrap().len(), 1);
    assert_eq!(body["results"][0]["content_id"], "t1");
}

#[tokio::test]
async fn test_search_page_far_past_the_end_is_empty() {
    let app = setup_app();
    seed(&app).await;

    let uri = format!("/api/search?q=garden&limit=20&page={}", usize::MAX);
    let (status, body) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["results"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_search_rejects_unknown_filters() {
    let app = setup_app();
    let (status, _) = send(&app, "GET", "/api/search?q=x&min_trust=excellent", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, "GET", "/api/search?q=x&types=podcast", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_context_block() {
    let app = setup_app();
    seed(&app).await;

    let (status, body) = send(&app, "GET", "/api/context?q=garden", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    let block = body["block"].as_str().unwrap();
    assert!(block.starts_with("**LIVE COMMUNITY CONTENT:**"));
    assert!(block.contains("[PROPOSAL: Garden expansion]"));
    assert!(block.contains("25 SP from 5 members"));
    assert!(block.contains("URL: /forum_topic/t1"));

    let (_, empty) = send(&app, "GET", "/api/context?q=volcano", None).await;
    assert_eq!(empty["count"], 0);
    assert_eq!(empty["block"], "");

    let (status, _) = send(&app, "GET", "/api/context?q=", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_engagement_update_reclassifies() {
    let app = setup_app();
    seed(&app).await;

    let (status, body) = send(
        &app,
        "PUT",
        "/api/index/article/a1/engagement",
        Some(json!({"vote_score": 25, "participant_count": 12, "total_sp": 60, "sp_allocator_count": 8})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["trust_tier"], "consensus");

    let (status, _) = send(&app, "PUT", "/api/index/article/missing/engagement", Some(json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "PUT", "/api/index/podcast/a1/engagement", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_extreme_engagement_is_classified_without_overflow() {
    let app = setup_app();
    let engagement = json!({
        "vote_score": 3,
        "total_sp": i64::MAX / 2 + 1,
        "sp_allocator_count": i64::MAX,
        "participant_count": 12,
    });
    let (status, body) = send(&app, "POST", "/api/index", Some(item("proposal", "p9", "Solar roof", engagement))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["trust_tier"], "consensus");

    let (status, body) = send(
        &app,
        "PUT",
        "/api/index/proposal/p9/engagement",
        Some(json!({"vote_score": i64::MAX, "total_sp": i64::MAX})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["trust_tier"], "high");
}

#[tokio::test]
async fn test_negative_engagement_counts_rejected() {
    let app = setup_app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/index",
        Some(item("forum_post", "fp1", "Bike racks", json!({"reply_count": -2}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    seed(&app).await;
    let (status, _) = send(
        &app,
        "PUT",
        "/api/index/forum_topic/t1/engagement",
        Some(json!({"participant_count": -1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = send(&app, "GET", "/api/search?q=watering", None).await;
    assert_eq!(body["results"][0]["trust_tier"], "medium");
}

#[tokio::test]
async fn test_remove_from_index() {
    let app = setup_app();
    seed(&app).await;

    let (status, _) = send(&app, "DELETE", "/api/index/proposal/p1", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "DELETE", "/api/index/proposal/p1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&app, "GET", "/api/search?q=garden", None).await;
    assert_eq!(body["total"], 1);
}

#[tokio::test]
async fn test_threshold_change_persists_and_reclassifies() {
    let pool = init_memory_pool().await.unwrap();
    let state = AppState::new(
        Arc::new(MemoryContentIndex::new()),
        TrustPolicy::default(),
        EventBus::default(),
    )
    .with_settings(pool.clone());
    let app = build_router(state);
    seed(&app).await;

    let (_, mut thresholds) = send(&app, "GET", "/api/trust/thresholds", None).await;
    assert_eq!(thresholds["medium"]["min_votes"], 3);

    thresholds["medium"]["min_votes"] = json!(10);
    let (status, body) = send(&app, "PUT", "/api/trust/thresholds", Some(thresholds)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reclassified"], 3);

    let stored = get_trust_thresholds(&pool).await.unwrap().unwrap();
    assert_eq!(stored.medium.min_votes, 10);

    // four votes no longer reach medium
    let (_, body) = send(&app, "GET", "/api/search?q=watering", None).await;
    assert_eq!(body["results"][0]["trust_tier"], "low");
}

#[tokio::test]
async fn test_invalid_thresholds_rejected() {
    let app = setup_app();
    let (_, mut thresholds) = send(&app, "GET", "/api/trust/thresholds", None).await;
    thresholds["high"]["min_sp"] = json!(-1);

    let (status, _) = send(&app, "PUT", "/api/trust/thresholds", Some(thresholds)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, current) = send(&app, "GET", "/api/trust/thresholds", None).await;
    assert_eq!(current["high"]["min_sp"], 20);
}
