//! AI assessment persistence
//!
//! `issues` and `suggestions` are stored as JSON arrays.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::AiRating;
use crate::repo::AiRatingRepo;
use tos_common::db::retry::DEFAULT_MAX_LOCK_WAIT_MS;
use tos_common::db::{as_bool, parse_uuid, retry_on_lock};
use tos_common::time::{from_db, to_db};
use tos_common::{Error, Result};

pub struct SqliteAiRatingRepo {
    pool: SqlitePool,
}

impl SqliteAiRatingRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn to_json(list: &[String]) -> Result<String> {
    serde_json::to_string(list).map_err(|e| Error::Internal(format!("Serialize list failed: {}", e)))
}

fn from_json(text: Option<String>) -> Result<Vec<String>> {
    match text {
        Some(text) => serde_json::from_str(&text)
            .map_err(|e| Error::Internal(format!("Corrupt stored list: {}", e))),
        None => Ok(Vec::new()),
    }
}

fn row_to_ai_rating(row: &SqliteRow) -> Result<AiRating> {
    let id: String = row.try_get("id")?;
    let proposal_id: String = row.try_get("proposal_id")?;
    let clarity: i64 = row.try_get("clarity")?;
    let constructiveness: i64 = row.try_get("constructiveness")?;
    let assessed_at: String = row.try_get("assessed_at")?;

    Ok(AiRating {
        id: parse_uuid(&id)?,
        proposal_id: parse_uuid(&proposal_id)?,
        clarity: clarity.clamp(0, u8::MAX as i64) as u8,
        constructiveness: constructiveness.clamp(0, u8::MAX as i64) as u8,
        flagged_for_review: as_bool(row.try_get("flagged_for_review")?),
        reasoning: row.try_get("reasoning")?,
        issues: from_json(row.try_get("issues")?)?,
        suggestions: from_json(row.try_get("suggestions")?)?,
        confidence: row.try_get("confidence")?,
        assessed_at: from_db(&assessed_at)?,
    })
}

#[async_trait]
impl AiRatingRepo for SqliteAiRatingRepo {
    async fn upsert(&self, rating: &AiRating) -> Result<AiRating> {
        let issues = to_json(&rating.issues)?;
        let suggestions = to_json(&rating.suggestions)?;
        let pool = &self.pool;
        let (issues, suggestions) = (&issues, &suggestions);

        retry_on_lock("ai rating upsert", DEFAULT_MAX_LOCK_WAIT_MS, move || async move {
            sqlx::query(
                r#"
                INSERT INTO ai_ratings (
                    id, proposal_id, clarity, constructiveness, flagged_for_review,
                    reasoning, issues, suggestions, confidence, assessed_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(proposal_id) DO UPDATE SET
                    id = excluded.id,
                    clarity = excluded.clarity,
                    constructiveness = excluded.constructiveness,
                    flagged_for_review = excluded.flagged_for_review,
                    reasoning = excluded.reasoning,
                    issues = excluded.issues,
                    suggestions = excluded.suggestions,
                    confidence = excluded.confidence,
                    assessed_at = excluded.assessed_at
                "#,
            )
            .bind(rating.id.to_string())
            .bind(rating.proposal_id.to_string())
            .bind(rating.clarity as i64)
            .bind(rating.constructiveness as i64)
            .bind(rating.flagged_for_review)
            .bind(&rating.reasoning)
            .bind(issues)
            .bind(suggestions)
            .bind(rating.confidence)
            .bind(to_db(&rating.assessed_at))
            .execute(pool)
            .await?;
            Ok(())
        })
        .await?;

        Ok(rating.clone())
    }

    async fn find_by_proposal(&self, proposal_id: Uuid) -> Result<Option<AiRating>> {
        let row = sqlx::query(
            "SELECT id, proposal_id, clarity, constructiveness, flagged_for_review, reasoning, \
             issues, suggestions, confidence, assessed_at FROM ai_ratings WHERE proposal_id = ?",
        )
        .bind(proposal_id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_ai_rating).transpose()
    }
}
