//! Member rating persistence

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::Rating;
use crate::repo::RatingRepo;
use tos_common::db::retry::DEFAULT_MAX_LOCK_WAIT_MS;
use tos_common::db::{as_bool, parse_uuid, retry_on_lock};
use tos_common::time::{from_db, to_db};
use tos_common::{Error, Result};

const SELECT_COLUMNS: &str = "SELECT id, proposal_id, member_id, clarity, importance, urgency, \
     is_innovative, constructiveness, feedback, rated_at, updated_at FROM proposal_ratings";

pub struct SqliteRatingRepo {
    pool: SqlitePool,
}

impl SqliteRatingRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn small(row: &SqliteRow, column: &str) -> Result<u8> {
    let value: i64 = row.try_get(column)?;
    u8::try_from(value).map_err(|_| Error::Internal(format!("Stored {} out of range: {}", column, value)))
}

fn row_to_rating(row: &SqliteRow) -> Result<Rating> {
    let id: String = row.try_get("id")?;
    let proposal_id: String = row.try_get("proposal_id")?;
    let member_id: String = row.try_get("member_id")?;
    let rated_at: String = row.try_get("rated_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(Rating {
        id: parse_uuid(&id)?,
        proposal_id: parse_uuid(&proposal_id)?,
        member_id: parse_uuid(&member_id)?,
        clarity: small(row, "clarity")?,
        importance: small(row, "importance")?,
        urgency: small(row, "urgency")?,
        is_innovative: as_bool(row.try_get("is_innovative")?),
        constructiveness: small(row, "constructiveness")?,
        feedback: row.try_get("feedback")?,
        rated_at: from_db(&rated_at)?,
        updated_at: from_db(&updated_at)?,
    })
}

#[async_trait]
impl RatingRepo for SqliteRatingRepo {
    async fn upsert(&self, rating: &Rating) -> Result<Rating> {
        let pool = &self.pool;
        retry_on_lock("rating upsert", DEFAULT_MAX_LOCK_WAIT_MS, move || async move {
            sqlx::query(
                r#"
                INSERT INTO proposal_ratings (
                    id, proposal_id, member_id, clarity, importance, urgency,
                    is_innovative, constructiveness, feedback, rated_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(proposal_id, member_id) DO UPDATE SET
                    clarity = excluded.clarity,
                    importance = excluded.importance,
                    urgency = excluded.urgency,
                    is_innovative = excluded.is_innovative,
                    constructiveness = excluded.constructiveness,
                    feedback = excluded.feedback,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(rating.id.to_string())
            .bind(rating.proposal_id.to_string())
            .bind(rating.member_id.to_string())
            .bind(rating.clarity as i64)
            .bind(rating.importance as i64)
            .bind(rating.urgency as i64)
            .bind(rating.is_innovative)
            .bind(rating.constructiveness as i64)
            .bind(&rating.feedback)
            .bind(to_db(&rating.rated_at))
            .bind(to_db(&rating.updated_at))
            .execute(pool)
            .await?;
            Ok(())
        })
        .await?;

        self.find_by_member(rating.proposal_id, rating.member_id)
            .await?
            .ok_or_else(|| Error::Internal(format!("Rating {} vanished after upsert", rating.id)))
    }

    async fn find_by_member(&self, proposal_id: Uuid, member_id: Uuid) -> Result<Option<Rating>> {
        let sql = format!("{} WHERE proposal_id = ? AND member_id = ?", SELECT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(proposal_id.to_string())
            .bind(member_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_rating).transpose()
    }

    async fn list_for_proposal(&self, proposal_id: Uuid) -> Result<Vec<Rating>> {
        let sql = format!("{} WHERE proposal_id = ? ORDER BY rated_at ASC", SELECT_COLUMNS);
        let rows = sqlx::query(&sql)
            .bind(proposal_id.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_rating).collect()
    }
}
