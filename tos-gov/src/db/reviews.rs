//! Moderation review persistence
//!
//! The unique index on `proposal_id` makes `insert_if_absent` safe across
//! processes, not just within one.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::ModerationReview;
use crate::repo::ModerationRepo;
use tos_common::db::retry::DEFAULT_MAX_LOCK_WAIT_MS;
use tos_common::db::{as_bool, parse_enum, parse_uuid, parse_uuid_opt, retry_on_lock};
use tos_common::models::ModerationStatus;
use tos_common::time::{from_db, from_db_opt, to_db};
use tos_common::{Error, Result};

const SELECT_COLUMNS: &str = "SELECT id, proposal_id, flag_reason, status, moderator_id, \
     moderator_notes, action, author_notified, flagged_at, reviewed_at, appeal_text, appealed_at, \
     appeal_moderator_id, appeal_reviewed_at FROM moderation_reviews";

pub struct SqliteModerationRepo {
    pool: SqlitePool,
}

impl SqliteModerationRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn row_to_review(row: &SqliteRow) -> Result<ModerationReview> {
    let id: String = row.try_get("id")?;
    let proposal_id: String = row.try_get("proposal_id")?;
    let flag_reason: String = row.try_get("flag_reason")?;
    let status: String = row.try_get("status")?;
    let moderator_id: Option<String> = row.try_get("moderator_id")?;
    let action: Option<String> = row.try_get("action")?;
    let flagged_at: String = row.try_get("flagged_at")?;
    let reviewed_at: Option<String> = row.try_get("reviewed_at")?;
    let appealed_at: Option<String> = row.try_get("appealed_at")?;
    let appeal_moderator_id: Option<String> = row.try_get("appeal_moderator_id")?;
    let appeal_reviewed_at: Option<String> = row.try_get("appeal_reviewed_at")?;

    Ok(ModerationReview {
        id: parse_uuid(&id)?,
        proposal_id: parse_uuid(&proposal_id)?,
        flag_reason: parse_enum(&flag_reason)?,
        status: parse_enum(&status)?,
        moderator_id: parse_uuid_opt(moderator_id.as_deref())?,
        moderator_notes: row.try_get("moderator_notes")?,
        action: action.as_deref().map(parse_enum).transpose()?,
        author_notified: as_bool(row.try_get("author_notified")?),
        flagged_at: from_db(&flagged_at)?,
        reviewed_at: from_db_opt(reviewed_at.as_deref())?,
        appeal_text: row.try_get("appeal_text")?,
        appealed_at: from_db_opt(appealed_at.as_deref())?,
        appeal_moderator_id: parse_uuid_opt(appeal_moderator_id.as_deref())?,
        appeal_reviewed_at: from_db_opt(appeal_reviewed_at.as_deref())?,
    })
}

#[async_trait]
impl ModerationRepo for SqliteModerationRepo {
    async fn insert_if_absent(&self, review: &ModerationReview) -> Result<(ModerationReview, bool)> {
        let pool = &self.pool;
        let inserted = retry_on_lock("review insert", DEFAULT_MAX_LOCK_WAIT_MS, move || async move {
            let result = sqlx::query(
                r#"
                INSERT INTO moderation_reviews (
                    id, proposal_id, flag_reason, status, author_notified, flagged_at
                ) VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(proposal_id) DO NOTHING
                "#,
            )
            .bind(review.id.to_string())
            .bind(review.proposal_id.to_string())
            .bind(review.flag_reason.as_str())
            .bind(review.status.as_str())
            .bind(review.author_notified)
            .bind(to_db(&review.flagged_at))
            .execute(pool)
            .await?;
            Ok(result.rows_affected() > 0)
        })
        .await?;

        let stored = self.find_by_proposal(review.proposal_id).await?.ok_or_else(|| {
            Error::Internal(format!("Review for proposal {} vanished", review.proposal_id))
        })?;
        Ok((stored, inserted))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ModerationReview>> {
        let sql = format!("{} WHERE id = ?", SELECT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_review).transpose()
    }

    async fn find_by_proposal(&self, proposal_id: Uuid) -> Result<Option<ModerationReview>> {
        let sql = format!("{} WHERE proposal_id = ?", SELECT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(proposal_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_review).transpose()
    }

    async fn update(&self, review: &ModerationReview) -> Result<()> {
        let pool = &self.pool;
        let affected = retry_on_lock("review update", DEFAULT_MAX_LOCK_WAIT_MS, move || async move {
            let result = sqlx::query(
                r#"
                UPDATE moderation_reviews SET
                    status = ?, moderator_id = ?, moderator_notes = ?, action = ?,
                    author_notified = ?, reviewed_at = ?, appeal_text = ?, appealed_at = ?,
                    appeal_moderator_id = ?, appeal_reviewed_at = ?
                WHERE id = ?
                "#,
            )
            .bind(review.status.as_str())
            .bind(review.moderator_id.map(|id| id.to_string()))
            .bind(&review.moderator_notes)
            .bind(review.action.map(|a| a.as_str()))
            .bind(review.author_notified)
            .bind(review.reviewed_at.as_ref().map(to_db))
            .bind(&review.appeal_text)
            .bind(review.appealed_at.as_ref().map(to_db))
            .bind(review.appeal_moderator_id.map(|id| id.to_string()))
            .bind(review.appeal_reviewed_at.as_ref().map(to_db))
            .bind(review.id.to_string())
            .execute(pool)
            .await?;
            Ok(result.rows_affected())
        })
        .await?;

        if affected == 0 {
            return Err(Error::NotFound(format!("Moderation review {}", review.id)));
        }
        Ok(())
    }

    async fn list_by_status(&self, status: ModerationStatus) -> Result<Vec<ModerationReview>> {
        let sql = format!("{} WHERE status = ? ORDER BY flagged_at ASC, id ASC", SELECT_COLUMNS);
        let rows = sqlx::query(&sql)
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_review).collect()
    }
}
