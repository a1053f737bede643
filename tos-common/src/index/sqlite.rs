//! SQLite content index
//!
//! Candidate rows are narrowed in SQL (type filter, tier filter, LIKE on any
//! query term) and ranked in Rust with the same function as the memory index.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use super::{query_terms, rank, ContentIndex, IndexContentInput, IndexedContent, SearchOptions, SearchPage};
use crate::db::{parse_enum, parse_uuid_opt, retry_on_lock};
use crate::db::retry::DEFAULT_MAX_LOCK_WAIT_MS;
use crate::models::ContentType;
use crate::time::{from_db, to_db};
use crate::trust::{ContentEngagement, TrustPolicy, TrustTier};
use crate::{Error, Result};

const SELECT_COLUMNS: &str = "SELECT content_type, content_id, url, title, summary, full_text, \
     author_id, created_at, indexed_at, vote_score, rating_avg, reply_count, participant_count, \
     total_sp, sp_allocator_count, trust_tier, trust_score FROM content_index";

#[derive(Clone)]
pub struct SqliteContentIndex {
    pool: SqlitePool,
}

impl SqliteContentIndex {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn save(&self, item: &IndexedContent) -> Result<()> {
        retry_on_lock("content index upsert", DEFAULT_MAX_LOCK_WAIT_MS, move || async move {
            sqlx::query(
                r#"
                INSERT INTO content_index (
                    content_type, content_id, url, title, summary, full_text, author_id,
                    created_at, indexed_at, vote_score, rating_avg, reply_count,
                    participant_count, total_sp, sp_allocator_count, trust_tier, trust_score
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(content_type, content_id) DO UPDATE SET
                    url = excluded.url,
                    title = excluded.title,
                    summary = excluded.summary,
                    full_text = excluded.full_text,
                    author_id = excluded.author_id,
                    created_at = excluded.created_at,
                    indexed_at = excluded.indexed_at,
                    vote_score = excluded.vote_score,
                    rating_avg = excluded.rating_avg,
                    reply_count = excluded.reply_count,
                    participant_count = excluded.participant_count,
                    total_sp = excluded.total_sp,
                    sp_allocator_count = excluded.sp_allocator_count,
                    trust_tier = excluded.trust_tier,
                    trust_score = excluded.trust_score
                "#,
            )
            .bind(item.content_type.as_str())
            .bind(&item.content_id)
            .bind(&item.url)
            .bind(&item.title)
            .bind(&item.summary)
            .bind(&item.full_text)
            .bind(item.author_id.map(|id| id.to_string()))
            .bind(to_db(&item.created_at))
            .bind(to_db(&item.indexed_at))
            .bind(item.engagement.vote_score)
            .bind(item.engagement.rating_avg)
            .bind(item.engagement.reply_count)
            .bind(item.engagement.participant_count)
            .bind(item.engagement.total_sp)
            .bind(item.engagement.sp_allocator_count)
            .bind(item.trust_tier.as_str())
            .bind(item.trust_score)
            .execute(&self.pool)
            .await?;
            Ok(())
        })
        .await
    }
}

fn row_to_content(row: &SqliteRow) -> Result<IndexedContent> {
    let content_type: String = row.try_get("content_type")?;
    let author_id: Option<String> = row.try_get("author_id")?;
    let created_at: String = row.try_get("created_at")?;
    let indexed_at: String = row.try_get("indexed_at")?;
    let trust_tier: String = row.try_get("trust_tier")?;

    Ok(IndexedContent {
        content_type: parse_enum(&content_type)?,
        content_id: row.try_get("content_id")?,
        url: row.try_get("url")?,
        title: row.try_get("title")?,
        summary: row.try_get("summary")?,
        full_text: row.try_get("full_text")?,
        author_id: parse_uuid_opt(author_id.as_deref())?,
        created_at: from_db(&created_at)?,
        indexed_at: from_db(&indexed_at)?,
        engagement: ContentEngagement {
            vote_score: row.try_get("vote_score")?,
            rating_avg: row.try_get("rating_avg")?,
            reply_count: row.try_get("reply_count")?,
            participant_count: row.try_get("participant_count")?,
            total_sp: row.try_get("total_sp")?,
            sp_allocator_count: row.try_get("sp_allocator_count")?,
        },
        trust_tier: parse_enum::<TrustTier>(&trust_tier)?,
        trust_score: row.try_get("trust_score")?,
    })
}

/// Escape LIKE wildcards in a user-supplied term
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait]
impl ContentIndex for SqliteContentIndex {
    async fn index_content(
        &self,
        input: IndexContentInput,
        policy: &TrustPolicy,
    ) -> Result<IndexedContent> {
        input.validate()?;
        let item = IndexedContent::from_input(input, policy, Utc::now());
        self.save(&item).await?;
        Ok(item)
    }

    async fn update_engagement(
        &self,
        content_type: ContentType,
        content_id: &str,
        engagement: ContentEngagement,
        policy: &TrustPolicy,
    ) -> Result<IndexedContent> {
        engagement.validate()?;
        let mut item = self.get(content_type, content_id).await?.ok_or_else(|| {
            Error::NotFound(format!("Indexed content {}/{}", content_type, content_id))
        })?;
        item.refresh(engagement, policy, Utc::now());
        self.save(&item).await?;
        Ok(item)
    }

    async fn remove_from_index(&self, content_type: ContentType, content_id: &str) -> Result<bool> {
        let result = retry_on_lock("content index delete", DEFAULT_MAX_LOCK_WAIT_MS, move || async move {
            Ok(sqlx::query("DELETE FROM content_index WHERE content_type = ? AND content_id = ?")
                .bind(content_type.as_str())
                .bind(content_id)
                .execute(&self.pool)
                .await?)
        })
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get(
        &self,
        content_type: ContentType,
        content_id: &str,
    ) -> Result<Option<IndexedContent>> {
        let sql = format!("{} WHERE content_type = ? AND content_id = ?", SELECT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(content_type.as_str())
            .bind(content_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_content).transpose()
    }

    async fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchPage> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_COLUMNS);
        builder.push(" WHERE 1 = 1");

        if !options.types.is_empty() {
            builder.push(" AND content_type IN (");
            let mut separated = builder.separated(", ");
            for content_type in &options.types {
                separated.push_bind(content_type.as_str());
            }
            separated.push_unseparated(")");
        }

        if let Some(min) = options.min_trust {
            builder.push(" AND trust_tier IN (");
            let mut separated = builder.separated(", ");
            for tier in TrustTier::ALL.iter().filter(|t| **t >= min) {
                separated.push_bind(tier.as_str());
            }
            separated.push_unseparated(")");
        }

        let terms = query_terms(query);
        if !terms.is_empty() {
            builder.push(" AND (");
            for (i, term) in terms.iter().enumerate() {
                if i > 0 {
                    builder.push(" OR ");
                }
                let pattern = like_pattern(term);
                builder.push("LOWER(title) LIKE ");
                builder.push_bind(pattern.clone());
                builder.push(" ESCAPE '\\' OR LOWER(COALESCE(summary, '')) LIKE ");
                builder.push_bind(pattern.clone());
                builder.push(" ESCAPE '\\' OR LOWER(COALESCE(full_text, '')) LIKE ");
                builder.push_bind(pattern);
                builder.push(" ESCAPE '\\'");
            }
            builder.push(")");
        }

        let rows = builder.build().fetch_all(&self.pool).await?;
        let candidates = rows.iter().map(row_to_content).collect::<Result<Vec<_>>>()?;

        Ok(rank(candidates, query, options))
    }

    async fn reclassify_all(&self, policy: &TrustPolicy) -> Result<usize> {
        let rows = sqlx::query(SELECT_COLUMNS).fetch_all(&self.pool).await?;
        let now = Utc::now();
        let mut count = 0;
        for row in &rows {
            let mut item = row_to_content(row)?;
            item.reassess(policy, now);
            let item = &item;
            retry_on_lock("content index reclassify", DEFAULT_MAX_LOCK_WAIT_MS, move || async move {
                sqlx::query(
                    "UPDATE content_index SET trust_tier = ?, trust_score = ? \
                     WHERE content_type = ? AND content_id = ?",
                )
                .bind(item.trust_tier.as_str())
                .bind(item.trust_score)
                .bind(item.content_type.as_str())
                .bind(&item.content_id)
                .execute(&self.pool)
                .await?;
                Ok(())
            })
            .await?;
            count += 1;
        }
        Ok(count)
    }
}
