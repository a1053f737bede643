//! Proposal persistence

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::domain::Proposal;
use crate::repo::{ProposalFilter, ProposalRepo};
use tos_common::db::retry::DEFAULT_MAX_LOCK_WAIT_MS;
use tos_common::db::{as_bool, parse_enum, parse_uuid, retry_on_lock};
use tos_common::time::{from_db, from_db_opt, to_db};
use tos_common::Result;

const SELECT_COLUMNS: &str = "SELECT id, scope_type, scope_id, author_id, title, summary, status, \
     minority_report, decided_at, decision_outcome, bridge_similarity_check_done, created_at, \
     updated_at, deleted_at FROM proposals";

pub struct SqliteProposalRepo {
    pool: SqlitePool,
}

impl SqliteProposalRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn row_to_proposal(row: &SqliteRow) -> Result<Proposal> {
    let id: String = row.try_get("id")?;
    let scope_type: String = row.try_get("scope_type")?;
    let scope_id: String = row.try_get("scope_id")?;
    let author_id: String = row.try_get("author_id")?;
    let status: String = row.try_get("status")?;
    let decided_at: Option<String> = row.try_get("decided_at")?;
    let decision_outcome: Option<String> = row.try_get("decision_outcome")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;
    let deleted_at: Option<String> = row.try_get("deleted_at")?;

    Ok(Proposal {
        id: parse_uuid(&id)?,
        scope_type: parse_enum(&scope_type)?,
        scope_id: parse_uuid(&scope_id)?,
        author_id: parse_uuid(&author_id)?,
        title: row.try_get("title")?,
        summary: row.try_get("summary")?,
        status: parse_enum(&status)?,
        minority_report: row.try_get("minority_report")?,
        decided_at: from_db_opt(decided_at.as_deref())?,
        decision_outcome: decision_outcome.as_deref().map(parse_enum).transpose()?,
        bridge_similarity_check_done: as_bool(row.try_get("bridge_similarity_check_done")?),
        created_at: from_db(&created_at)?,
        updated_at: from_db(&updated_at)?,
        deleted_at: from_db_opt(deleted_at.as_deref())?,
    })
}

/// Append the filter's WHERE clause
fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &ProposalFilter) {
    builder.push(" WHERE deleted_at IS NULL");
    if let Some(scope_type) = filter.scope_type {
        builder.push(" AND scope_type = ").push_bind(scope_type.as_str());
    }
    if let Some(scope_id) = filter.scope_id {
        builder.push(" AND scope_id = ").push_bind(scope_id.to_string());
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(author_id) = filter.author_id {
        builder.push(" AND author_id = ").push_bind(author_id.to_string());
    }
}

#[async_trait]
impl ProposalRepo for SqliteProposalRepo {
    async fn save(&self, proposal: &Proposal) -> Result<()> {
        let pool = &self.pool;
        retry_on_lock("proposal save", DEFAULT_MAX_LOCK_WAIT_MS, move || async move {
            sqlx::query(
                r#"
                INSERT INTO proposals (
                    id, scope_type, scope_id, author_id, title, summary, status,
                    minority_report, decided_at, decision_outcome, bridge_similarity_check_done,
                    created_at, updated_at, deleted_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    summary = excluded.summary,
                    status = excluded.status,
                    minority_report = excluded.minority_report,
                    decided_at = excluded.decided_at,
                    decision_outcome = excluded.decision_outcome,
                    bridge_similarity_check_done = excluded.bridge_similarity_check_done,
                    updated_at = excluded.updated_at,
                    deleted_at = excluded.deleted_at
                "#,
            )
            .bind(proposal.id.to_string())
            .bind(proposal.scope_type.as_str())
            .bind(proposal.scope_id.to_string())
            .bind(proposal.author_id.to_string())
            .bind(&proposal.title)
            .bind(&proposal.summary)
            .bind(proposal.status.as_str())
            .bind(&proposal.minority_report)
            .bind(proposal.decided_at.as_ref().map(to_db))
            .bind(proposal.decision_outcome.map(|o| o.as_str()))
            .bind(proposal.bridge_similarity_check_done)
            .bind(to_db(&proposal.created_at))
            .bind(to_db(&proposal.updated_at))
            .bind(proposal.deleted_at.as_ref().map(to_db))
            .execute(pool)
            .await?;
            Ok(())
        })
        .await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Proposal>> {
        let sql = format!("{} WHERE id = ? AND deleted_at IS NULL", SELECT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_proposal).transpose()
    }

    async fn list(&self, filter: &ProposalFilter) -> Result<Vec<Proposal>> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_COLUMNS);
        push_filter(&mut builder, filter);
        builder
            .push(" ORDER BY created_at DESC, id ASC LIMIT ")
            .push_bind(filter.limit() as i64)
            .push(" OFFSET ")
            .push_bind(i64::try_from(filter.offset()).unwrap_or(i64::MAX));

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_proposal).collect()
    }

    async fn count(&self, filter: &ProposalFilter) -> Result<u64> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM proposals");
        push_filter(&mut builder, filter);
        let count: i64 = builder.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }
}
