//! Table definitions
//!
//! Every statement is idempotent; `create_schema` runs on each startup.

use crate::Result;
use sqlx::SqlitePool;

const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS settings (
        key TEXT PRIMARY KEY,
        value TEXT,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS proposals (
        id TEXT PRIMARY KEY,
        scope_type TEXT NOT NULL CHECK (scope_type IN ('individual', 'group')),
        scope_id TEXT NOT NULL,
        author_id TEXT NOT NULL,
        title TEXT NOT NULL,
        summary TEXT NOT NULL,
        status TEXT NOT NULL,
        minority_report TEXT,
        decided_at TEXT,
        decision_outcome TEXT,
        bridge_similarity_check_done INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        deleted_at TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_proposals_scope ON proposals(scope_type, scope_id)",
    "CREATE INDEX IF NOT EXISTS idx_proposals_author ON proposals(author_id)",
    "CREATE INDEX IF NOT EXISTS idx_proposals_created ON proposals(created_at)",
    r#"
    CREATE TABLE IF NOT EXISTS proposal_ratings (
        id TEXT PRIMARY KEY,
        proposal_id TEXT NOT NULL,
        member_id TEXT NOT NULL,
        clarity INTEGER NOT NULL CHECK (clarity BETWEEN 1 AND 3),
        importance INTEGER NOT NULL CHECK (importance BETWEEN 1 AND 5),
        urgency INTEGER NOT NULL CHECK (urgency BETWEEN 1 AND 5),
        is_innovative INTEGER NOT NULL DEFAULT 0,
        constructiveness INTEGER NOT NULL CHECK (constructiveness BETWEEN 1 AND 3),
        feedback TEXT,
        rated_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_ratings_proposal_member ON proposal_ratings(proposal_id, member_id)",
    r#"
    CREATE TABLE IF NOT EXISTS ai_ratings (
        id TEXT PRIMARY KEY,
        proposal_id TEXT NOT NULL,
        clarity INTEGER NOT NULL,
        constructiveness INTEGER NOT NULL,
        flagged_for_review INTEGER NOT NULL DEFAULT 0,
        reasoning TEXT,
        issues TEXT,
        suggestions TEXT,
        confidence REAL,
        assessed_at TEXT NOT NULL
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_ai_ratings_proposal ON ai_ratings(proposal_id)",
    r#"
    CREATE TABLE IF NOT EXISTS moderation_reviews (
        id TEXT PRIMARY KEY,
        proposal_id TEXT NOT NULL,
        flag_reason TEXT NOT NULL,
        status TEXT NOT NULL,
        moderator_id TEXT,
        moderator_notes TEXT,
        action TEXT,
        author_notified INTEGER NOT NULL DEFAULT 0,
        flagged_at TEXT NOT NULL,
        reviewed_at TEXT,
        appeal_text TEXT,
        appealed_at TEXT,
        appeal_moderator_id TEXT,
        appeal_reviewed_at TEXT
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_reviews_proposal ON moderation_reviews(proposal_id)",
    "CREATE INDEX IF NOT EXISTS idx_reviews_status ON moderation_reviews(status)",
    r#"
    CREATE TABLE IF NOT EXISTS content_index (
        content_type TEXT NOT NULL,
        content_id TEXT NOT NULL,
        url TEXT NOT NULL,
        title TEXT NOT NULL,
        summary TEXT,
        full_text TEXT,
        author_id TEXT,
        created_at TEXT NOT NULL,
        indexed_at TEXT NOT NULL,
        vote_score INTEGER NOT NULL DEFAULT 0,
        rating_avg REAL,
        reply_count INTEGER NOT NULL DEFAULT 0,
        participant_count INTEGER NOT NULL DEFAULT 0,
        total_sp INTEGER NOT NULL DEFAULT 0,
        sp_allocator_count INTEGER NOT NULL DEFAULT 0,
        trust_tier TEXT NOT NULL,
        trust_score REAL NOT NULL DEFAULT 0
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_content_index_key ON content_index(content_type, content_id)",
];

/// Create every tos table and index if missing
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    for statement in STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_schema_is_idempotent() {
        let pool = crate::db::init_memory_pool().await.unwrap();
        create_schema(&pool).await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "ai_ratings",
                "content_index",
                "moderation_reviews",
                "proposal_ratings",
                "proposals",
                "settings"
            ]
        );
    }
}
