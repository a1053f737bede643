//! Database bootstrap and shared row helpers
//!
//! All tos services share one SQLite file. Ids are stored as hyphenated UUID
//! text, timestamps as RFC 3339 text, enums as their snake_case names.

pub mod retry;
pub mod schema;
pub mod settings;

pub use retry::retry_on_lock;
pub use schema::create_schema;

use crate::{Error, Result};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;

/// Open (creating if needed) the database at `db_path` and create all tables
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL lets the two services read while one writes
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 250").execute(&pool).await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory database with the full schema
///
/// Each SQLite in-memory connection is its own database, so the pool is
/// pinned to one connection.
pub async fn init_memory_pool() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    create_schema(&pool).await?;
    Ok(pool)
}

/// Parse a stored UUID column
pub fn parse_uuid(text: &str) -> Result<Uuid> {
    Uuid::parse_str(text)
        .map_err(|e| Error::Internal(format!("Invalid stored id '{}': {}", text, e)))
}

pub fn parse_uuid_opt(text: Option<&str>) -> Result<Option<Uuid>> {
    text.map(parse_uuid).transpose()
}

/// Parse a stored enum column
pub fn parse_enum<T>(text: &str) -> Result<T>
where
    T: FromStr<Err = Error>,
{
    text.parse::<T>()
        .map_err(|e| Error::Internal(format!("Corrupt stored value: {}", e)))
}

/// SQLite integer flag
pub fn as_bool(value: i64) -> bool {
    value != 0
}
