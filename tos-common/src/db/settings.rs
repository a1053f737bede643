//! Key/value runtime settings
//!
//! Values are stored as text. Structured values (trust thresholds) are JSON.

use sqlx::{Pool, Sqlite};
use tracing::warn;

use crate::trust::TrustThresholds;
use crate::{Error, Result};

/// Runtime override for the trust gates
pub const TRUST_THRESHOLDS_KEY: &str = "trust_thresholds";

pub async fn get_setting<T>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(Option<String>,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await?;

    match row {
        Some((Some(value),)) => {
            let parsed = value
                .parse::<T>()
                .map_err(|e| Error::Config(format!("Parse setting {} failed: {}", key, e)))?;
            Ok(Some(parsed))
        }
        _ => Ok(None),
    }
}

pub async fn set_setting<T>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await?;

    Ok(())
}

/// Stored threshold override, if any
pub async fn get_trust_thresholds(db: &Pool<Sqlite>) -> Result<Option<TrustThresholds>> {
    let Some(json) = get_setting::<String>(db, TRUST_THRESHOLDS_KEY).await? else {
        return Ok(None);
    };
    let thresholds: TrustThresholds = serde_json::from_str(&json)
        .map_err(|e| Error::Config(format!("Stored trust thresholds are invalid: {}", e)))?;
    Ok(Some(thresholds))
}

pub async fn set_trust_thresholds(db: &Pool<Sqlite>, thresholds: &TrustThresholds) -> Result<()> {
    thresholds.validate()?;
    let json = serde_json::to_string(thresholds)
        .map_err(|e| Error::Internal(format!("Serialize trust thresholds failed: {}", e)))?;
    set_setting(db, TRUST_THRESHOLDS_KEY, json).await
}

/// Thresholds in effect: the settings table wins over `fallback` (from TOML)
///
/// A corrupt stored value is logged and ignored.
pub async fn resolve_trust_thresholds(
    db: &Pool<Sqlite>,
    fallback: &TrustThresholds,
) -> Result<TrustThresholds> {
    match get_trust_thresholds(db).await {
        Ok(Some(stored)) => Ok(stored),
        Ok(None) => Ok(fallback.clone()),
        Err(Error::Config(msg)) => {
            warn!("{}; using configured thresholds", msg);
            Ok(fallback.clone())
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_pool;

    #[tokio::test]
    async fn test_get_missing_setting_is_none() {
        let db = init_memory_pool().await.unwrap();
        let value: Option<u64> = get_setting(&db, "nothing_here").await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_set_overwrites_previous_value() {
        let db = init_memory_pool().await.unwrap();
        set_setting(&db, "max_lock_wait_ms", 100).await.unwrap();
        set_setting(&db, "max_lock_wait_ms", 250).await.unwrap();
        let value: Option<u64> = get_setting(&db, "max_lock_wait_ms").await.unwrap();
        assert_eq!(value, Some(250));
    }

    #[tokio::test]
    async fn test_thresholds_stored_override_wins() {
        let db = init_memory_pool().await.unwrap();
        let fallback = TrustThresholds::default();
        assert_eq!(resolve_trust_thresholds(&db, &fallback).await.unwrap(), fallback);

        let mut custom = TrustThresholds::default();
        custom.high.min_sp = 12;
        custom.new_content_hours = 48.0;
        set_trust_thresholds(&db, &custom).await.unwrap();

        assert_eq!(get_trust_thresholds(&db).await.unwrap(), Some(custom.clone()));
        assert_eq!(resolve_trust_thresholds(&db, &fallback).await.unwrap(), custom);
    }

    #[tokio::test]
    async fn test_corrupt_thresholds_fall_back() {
        let db = init_memory_pool().await.unwrap();
        set_setting(&db, TRUST_THRESHOLDS_KEY, "{not json").await.unwrap();
        let fallback = TrustThresholds::default();
        assert_eq!(resolve_trust_thresholds(&db, &fallback).await.unwrap(), fallback);
    }
}
