//! In-memory content index

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{rank, ContentIndex, IndexContentInput, IndexedContent, SearchOptions, SearchPage};
use crate::models::ContentType;
use crate::trust::{ContentEngagement, TrustPolicy};
use crate::{Error, Result};

type Key = (ContentType, String);

#[derive(Default)]
pub struct MemoryContentIndex {
    items: RwLock<HashMap<Key, IndexedContent>>,
}

impl MemoryContentIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

fn key(content_type: ContentType, content_id: &str) -> Key {
    (content_type, content_id.to_string())
}

#[async_trait]
impl ContentIndex for MemoryContentIndex {
    async fn index_content(
        &self,
        input: IndexContentInput,
        policy: &TrustPolicy,
    ) -> Result<IndexedContent> {
        input.validate()?;
        let item = IndexedContent::from_input(input, policy, Utc::now());
        self.items
            .write()
            .await
            .insert(key(item.content_type, &item.content_id), item.clone());
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
        let mut items = self.items.write().await;
        let item = items.get_mut(&key(content_type, content_id)).ok_or_else(|| {
            Error::NotFound(format!("Indexed content {}/{}", content_type, content_id))
        })?;
        item.refresh(engagement, policy, Utc::now());
        Ok(item.clone())
    }

    async fn remove_from_index(&self, content_type: ContentType, content_id: &str) -> Result<bool> {
        Ok(self
            .items
            .write()
            .await
            .remove(&key(content_type, content_id))
            .is_some())
    }

    async fn get(
        &self,
        content_type: ContentType,
        content_id: &str,
    ) -> Result<Option<IndexedContent>> {
        Ok(self
            .items
            .read()
            .await
            .get(&key(content_type, content_id))
            .cloned())
    }

    async fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchPage> {
        let items = self.items.read().await;
        Ok(rank(items.values().cloned(), query, options))
    }

    async fn reclassify_all(&self, policy: &TrustPolicy) -> Result<usize> {
        let now = Utc::now();
        let mut items = self.items.write().await;
        for item in items.values_mut() {
            item.reassess(policy, now);
        }
        Ok(items.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::test_support::input;
    use crate::trust::TrustTier;

    #[tokio::test]
    async fn test_reindex_upserts_by_type_and_id() {
        let index = MemoryContentIndex::new();
        let policy = TrustPolicy::default();
        index
            .index_content(input(ContentType::Wiki, "w1", "Old title"), &policy)
            .await
            .unwrap();
        index
            .index_content(input(ContentType::Wiki, "w1", "New title"), &policy)
            .await
            .unwrap();
        // Same id under another type is a different item
        index
            .index_content(input(ContentType::Article, "w1", "Article"), &policy)
            .await
            .unwrap();

        let stored = index.get(ContentType::Wiki, "w1").await.unwrap().unwrap();
        assert_eq!(stored.title, "New title");
        assert_eq!(index.search("", &SearchOptions::default()).await.unwrap().total, 2);
    }

    #[tokio::test]
    async fn test_update_engagement_reclassifies() {
        let index = MemoryContentIndex::new();
        let policy = TrustPolicy::default();
        let item = index
            .index_content(input(ContentType::ForumPost, "p1", "Post"), &policy)
            .await
            .unwrap();
        assert_eq!(item.trust_tier, TrustTier::Low);

        let engagement = ContentEngagement {
            total_sp: 25,
            ..Default::default()
        };
        let updated = index
            .update_engagement(ContentType::ForumPost, "p1", engagement, &policy)
            .await
            .unwrap();
        assert_eq!(updated.trust_tier, TrustTier::High);
    }

    #[tokio::test]
    async fn test_update_engagement_unknown_is_not_found() {
        let index = MemoryContentIndex::new();
        let err = index
            .update_engagement(
                ContentType::Event,
                "missing",
                ContentEngagement::default(),
                &TrustPolicy::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_remove_reports_whether_present() {
        let index = MemoryContentIndex::new();
        index
            .index_content(input(ContentType::Event, "e1", "Meetup"), &TrustPolicy::default())
            .await
            .unwrap();
        assert!(index.remove_from_index(ContentType::Event, "e1").await.unwrap());
        assert!(!index.remove_from_index(ContentType::Event, "e1").await.unwrap());
    }
}
