//! Content index for the Bridge assistant
//!
//! Every indexed item carries an engagement snapshot plus the trust tier and
//! score computed from it at index time. Search ranks by a simple term-hit
//! relevance shared by both backends, with trust score breaking ties.

mod memory;
mod sqlite;

pub use memory::MemoryContentIndex;
pub use sqlite::SqliteContentIndex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

use crate::models::ContentType;
use crate::trust::{ContentEngagement, TrustPolicy, TrustTier};
use crate::{Error, Result};

/// Default page size for search
pub const DEFAULT_SEARCH_LIMIT: usize = 10;
/// Upper bound on a single search page
pub const MAX_SEARCH_LIMIT: usize = 100;

/// Caller-supplied fields for (re)indexing one item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexContentInput {
    pub content_type: ContentType,
    pub content_id: String,
    pub url: String,
    pub title: String,
    pub summary: Option<String>,
    pub full_text: Option<String>,
    pub author_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub engagement: ContentEngagement,
}

impl IndexContentInput {
    pub fn validate(&self) -> Result<()> {
        if self.content_id.trim().is_empty() {
            return Err(Error::Validation("content_id must not be empty".into()));
        }
        if self.title.trim().is_empty() {
            return Err(Error::Validation("title must not be empty".into()));
        }
        if self.url.trim().is_empty() {
            return Err(Error::Validation("url must not be empty".into()));
        }
        self.engagement.validate()
    }
}

/// One item as stored in the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedContent {
    pub content_type: ContentType,
    pub content_id: String,
    pub url: String,
    pub title: String,
    pub summary: Option<String>,
    pub full_text: Option<String>,
    pub author_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub indexed_at: DateTime<Utc>,
    pub engagement: ContentEngagement,
    pub trust_tier: TrustTier,
    pub trust_score: f64,
}

impl IndexedContent {
    /// Classify `input` under `policy` as of `now`
    pub fn from_input(input: IndexContentInput, policy: &TrustPolicy, now: DateTime<Utc>) -> Self {
        let (trust_tier, trust_score) = policy.assess(&input.engagement, input.created_at, now);
        Self {
            content_type: input.content_type,
            content_id: input.content_id,
            url: input.url,
            title: input.title,
            summary: input.summary,
            full_text: input.full_text,
            author_id: input.author_id,
            created_at: input.created_at,
            indexed_at: now,
            engagement: input.engagement,
            trust_tier,
            trust_score,
        }
    }

    /// Replace the engagement snapshot and reclassify
    pub fn refresh(&mut self, engagement: ContentEngagement, policy: &TrustPolicy, now: DateTime<Utc>) {
        let (tier, score) = policy.assess(&engagement, self.created_at, now);
        self.engagement = engagement;
        self.trust_tier = tier;
        self.trust_score = score;
        self.indexed_at = now;
    }

    /// Reclassify the current snapshot, e.g. after thresholds change
    pub fn reassess(&mut self, policy: &TrustPolicy, now: DateTime<Utc>) {
        let (tier, score) = policy.assess(&self.engagement, self.created_at, now);
        self.trust_tier = tier;
        self.trust_score = score;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    pub limit: usize,
    pub offset: usize,
    /// Exclude items below this tier
    pub min_trust: Option<TrustTier>,
    /// Restrict to these content types; empty means all
    pub types: Vec<ContentType>,
}

impl SearchOptions {
    /// Limit clamped to `1..=MAX_SEARCH_LIMIT`, with 0 meaning the default
    pub fn effective_limit(&self) -> usize {
        match self.limit {
            0 => DEFAULT_SEARCH_LIMIT,
            n => n.min(MAX_SEARCH_LIMIT),
        }
    }

    fn admits(&self, item: &IndexedContent) -> bool {
        let trust_ok = self.min_trust.map_or(true, |min| item.trust_tier >= min);
        let type_ok = self.types.is_empty() || self.types.contains(&item.content_type);
        trust_ok && type_ok
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(flatten)]
    pub item: IndexedContent,
    pub relevance: f64,
}

/// One page of ranked results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    pub results: Vec<SearchResult>,
    /// Matches before pagination
    pub total: usize,
}

/// Storage for the Bridge content index
#[async_trait]
pub trait ContentIndex: Send + Sync {
    /// Insert or replace the item keyed by (content_type, content_id)
    async fn index_content(
        &self,
        input: IndexContentInput,
        policy: &TrustPolicy,
    ) -> Result<IndexedContent>;

    /// Replace the engagement snapshot; `NotFound` if never indexed
    async fn update_engagement(
        &self,
        content_type: ContentType,
        content_id: &str,
        engagement: ContentEngagement,
        policy: &TrustPolicy,
    ) -> Result<IndexedContent>;

    /// Returns whether anything was removed
    async fn remove_from_index(&self, content_type: ContentType, content_id: &str) -> Result<bool>;

    async fn get(&self, content_type: ContentType, content_id: &str)
        -> Result<Option<IndexedContent>>;

    async fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchPage>;

    /// Recompute every stored tier and score; returns the number of items touched
    async fn reclassify_all(&self, policy: &TrustPolicy) -> Result<usize>;
}

/// Lower-cased, whitespace-separated query terms
pub fn query_terms(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(|t| t.to_lowercase())
        .collect()
}

/// Term-hit relevance: each term found in the title scores 3, summary 2, body 1
pub fn relevance(item: &IndexedContent, terms: &[String]) -> f64 {
    let title = item.title.to_lowercase();
    let summary = item.summary.as_deref().unwrap_or("").to_lowercase();
    let body = item.full_text.as_deref().unwrap_or("").to_lowercase();

    terms
        .iter()
        .map(|term| {
            let mut hits = 0.0;
            if title.contains(term.as_str()) {
                hits += 3.0;
            }
            if summary.contains(term.as_str()) {
                hits += 2.0;
            }
            if body.contains(term.as_str()) {
                hits += 1.0;
            }
            hits
        })
        .sum()
}

/// Filter, score, sort and paginate candidates
///
/// An empty query matches everything admitted by `options`, ordered by trust.
pub fn rank(
    candidates: impl IntoIterator<Item = IndexedContent>,
    query: &str,
    options: &SearchOptions,
) -> SearchPage {
    let terms = query_terms(query);

    let mut matches: Vec<SearchResult> = candidates
        .into_iter()
        .filter(|item| options.admits(item))
        .filter_map(|item| {
            let score = relevance(&item, &terms);
            if !terms.is_empty() && score == 0.0 {
                return None;
            }
            Some(SearchResult {
                item,
                relevance: score,
            })
        })
        .collect();

    matches.sort_by(|a, b| {
        b.relevance
            .partial_cmp(&a.relevance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                b.item
                    .trust_score
                    .partial_cmp(&a.item.trust_score)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| b.item.created_at.cmp(&a.item.created_at))
    });

    let total = matches.len();
    let results = matches
        .into_iter()
        .skip(options.offset)
        .take(options.effective_limit())
        .collect();

    SearchPage { results, total }
}
