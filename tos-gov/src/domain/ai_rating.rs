//! Automated quality assessment of a proposal

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// At most one per proposal; re-assessment replaces it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiRating {
    pub id: Uuid,
    pub proposal_id: Uuid,
    pub clarity: u8,
    pub constructiveness: u8,
    pub flagged_for_review: bool,
    pub reasoning: Option<String>,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    /// Model self-reported confidence in 0..=1
    pub confidence: Option<f64>,
    pub assessed_at: DateTime<Utc>,
}

impl AiRating {
    /// Whether this assessment should open a moderation review
    ///
    /// Flagged explicitly, a red constructiveness score, or middling
    /// constructiveness with more than two concrete issues.
    pub fn warrants_moderation(&self) -> bool {
        self.flagged_for_review
            || self.constructiveness == 1
            || (self.constructiveness == 2 && self.issues.len() > 2)
    }
}
