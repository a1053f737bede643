//! Tunable scoring policy tables
//!
//! The weights below have no derivation behind them; they are what the
//! platform shipped with. Both tables deserialize from TOML with every field
//! optional so operators can override a single weight.

use serde::{Deserialize, Serialize};

use crate::models::FlagReason;

/// Weights for the moderation queue urgency score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UrgencyWeights {
    pub ai_flagged: f64,
    pub member_red_rating: f64,
    pub multiple_concerns: f64,
    pub manual_report: f64,
    /// Added when the community red-flag count exceeds `red_flag_threshold`
    pub community_red_flags: f64,
    pub red_flag_threshold: u32,
    /// Added when the AI rated constructiveness 1
    pub ai_red_constructiveness: f64,
    /// Points per hour since the review was opened
    pub age_per_hour: f64,
    pub age_cap: f64,
}

impl Default for UrgencyWeights {
    fn default() -> Self {
        Self {
            ai_flagged: 30.0,
            member_red_rating: 50.0,
            multiple_concerns: 70.0,
            manual_report: 0.0,
            community_red_flags: 20.0,
            red_flag_threshold: 3,
            ai_red_constructiveness: 40.0,
            age_per_hour: 2.0,
            age_cap: 50.0,
        }
    }
}

impl UrgencyWeights {
    pub fn for_reason(&self, reason: FlagReason) -> f64 {
        match reason {
            FlagReason::AiFlagged => self.ai_flagged,
            FlagReason::MemberRedRating => self.member_red_rating,
            FlagReason::MultipleConcerns => self.multiple_concerns,
            FlagReason::ManualReport => self.manual_report,
        }
    }

    /// Age contribution, capped
    pub fn for_age(&self, age_hours: f64) -> f64 {
        (age_hours.max(0.0) * self.age_per_hour).min(self.age_cap)
    }
}

/// Component caps and multipliers for the continuous trust score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustScoreWeights {
    pub points_per_vote: f64,
    pub vote_cap: f64,
    pub points_per_sp: f64,
    pub sp_cap: f64,
    pub allocator_cap: f64,
    pub points_per_reply: f64,
    pub reply_cap: f64,
    pub participant_cap: f64,
    /// Rating average treated as neutral
    pub rating_midpoint: f64,
    pub rating_multiplier: f64,
    /// Content younger than this is penalised
    pub fresh_hours: f64,
    pub fresh_penalty_per_hour: f64,
}

impl Default for TrustScoreWeights {
    fn default() -> Self {
        Self {
            points_per_vote: 2.0,
            vote_cap: 30.0,
            points_per_sp: 2.0,
            sp_cap: 40.0,
            allocator_cap: 10.0,
            points_per_reply: 1.5,
            reply_cap: 15.0,
            participant_cap: 10.0,
            rating_midpoint: 2.5,
            rating_multiplier: 2.0,
            fresh_hours: 6.0,
            fresh_penalty_per_hour: 2.0,
        }
    }
}
