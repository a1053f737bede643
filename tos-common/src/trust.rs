//! Trust tier classification and trust score
//!
//! Any indexable content item (proposal, forum post or topic, article, wiki page,
//! event) carries an engagement snapshot. The Bridge assistant hedges how it cites
//! content by the tier computed here, and sorts by the continuous score.
//!
//! Support Points count double against votes in every effective-engagement
//! figure: SP cannot be bought and allocating it costs the member something.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::policy::TrustScoreWeights;
use crate::time::hours_between;
use crate::Error;

/// Ordinal trust label, lowest to highest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustTier {
    /// Not yet old enough to evaluate and nobody has engaged
    Unvalidated,
    Low,
    Medium,
    High,
    Consensus,
}

impl TrustTier {
    pub const ALL: &'static [TrustTier] = &[
        TrustTier::Unvalidated,
        TrustTier::Low,
        TrustTier::Medium,
        TrustTier::High,
        TrustTier::Consensus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TrustTier::Unvalidated => "unvalidated",
            TrustTier::Low => "low",
            TrustTier::Medium => "medium",
            TrustTier::High => "high",
            TrustTier::Consensus => "consensus",
        }
    }

    /// Hedging phrase shown next to content in assistant prompts
    pub fn phrase(&self) -> &'static str {
        match self {
            TrustTier::Unvalidated => {
                "(Unvalidated - one member's opinion, no feedback yet)"
            }
            TrustTier::Low => "(Low trust - limited validation)",
            TrustTier::Medium => "(Some community support)",
            TrustTier::High => "(Strong community support)",
            TrustTier::Consensus => "(Community consensus)",
        }
    }
}

impl fmt::Display for TrustTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrustTier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TrustTier::ALL
            .iter()
            .find(|tier| tier.as_str() == s)
            .copied()
            .ok_or_else(|| Error::Validation(format!("Unknown trust tier: {}", s)))
    }
}

/// Engagement snapshot for one content item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentEngagement {
    /// Net votes (up minus down)
    pub vote_score: i64,
    /// Average rating (0-5) where the content type supports ratings
    pub rating_avg: Option<f64>,
    pub reply_count: i64,
    /// Distinct members who engaged
    pub participant_count: i64,
    /// Support Points allocated to this content
    pub total_sp: i64,
    /// Distinct members who allocated SP
    pub sp_allocator_count: i64,
}

impl ContentEngagement {
    /// Votes with SP weighted double
    pub fn effective_votes(&self) -> i64 {
        self.vote_score.saturating_add(self.total_sp.saturating_mul(2))
    }

    /// Participants plus SP allocators
    pub fn effective_participants(&self) -> i64 {
        self.participant_count.saturating_add(self.sp_allocator_count)
    }

    /// Counts other than the net vote score must not be negative
    pub fn validate(&self) -> crate::Result<()> {
        let counts = [
            ("reply_count", self.reply_count),
            ("participant_count", self.participant_count),
            ("total_sp", self.total_sp),
            ("sp_allocator_count", self.sp_allocator_count),
        ];
        for (name, value) in counts {
            if value < 0 {
                return Err(crate::Error::Validation(format!(
                    "engagement.{} must not be negative (got {})",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// No votes, replies or SP at all
    pub fn is_silent(&self) -> bool {
        self.vote_score == 0 && self.reply_count == 0 && self.total_sp == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LowGate {
    pub min_votes: i64,
    pub min_replies: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportGate {
    pub min_votes: i64,
    pub min_replies: i64,
    pub min_sp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusGate {
    pub min_votes: i64,
    pub min_participants: i64,
    pub min_sp: i64,
}

/// Per-tier gates, adjustable by administrators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustThresholds {
    /// Hours before content stops being "new"
    pub new_content_hours: f64,
    pub low: LowGate,
    pub medium: SupportGate,
    pub high: SupportGate,
    pub consensus: ConsensusGate,
}

impl Default for TrustThresholds {
    fn default() -> Self {
        Self {
            new_content_hours: 24.0,
            low: LowGate {
                min_votes: 1,
                min_replies: 1,
            },
            medium: SupportGate {
                min_votes: 3,
                min_replies: 3,
                min_sp: 5,
            },
            high: SupportGate {
                min_votes: 10,
                min_replies: 5,
                min_sp: 20,
            },
            consensus: ConsensusGate {
                min_votes: 20,
                min_participants: 10,
                min_sp: 50,
            },
        }
    }
}

impl TrustThresholds {
    /// Reject gate tables that could never classify sensibly
    pub fn validate(&self) -> crate::Result<()> {
        if !self.new_content_hours.is_finite() || self.new_content_hours < 0.0 {
            return Err(Error::Validation(format!(
                "new_content_hours must be a non-negative number, got {}",
                self.new_content_hours
            )));
        }
        let gates = [
            ("low.min_votes", self.low.min_votes),
            ("low.min_replies", self.low.min_replies),
            ("medium.min_votes", self.medium.min_votes),
            ("medium.min_replies", self.medium.min_replies),
            ("medium.min_sp", self.medium.min_sp),
            ("high.min_votes", self.high.min_votes),
            ("high.min_replies", self.high.min_replies),
            ("high.min_sp", self.high.min_sp),
            ("consensus.min_votes", self.consensus.min_votes),
            ("consensus.min_participants", self.consensus.min_participants),
            ("consensus.min_sp", self.consensus.min_sp),
        ];
        if let Some((name, value)) = gates.iter().find(|(_, v)| *v < 0) {
            return Err(Error::Validation(format!(
                "{} must not be negative, got {}",
                name, value
            )));
        }
        Ok(())
    }
}

/// Thresholds and score weights applied together when content is (re)indexed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrustPolicy {
    pub thresholds: TrustThresholds,
    pub score_weights: TrustScoreWeights,
}

impl TrustPolicy {
    pub fn new(thresholds: TrustThresholds, score_weights: TrustScoreWeights) -> Self {
        Self {
            thresholds,
            score_weights,
        }
    }

    /// Tier and score for one item as of `now`
    pub fn assess(
        &self,
        engagement: &ContentEngagement,
        created_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> (TrustTier, f64) {
        (
            calculate_trust_tier_at(engagement, created_at, now, &self.thresholds),
            calculate_trust_score_at(engagement, created_at, now, &self.score_weights),
        )
    }
}

/// Classify content into a trust tier as of now
pub fn calculate_trust_tier(
    engagement: &ContentEngagement,
    created_at: DateTime<Utc>,
    thresholds: &TrustThresholds,
) -> TrustTier {
    calculate_trust_tier_at(engagement, created_at, Utc::now(), thresholds)
}

/// Classify content into a trust tier as of `now`
///
/// Gates are evaluated highest first and the first match wins, so content
/// that clears both the high and medium gates reports high.
pub fn calculate_trust_tier_at(
    engagement: &ContentEngagement,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
    thresholds: &TrustThresholds,
) -> TrustTier {
    let effective_votes = engagement.effective_votes();
    let effective_participants = engagement.effective_participants();
    let sp = engagement.total_sp;
    let replies = engagement.reply_count;

    let t = thresholds;

    if effective_votes >= t.consensus.min_votes
        && effective_participants >= t.consensus.min_participants
        && sp >= t.consensus.min_sp
    {
        return TrustTier::Consensus;
    }

    // SP alone can carry content to high
    if sp >= t.high.min_sp || (effective_votes >= t.high.min_votes && replies >= t.high.min_replies)
    {
        return TrustTier::High;
    }

    if sp >= t.medium.min_sp
        || effective_votes >= t.medium.min_votes
        || replies >= t.medium.min_replies
    {
        return TrustTier::Medium;
    }

    if engagement.vote_score >= t.low.min_votes || replies >= t.low.min_replies || sp > 0 {
        return TrustTier::Low;
    }

    let age_hours = hours_between(created_at, now);
    if age_hours < t.new_content_hours && engagement.is_silent() {
        return TrustTier::Unvalidated;
    }

    // Old content nobody engaged with is stale, not unvalidated
    TrustTier::Low
}

/// Continuous trust score as of now, with the default policy table
pub fn calculate_trust_score(engagement: &ContentEngagement, created_at: DateTime<Utc>) -> f64 {
    calculate_trust_score_at(
        engagement,
        created_at,
        Utc::now(),
        &TrustScoreWeights::default(),
    )
}

/// Continuous trust score as of `now`; never negative
pub fn calculate_trust_score_at(
    engagement: &ContentEngagement,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
    weights: &TrustScoreWeights,
) -> f64 {
    let w = weights;

    let vote_points = (engagement.vote_score as f64 * w.points_per_vote).min(w.vote_cap);
    let sp_points = (engagement.total_sp as f64 * w.points_per_sp).min(w.sp_cap);
    let allocator_bonus = (engagement.sp_allocator_count as f64).min(w.allocator_cap);
    let reply_points = (engagement.reply_count as f64 * w.points_per_reply).min(w.reply_cap);
    let participant_bonus = (engagement.participant_count as f64).min(w.participant_cap);
    let rating_bonus = engagement
        .rating_avg
        .map(|avg| (avg - w.rating_midpoint) * w.rating_multiplier)
        .unwrap_or(0.0);

    let age_hours = hours_between(created_at, now);
    let fresh_penalty = (w.fresh_hours - age_hours).max(0.0) * w.fresh_penalty_per_hour;

    let total = vote_points
        + sp_points
        + allocator_bonus
        + reply_points
        + participant_bonus
        + rating_bonus
        - fresh_penalty;

    total.max(0.0)
}

/// Coarse tier from a trust score, for quick sorting buckets
pub fn trust_tier_from_score(score: f64) -> TrustTier {
    if score >= 80.0 {
        TrustTier::Consensus
    } else if score >= 50.0 {
        TrustTier::High
    } else if score >= 25.0 {
        TrustTier::Medium
    } else if score >= 10.0 {
        TrustTier::Low
    } else {
        TrustTier::Unvalidated
    }
}

/// Whether SP backing alone makes content worth highlighting
pub fn has_significant_sp_backing(total_sp: i64, sp_allocator_count: i64) -> bool {
    total_sp >= 10 || (sp_allocator_count >= 3 && total_sp >= 5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at_age(hours: i64) -> (DateTime<Utc>, DateTime<Utc>) {
        let now = Utc::now();
        (now - Duration::hours(hours), now)
    }

    fn tier(engagement: &ContentEngagement, age_hours: i64) -> TrustTier {
        let (created, now) = at_age(age_hours);
        calculate_trust_tier_at(engagement, created, now, &TrustThresholds::default())
    }

    fn score(engagement: &ContentEngagement, age_hours: i64) -> f64 {
        let (created, now) = at_age(age_hours);
        calculate_trust_score_at(engagement, created, now, &TrustScoreWeights::default())
    }

    #[test]
    fn test_sp_alone_reaches_high() {
        // effective votes 24 >= high.min_votes but replies 0; SP 12 < 20.
        // With defaults the SP-alone path needs 20 SP, so use a gate of 12.
        let thresholds = TrustThresholds {
            high: SupportGate {
                min_votes: 10,
                min_replies: 5,
                min_sp: 12,
            },
            ..TrustThresholds::default()
        };
        let engagement = ContentEngagement {
            total_sp: 12,
            ..Default::default()
        };
        let (created, now) = at_age(48);
        assert_eq!(
            calculate_trust_tier_at(&engagement, created, now, &thresholds),
            TrustTier::High
        );
    }

    #[test]
    fn test_default_sp_gate_for_high() {
        let engagement = ContentEngagement {
            total_sp: 20,
            ..Default::default()
        };
        assert_eq!(tier(&engagement, 48), TrustTier::High);
    }

    #[test]
    fn test_high_beats_medium_when_both_gates_pass() {
        let engagement = ContentEngagement {
            vote_score: 10,
            reply_count: 5,
            total_sp: 6,
            ..Default::default()
        };
        assert_eq!(tier(&engagement, 48), TrustTier::High);
    }

    #[test]
    fn test_consensus_requires_all_three_gates() {
        let mut engagement = ContentEngagement {
            vote_score: 5,
            participant_count: 8,
            total_sp: 50,
            sp_allocator_count: 2,
            ..Default::default()
        };
        assert_eq!(tier(&engagement, 48), TrustTier::Consensus);

        engagement.total_sp = 49;
        assert_eq!(tier(&engagement, 48), TrustTier::High);
    }

    #[test]
    fn test_huge_sp_saturates_instead_of_wrapping() {
        let engagement = ContentEngagement {
            total_sp: i64::MAX / 2 + 1,
            sp_allocator_count: i64::MAX,
            participant_count: 1,
            ..Default::default()
        };
        assert_eq!(engagement.effective_votes(), i64::MAX);
        assert_eq!(engagement.effective_participants(), i64::MAX);
        assert_eq!(tier(&engagement, 48), TrustTier::Consensus);

        let engagement = ContentEngagement {
            vote_score: i64::MAX,
            total_sp: i64::MAX,
            participant_count: i64::MAX,
            sp_allocator_count: i64::MAX,
            reply_count: i64::MAX,
            ..Default::default()
        };
        assert_eq!(tier(&engagement, 48), TrustTier::Consensus);
        assert!(score(&engagement, 48) > 0.0);
    }

    #[test]
    fn test_negative_counts_are_rejected() {
        let engagement = ContentEngagement {
            vote_score: -4,
            ..Default::default()
        };
        assert!(engagement.validate().is_ok());

        let engagement = ContentEngagement {
            reply_count: -1,
            ..Default::default()
        };
        assert!(engagement.validate().is_err());

        let engagement = ContentEngagement {
            sp_allocator_count: -2,
            ..Default::default()
        };
        assert!(engagement.validate().is_err());
    }

    #[test]
    fn test_medium_via_replies_only() {
        let engagement = ContentEngagement {
            reply_count: 3,
            ..Default::default()
        };
        assert_eq!(tier(&engagement, 48), TrustTier::Medium);
    }

    #[test]
    fn test_any_sp_is_at_least_low() {
        let engagement = ContentEngagement {
            total_sp: 1,
            ..Default::default()
        };
        // effective votes = 2, below medium's 3
        assert_eq!(tier(&engagement, 1), TrustTier::Low);
    }

    #[test]
    fn test_zero_engagement_depends_on_age() {
        let engagement = ContentEngagement::default();
        assert_eq!(tier(&engagement, 2), TrustTier::Unvalidated);
        assert_eq!(tier(&engagement, 72), TrustTier::Low);
    }

    #[test]
    fn test_negative_votes_on_new_content_fall_back_to_low() {
        let engagement = ContentEngagement {
            vote_score: -3,
            ..Default::default()
        };
        assert_eq!(tier(&engagement, 1), TrustTier::Low);
    }

    #[test]
    fn test_trust_tier_ordering() {
        assert!(TrustTier::Unvalidated < TrustTier::Low);
        assert!(TrustTier::Low < TrustTier::Medium);
        assert!(TrustTier::Medium < TrustTier::High);
        assert!(TrustTier::High < TrustTier::Consensus);
    }

    #[test]
    fn test_score_components_are_capped() {
        let engagement = ContentEngagement {
            vote_score: 1000,
            rating_avg: None,
            reply_count: 1000,
            participant_count: 1000,
            total_sp: 1000,
            sp_allocator_count: 1000,
        };
        assert_eq!(score(&engagement, 48), 30.0 + 40.0 + 10.0 + 15.0 + 10.0);
    }

    #[test]
    fn test_score_never_negative() {
        let engagement = ContentEngagement {
            vote_score: -50,
            rating_avg: Some(0.0),
            ..Default::default()
        };
        assert_eq!(score(&engagement, 0), 0.0);
    }

    #[test]
    fn test_fresh_content_penalty() {
        let engagement = ContentEngagement {
            vote_score: 10,
            ..Default::default()
        };
        assert_eq!(score(&engagement, 48), 20.0);
        assert_eq!(score(&engagement, 2), 20.0 - 8.0);
    }

    #[test]
    fn test_rating_bonus_can_be_negative() {
        let base = ContentEngagement {
            vote_score: 10,
            ..Default::default()
        };
        let low_rated = ContentEngagement {
            rating_avg: Some(1.5),
            ..base.clone()
        };
        assert_eq!(score(&low_rated, 48), 18.0);
    }

    #[test]
    fn test_score_is_monotone_in_each_signal() {
        let base = ContentEngagement {
            vote_score: 2,
            rating_avg: Some(3.0),
            reply_count: 2,
            participant_count: 2,
            total_sp: 2,
            sp_allocator_count: 1,
        };
        let bumps: [fn(&mut ContentEngagement); 5] = [
            |e| e.vote_score += 1,
            |e| e.total_sp += 1,
            |e| e.reply_count += 1,
            |e| e.participant_count += 1,
            |e| e.rating_avg = e.rating_avg.map(|r| r + 0.5),
        ];
        for bump in bumps {
            let mut current = base.clone();
            let mut previous = score(&current, 12);
            for _ in 0..40 {
                bump(&mut current);
                let next = score(&current, 12);
                assert!(next >= previous, "{:?} decreased score", current);
                previous = next;
            }
        }
    }

    #[test]
    fn test_tier_from_score_cutoffs() {
        assert_eq!(trust_tier_from_score(80.0), TrustTier::Consensus);
        assert_eq!(trust_tier_from_score(79.9), TrustTier::High);
        assert_eq!(trust_tier_from_score(25.0), TrustTier::Medium);
        assert_eq!(trust_tier_from_score(10.0), TrustTier::Low);
        assert_eq!(trust_tier_from_score(0.0), TrustTier::Unvalidated);
    }

    #[test]
    fn test_significant_sp_backing() {
        assert!(has_significant_sp_backing(10, 1));
        assert!(has_significant_sp_backing(5, 3));
        assert!(!has_significant_sp_backing(5, 2));
        assert!(!has_significant_sp_backing(4, 10));
    }

    #[test]
    fn test_thresholds_reject_negative_gates() {
        let mut thresholds = TrustThresholds::default();
        assert!(thresholds.validate().is_ok());
        thresholds.medium.min_sp = -1;
        assert!(thresholds.validate().is_err());
    }
}
