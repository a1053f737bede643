//! Member quality ratings and their aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{check_length, check_range};
use tos_common::Result;

pub const FEEDBACK_MAX: usize = 2000;

/// Constructiveness value that counts as a red flag
pub const RED_FLAG: u8 = 1;

/// One member's rating of one proposal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub id: Uuid,
    pub proposal_id: Uuid,
    pub member_id: Uuid,
    /// 1 unclear, 2 somewhat clear, 3 very clear
    pub clarity: u8,
    pub importance: u8,
    pub urgency: u8,
    pub is_innovative: bool,
    /// 1 red flag, 2 some concerns, 3 constructive
    pub constructiveness: u8,
    pub feedback: Option<String>,
    pub rated_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Rating dimensions as submitted by a member
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RatingInput {
    pub clarity: u8,
    pub importance: u8,
    pub urgency: u8,
    #[serde(default)]
    pub is_innovative: bool,
    pub constructiveness: u8,
    #[serde(default)]
    pub feedback: Option<String>,
}

impl RatingInput {
    pub fn validate(&self) -> Result<()> {
        check_range("clarity", self.clarity, 1, 3)?;
        check_range("importance", self.importance, 1, 5)?;
        check_range("urgency", self.urgency, 1, 5)?;
        check_range("constructiveness", self.constructiveness, 1, 3)?;
        if let Some(feedback) = &self.feedback {
            check_length("feedback", feedback, 0, FEEDBACK_MAX)?;
        }
        Ok(())
    }
}

impl Rating {
    /// First rating by this member
    pub fn new(proposal_id: Uuid, member_id: Uuid, input: RatingInput, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            proposal_id,
            member_id,
            clarity: input.clarity,
            importance: input.importance,
            urgency: input.urgency,
            is_innovative: input.is_innovative,
            constructiveness: input.constructiveness,
            feedback: input.feedback,
            rated_at: now,
            updated_at: now,
        }
    }

    /// Resubmission: same id and `rated_at`, new dimensions
    pub fn resubmit(&self, input: RatingInput, now: DateTime<Utc>) -> Self {
        Self {
            clarity: input.clarity,
            importance: input.importance,
            urgency: input.urgency,
            is_innovative: input.is_innovative,
            constructiveness: input.constructiveness,
            feedback: input.feedback,
            updated_at: now,
            ..self.clone()
        }
    }

    pub fn is_red_flag(&self) -> bool {
        self.constructiveness == RED_FLAG
    }
}

/// Count of ratings per 1..=3 value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    #[serde(rename = "1")]
    pub one: u32,
    #[serde(rename = "2")]
    pub two: u32,
    #[serde(rename = "3")]
    pub three: u32,
}

impl Distribution {
    fn record(&mut self, value: u8) {
        match value {
            1 => self.one += 1,
            2 => self.two += 1,
            3 => self.three += 1,
            _ => {}
        }
    }
}

/// Derived summary of all ratings for a proposal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingAggregate {
    pub proposal_id: Option<Uuid>,
    pub total_ratings: u32,
    pub avg_clarity: f64,
    pub clarity_distribution: Distribution,
    pub avg_importance: f64,
    pub avg_urgency: f64,
    pub innovative_count: u32,
    /// Fraction in 0..=1
    pub innovative_percentage: f64,
    pub avg_constructiveness: f64,
    pub constructiveness_distribution: Distribution,
    pub has_red_flags: bool,
    pub red_flag_count: u32,
}

impl RatingAggregate {
    /// All-zero aggregate for a proposal nobody has rated
    pub fn empty(proposal_id: Option<Uuid>) -> Self {
        Self {
            proposal_id,
            total_ratings: 0,
            avg_clarity: 0.0,
            clarity_distribution: Distribution::default(),
            avg_importance: 0.0,
            avg_urgency: 0.0,
            innovative_count: 0,
            innovative_percentage: 0.0,
            avg_constructiveness: 0.0,
            constructiveness_distribution: Distribution::default(),
            has_red_flags: false,
            red_flag_count: 0,
        }
    }

    pub fn calculate(proposal_id: Option<Uuid>, ratings: &[Rating]) -> Self {
        if ratings.is_empty() {
            return Self::empty(proposal_id);
        }

        let total = ratings.len() as f64;
        let mean = |f: fn(&Rating) -> u8| ratings.iter().map(|r| f(r) as f64).sum::<f64>() / total;

        let mut clarity_distribution = Distribution::default();
        let mut constructiveness_distribution = Distribution::default();
        for rating in ratings {
            clarity_distribution.record(rating.clarity);
            constructiveness_distribution.record(rating.constructiveness);
        }

        let innovative_count = ratings.iter().filter(|r| r.is_innovative).count() as u32;
        let red_flag_count = constructiveness_distribution.one;

        Self {
            proposal_id,
            total_ratings: ratings.len() as u32,
            avg_clarity: mean(|r| r.clarity),
            clarity_distribution,
            avg_importance: mean(|r| r.importance),
            avg_urgency: mean(|r| r.urgency),
            innovative_count,
            innovative_percentage: innovative_count as f64 / total,
            avg_constructiveness: mean(|r| r.constructiveness),
            constructiveness_distribution,
            has_red_flags: red_flag_count > 0,
            red_flag_count,
        }
    }
}
