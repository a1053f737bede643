//! Governance domain values
//!
//! Plain data plus the rules that govern how each value may change. Nothing
//! here touches storage; services load a value, derive the next one, and save.

pub mod ai_rating;
pub mod moderation;
pub mod proposal;
pub mod rating;

pub use ai_rating::AiRating;
pub use moderation::ModerationReview;
pub use proposal::{NewProposal, Proposal, ProposalChanges};
pub use rating::{Distribution, Rating, RatingAggregate, RatingInput};

use tos_common::{Error, Result};

/// Character-count bounds check (counts chars, not bytes; no trimming)
pub(crate) fn check_length(field: &str, value: &str, min: usize, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(Error::Validation(format!(
            "{} must be between {} and {} characters (got {})",
            field, min, max, len
        )));
    }
    Ok(())
}

/// Integer range check for rating dimensions
pub(crate) fn check_range(field: &str, value: u8, min: u8, max: u8) -> Result<()> {
    if value < min || value > max {
        return Err(Error::Validation(format!(
            "{} must be between {} and {} (got {})",
            field, min, max, value
        )));
    }
    Ok(())
}
