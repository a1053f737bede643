//! Governance services
//!
//! Each service is constructed with its collaborators; nothing here reaches
//! for global state.

pub mod assessor;
pub mod flags;
pub mod proposals;
pub mod queue;
pub mod ratings;

pub use assessor::QualityAssessor;
pub use flags::FlagManager;
pub use proposals::{ProposalPage, ProposalService};
pub use queue::{QueueItem, QueuePrioritizer};
pub use ratings::RatingService;
