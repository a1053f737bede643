//! Shared enumerations for the governance data model
//!
//! Every enum here is persisted as its snake_case string form (same as the
//! JSON wire form), so `as_str`/`FromStr` must stay in sync with serde.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// All variants in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Persisted / wire representation
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(Error::Validation(format!(
                        concat!("Unknown ", stringify!($name), ": {}"),
                        other
                    ))),
                }
            }
        }
    };
}

string_enum! {
    /// Who a proposal speaks for
    ScopeType {
        Individual => "individual",
        Group => "group",
    }
}

string_enum! {
    /// Proposal lifecycle status
    ProposalStatus {
        Draft => "draft",
        Research => "research",
        Deliberation => "deliberation",
        Voting => "voting",
        Decided => "decided",
        Delivery => "delivery",
        Reviewed => "reviewed",
        Archived => "archived",
    }
}

impl ProposalStatus {
    /// Statuses reachable from `self` in one step
    pub fn allowed_transitions(&self) -> &'static [ProposalStatus] {
        use ProposalStatus::*;
        match self {
            Draft => &[Research, Archived],
            Research => &[Deliberation, Draft, Archived],
            Deliberation => &[Voting, Research, Archived],
            Voting => &[Decided, Deliberation, Archived],
            Decided => &[Delivery, Archived],
            Delivery => &[Reviewed, Archived],
            Reviewed => &[Archived],
            Archived => &[],
        }
    }

    pub fn can_transition_to(&self, next: ProposalStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }
}

string_enum! {
    /// Final outcome recorded once a proposal is decided
    DecisionOutcome {
        Approved => "approved",
        Rejected => "rejected",
        Amended => "amended",
    }
}

string_enum! {
    /// Why a moderation review was opened
    FlagReason {
        AiFlagged => "ai_flagged",
        MemberRedRating => "member_red_rating",
        MultipleConcerns => "multiple_concerns",
        ManualReport => "manual_report",
    }
}

string_enum! {
    /// Moderation review status
    ModerationStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
        Appealed => "appealed",
        AppealApproved => "appeal_approved",
        AppealRejected => "appeal_rejected",
    }
}

impl ModerationStatus {
    /// Statuses reachable from `self` through review or appeal actions
    ///
    /// `rejected`, `appeal_approved` and `appeal_rejected` have no exits.
    pub fn allowed_transitions(&self) -> &'static [ModerationStatus] {
        use ModerationStatus::*;
        match self {
            Pending => &[Approved, Rejected],
            Approved => &[Appealed],
            Appealed => &[AppealApproved, AppealRejected],
            Rejected | AppealApproved | AppealRejected => &[],
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }
}

string_enum! {
    /// Action a moderator takes on a flagged proposal
    ModerationAction {
        NoAction => "no_action",
        EditRequired => "edit_required",
        Hidden => "hidden",
        Removed => "removed",
    }
}

string_enum! {
    /// Moderator verdict on a review or an appeal
    ReviewDecision {
        Approve => "approve",
        Reject => "reject",
    }
}

string_enum! {
    /// Content kinds the Bridge index accepts
    ContentType {
        ForumPost => "forum_post",
        ForumTopic => "forum_topic",
        Article => "article",
        Proposal => "proposal",
        Wiki => "wiki",
        Event => "event",
    }
}

impl ContentType {
    /// Upper-case label used in prompt blocks
    pub fn label(&self) -> &'static str {
        match self {
            ContentType::ForumPost => "FORUM POST",
            ContentType::ForumTopic => "FORUM TOPIC",
            ContentType::Article => "ARTICLE",
            ContentType::Proposal => "PROPOSAL",
            ContentType::Wiki => "WIKI",
            ContentType::Event => "EVENT",
        }
    }
}
