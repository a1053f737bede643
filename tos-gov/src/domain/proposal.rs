//! Proposal value and lifecycle rules

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::check_length;
use tos_common::models::{DecisionOutcome, ProposalStatus, ScopeType};
use tos_common::{Error, Result};

pub const TITLE_MIN: usize = 3;
pub const TITLE_MAX: usize = 200;
pub const SUMMARY_MIN: usize = 10;
pub const SUMMARY_MAX: usize = 2000;
pub const MINORITY_REPORT_MAX: usize = 5000;

/// A governance proposal
///
/// Immutable: every change produces a new value sharing `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: Uuid,
    pub scope_type: ScopeType,
    /// Author for individual proposals, group id otherwise
    pub scope_id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub summary: String,
    pub status: ProposalStatus,
    pub minority_report: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decision_outcome: Option<DecisionOutcome>,
    pub bridge_similarity_check_done: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Fields a member supplies to create a proposal
#[derive(Debug, Clone, Deserialize)]
pub struct NewProposal {
    pub scope_type: ScopeType,
    pub scope_id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub summary: String,
}

/// Partial update; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProposalChanges {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub status: Option<ProposalStatus>,
    pub minority_report: Option<String>,
    pub decision_outcome: Option<DecisionOutcome>,
    pub bridge_similarity_check_done: Option<bool>,
}

impl ProposalChanges {
    /// Title or summary edits
    pub fn touches_content(&self) -> bool {
        self.title.is_some() || self.summary.is_some()
    }

    pub fn is_empty(&self) -> bool {
        *self == ProposalChanges::default()
    }
}

impl Proposal {
    /// Validate and build a new draft
    pub fn create(input: NewProposal) -> Result<Self> {
        Self::create_at(input, Utc::now())
    }

    pub fn create_at(input: NewProposal, now: DateTime<Utc>) -> Result<Self> {
        if input.author_id.is_nil() {
            return Err(Error::Validation("author_id is required".into()));
        }
        if input.scope_id.is_nil() {
            return Err(Error::Validation("scope_id is required".into()));
        }
        if input.scope_type == ScopeType::Individual && input.scope_id != input.author_id {
            return Err(Error::Validation(
                "Individual proposals must have scope_id equal to author_id".into(),
            ));
        }
        check_length("title", &input.title, TITLE_MIN, TITLE_MAX)?;
        check_length("summary", &input.summary, SUMMARY_MIN, SUMMARY_MAX)?;

        Ok(Self {
            id: Uuid::new_v4(),
            scope_type: input.scope_type,
            scope_id: input.scope_id,
            author_id: input.author_id,
            title: input.title,
            summary: input.summary,
            status: ProposalStatus::Draft,
            minority_report: None,
            decided_at: None,
            decision_outcome: None,
            bridge_similarity_check_done: false,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    /// Apply field changes without checking the status table
    ///
    /// `decided_at` is stamped when `changes.status` is `decided` and is never
    /// cleared afterwards.
    pub fn update(&self, changes: ProposalChanges) -> Result<Self> {
        self.update_at(changes, Utc::now())
    }

    pub fn update_at(&self, changes: ProposalChanges, now: DateTime<Utc>) -> Result<Self> {
        if let Some(title) = &changes.title {
            check_length("title", title, TITLE_MIN, TITLE_MAX)?;
        }
        if let Some(summary) = &changes.summary {
            check_length("summary", summary, SUMMARY_MIN, SUMMARY_MAX)?;
        }
        if let Some(report) = &changes.minority_report {
            check_length("minority_report", report, 0, MINORITY_REPORT_MAX)?;
        }

        let mut next = self.clone();
        if let Some(title) = changes.title {
            next.title = title;
        }
        if let Some(summary) = changes.summary {
            next.summary = summary;
        }
        if let Some(report) = changes.minority_report {
            next.minority_report = Some(report);
        }
        if let Some(outcome) = changes.decision_outcome {
            next.decision_outcome = Some(outcome);
        }
        if let Some(done) = changes.bridge_similarity_check_done {
            next.bridge_similarity_check_done = done;
        }
        if let Some(status) = changes.status {
            next.status = status;
            if status == ProposalStatus::Decided {
                next.decided_at = Some(now);
            }
        }
        next.updated_at = now;
        Ok(next)
    }

    /// Move to `new_status` if the lifecycle table allows it
    pub fn transition_to(&self, new_status: ProposalStatus) -> Result<Self> {
        self.transition_to_at(new_status, Utc::now())
    }

    pub fn transition_to_at(&self, new_status: ProposalStatus, now: DateTime<Utc>) -> Result<Self> {
        if !self.status.can_transition_to(new_status) {
            return Err(Error::invalid_transition(
                self.status,
                new_status,
                self.status.allowed_transitions(),
            ));
        }
        self.update_at(
            ProposalChanges {
                status: Some(new_status),
                ..Default::default()
            },
            now,
        )
    }

    /// Soft delete; status is left as it was
    pub fn delete(&self) -> Self {
        self.delete_at(Utc::now())
    }

    pub fn delete_at(&self, now: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.deleted_at = Some(now);
        next.updated_at = now;
        next
    }

    /// Content may only be edited while in draft
    pub fn is_editable(&self) -> bool {
        self.status == ProposalStatus::Draft
    }

    pub fn is_individual(&self) -> bool {
        self.scope_type == ScopeType::Individual
    }

    pub fn is_group(&self) -> bool {
        self.scope_type == ScopeType::Group
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[cfg(test)]
pub(crate) fn sample_input(author: Uuid) -> NewProposal {
    NewProposal {
        scope_type: ScopeType::Individual,
        scope_id: author,
        author_id: author,
        title: "Community garden".to_string(),
        summary: "Convert the empty lot into shared garden beds.".to_string(),
    }
}
