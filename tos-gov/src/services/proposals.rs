//! Proposal CRUD with lifecycle enforcement

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::domain::{NewProposal, Proposal, ProposalChanges};
use crate::repo::{ProposalFilter, Repos};
use crate::worker::{Task, TaskQueue};
use tos_common::events::{EventBus, TosEvent};
use tos_common::{time, Error, Result};

/// One page of a proposal listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProposalPage {
    pub proposals: Vec<Proposal>,
    pub total: u64,
    pub page: usize,
    pub page_size: usize,
}

#[derive(Clone)]
pub struct ProposalService {
    repos: Repos,
    tasks: TaskQueue,
    events: EventBus,
}

impl ProposalService {
    pub fn new(repos: Repos, tasks: TaskQueue, events: EventBus) -> Self {
        Self { repos, tasks, events }
    }

    /// Store a new draft and schedule its assessment and indexing
    pub async fn create(&self, input: NewProposal) -> Result<Proposal> {
        let proposal = Proposal::create(input)?;
        self.repos.proposals.save(&proposal).await?;

        info!(proposal_id = %proposal.id, author_id = %proposal.author_id, "Proposal created");
        self.events.emit_lossy(TosEvent::ProposalCreated {
            proposal_id: proposal.id,
            author_id: proposal.author_id,
            title: proposal.title.clone(),
            timestamp: proposal.created_at,
        });

        self.tasks.enqueue(Task::AssessProposal { proposal_id: proposal.id });
        self.tasks.enqueue(Task::IndexProposal { proposal_id: proposal.id });
        Ok(proposal)
    }

    pub async fn get(&self, id: Uuid) -> Result<Proposal> {
        self.repos
            .proposals
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Proposal {}", id)))
    }

    pub async fn list(&self, filter: &ProposalFilter) -> Result<ProposalPage> {
        let proposals = self.repos.proposals.list(filter).await?;
        let total = self.repos.proposals.count(filter).await?;
        Ok(ProposalPage {
            proposals,
            total,
            page: filter.page(),
            page_size: filter.limit(),
        })
    }

    /// Author-only update
    ///
    /// A status change must follow the lifecycle table; title and summary
    /// edits are only accepted while the proposal is a draft.
    pub async fn update(&self, id: Uuid, actor_id: Uuid, changes: ProposalChanges) -> Result<Proposal> {
        let current = self.get(id).await?;
        ensure_author(&current, actor_id)?;

        if changes.is_empty() {
            return Ok(current);
        }
        if changes.touches_content() && !current.is_editable() {
            return Err(Error::Validation(format!(
                "Proposal content can only be edited in draft (status is {})",
                current.status
            )));
        }

        let touches_content = changes.touches_content();
        let transitioned = match changes.status {
            Some(status) if status != current.status => current.transition_to(status)?,
            _ => current,
        };
        let next = transitioned.update(ProposalChanges {
            status: None,
            ..changes
        })?;
        self.repos.proposals.save(&next).await?;

        info!(proposal_id = %id, status = %next.status, "Proposal updated");
        self.events.emit_lossy(TosEvent::ProposalUpdated {
            proposal_id: id,
            status: next.status,
            timestamp: next.updated_at,
        });

        if touches_content {
            self.tasks.enqueue(Task::IndexProposal { proposal_id: id });
        }
        Ok(next)
    }

    /// Author-only soft delete
    pub async fn delete(&self, id: Uuid, actor_id: Uuid) -> Result<()> {
        let current = self.get(id).await?;
        ensure_author(&current, actor_id)?;

        let deleted = current.delete_at(time::now());
        self.repos.proposals.save(&deleted).await?;

        info!(proposal_id = %id, "Proposal deleted");
        self.events.emit_lossy(TosEvent::ProposalDeleted {
            proposal_id: id,
            timestamp: deleted.updated_at,
        });
        self.tasks.enqueue(Task::RemoveFromIndex { proposal_id: id });
        Ok(())
    }
}

fn ensure_author(proposal: &Proposal, actor_id: Uuid) -> Result<()> {
    if proposal.author_id != actor_id {
        return Err(Error::Forbidden(
            "Only the author may modify this proposal".into(),
        ));
    }
    Ok(())
}
