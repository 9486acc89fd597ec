use chrono::{DateTime, Utc};
use log::{log, Level};

use crate::{
    comments::{CommentLedger, NewComment, EMPTY_LEDGER_MESSAGE},
    format::{format_detail_date, format_relative_time},
    schema::model::{Comment, Incident, Viewer},
    utils::{validate_viewer, ValidationErrors},
    votes::{PendingVote, Tally, VoteDirection, VoteError, VoteMachine, VoteReceipt, VoteState},
};

/// What the view should do after a vote button is pressed.
#[derive(Debug, PartialEq, Eq)]
pub enum VotePrompt {
    /// Ask for name and phone, then call `provide_identity`.
    IdentityNeeded,
    Done(VoteReceipt),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommentRow {
    pub initial: char,
    pub author: String,
    pub when: String,
    pub content: String,
}

impl CommentRow {
    fn of(comment: &Comment, now: DateTime<Utc>) -> Self {
        Self {
            initial: comment
                .author
                .chars()
                .next()
                .and_then(|c| c.to_uppercase().next())
                .unwrap_or('?'),
            author: comment.author.clone(),
            when: format_relative_time(comment.created_at, now),
            content: comment.content.clone(),
        }
    }
}

/// Detail page of one incident, owning its vote machine and comment ledger.
/// Nothing done here touches any other incident.
#[derive(Debug)]
pub struct IncidentDetail {
    incident: Incident,
    votes: VoteMachine,
    ledger: CommentLedger,
    viewer: String,
    pending: Option<PendingVote>,
}

impl IncidentDetail {
    pub fn new(incident: Incident, viewer: impl Into<String>) -> Self {
        let ledger = CommentLedger::new(incident.id);
        Self::with_ledger(incident, viewer, ledger)
    }

    pub fn with_comments(
        incident: Incident,
        viewer: impl Into<String>,
        newest_first: Vec<Comment>,
    ) -> Self {
        let ledger = CommentLedger::with_comments(incident.id, newest_first);
        Self::with_ledger(incident, viewer, ledger)
    }

    fn with_ledger(incident: Incident, viewer: impl Into<String>, ledger: CommentLedger) -> Self {
        let tally = Tally::new(incident.upvotes, incident.downvotes);
        Self {
            votes: VoteMachine::new(incident.id, tally),
            incident,
            ledger,
            viewer: viewer.into(),
            pending: None,
        }
    }

    pub fn incident(&self) -> &Incident {
        &self.incident
    }

    pub fn tally(&self) -> Tally {
        self.votes.tally()
    }

    pub fn vote_state(&self) -> VoteState {
        self.votes.state_of(&self.viewer)
    }

    pub fn status_line(&self) -> Option<&'static str> {
        self.votes.status_line(&self.viewer)
    }

    pub fn is_submitting(&self) -> bool {
        self.pending.is_some()
    }

    pub fn created_label(&self) -> String {
        format_detail_date(self.incident.created_at)
    }

    pub fn updated_label(&self) -> String {
        format_detail_date(self.incident.updated_at)
    }

    /// Casting or switching opens the identity prompt and holds the viewer's
    /// slot until it is answered. Cancelling completes at once.
    pub fn press_vote(&mut self, direction: VoteDirection) -> Result<VotePrompt, VoteError> {
        let pending = self.votes.begin(&self.viewer, direction)?;
        if pending.needs_identity() {
            self.pending = Some(pending);
            return Ok(VotePrompt::IdentityNeeded);
        }
        let receipt = self.votes.complete(pending, None)?;
        self.sync_tally(&receipt);
        Ok(VotePrompt::Done(receipt))
    }

    /// Answers the identity prompt. Invalid input keeps the prompt open.
    pub fn provide_identity(&mut self, identity: Viewer) -> Result<VoteReceipt, VoteError> {
        if self.pending.is_none() {
            return Err(VoteError::StaleTicket);
        }
        validate_viewer(&identity).map_err(VoteError::InvalidIdentity)?;
        let pending = self.pending.take().ok_or(VoteError::StaleTicket)?;
        let receipt = self.votes.complete(pending, Some(identity))?;
        self.sync_tally(&receipt);
        Ok(receipt)
    }

    /// Closing the prompt drops the submission without touching the tally.
    pub fn cancel_identity_prompt(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => {
                log!(
                    Level::Debug,
                    "Identity prompt closed for incident {}",
                    self.incident.id
                );
                self.votes.abort(pending);
                true
            }
            None => false,
        }
    }

    pub fn add_comment(
        &mut self,
        new: NewComment,
        now: DateTime<Utc>,
    ) -> Result<&Comment, ValidationErrors> {
        let comment = self.ledger.add_comment(new, now)?;
        self.incident.comments_count = self.incident.comments_count.saturating_add(1);
        Ok(comment)
    }

    pub fn comments_heading(&self) -> String {
        self.ledger.heading()
    }

    pub fn comment_rows(&self, now: DateTime<Utc>) -> Vec<CommentRow> {
        self.ledger
            .comments()
            .map(|comment| CommentRow::of(comment, now))
            .collect()
    }

    /// Placeholder shown instead of the list when nobody has commented.
    pub fn empty_message(&self) -> Option<&'static str> {
        self.ledger.is_empty().then_some(EMPTY_LEDGER_MESSAGE)
    }

    fn sync_tally(&mut self, receipt: &VoteReceipt) {
        self.incident.upvotes = receipt.tally.upvotes;
        self.incident.downvotes = receipt.tally.downvotes;
    }
}
