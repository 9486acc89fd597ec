//! Per-incident vote tally with one vote per viewer.

use std::collections::{HashMap, HashSet};

use log::{log, Level};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::{
    schema::model::Viewer,
    utils::{validate_viewer, ValidationErrors},
};

/// Opaque key of a viewer session.
pub type ViewerId = String;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    /// The incident is still active.
    Up,
    /// The incident no longer exists.
    Down,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VoteState {
    NoVote,
    VotedUp,
    VotedDown,
}

impl From<Option<VoteDirection>> for VoteState {
    fn from(direction: Option<VoteDirection>) -> Self {
        match direction {
            None => VoteState::NoVote,
            Some(VoteDirection::Up) => VoteState::VotedUp,
            Some(VoteDirection::Down) => VoteState::VotedDown,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct Tally {
    pub upvotes: u32,
    pub downvotes: u32,
}

impl Tally {
    pub fn new(upvotes: u32, downvotes: u32) -> Self {
        Self { upvotes, downvotes }
    }

    pub fn total(&self) -> u32 {
        self.upvotes.saturating_add(self.downvotes)
    }

    /// Returns the tally after the transition. Both counters change in the same
    /// value so callers never see a half-applied switch.
    pub fn apply(self, transition: Transition) -> Tally {
        let (mut up, mut down) = (self.upvotes, self.downvotes);
        let mut adjust = |direction: VoteDirection, delta: i8| {
            let counter = match direction {
                VoteDirection::Up => &mut up,
                VoteDirection::Down => &mut down,
            };
            *counter = if delta > 0 {
                counter.saturating_add(1)
            } else {
                counter.saturating_sub(1)
            };
        };
        match transition {
            Transition::Cast(direction) => adjust(direction, 1),
            Transition::Cancel(direction) => adjust(direction, -1),
            Transition::Switch { from, to } => {
                adjust(from, -1);
                adjust(to, 1);
            }
        }
        Tally {
            upvotes: up,
            downvotes: down,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Cast(VoteDirection),
    Cancel(VoteDirection),
    Switch {
        from: VoteDirection,
        to: VoteDirection,
    },
}

impl Transition {
    pub fn between(current: Option<VoteDirection>, requested: VoteDirection) -> Self {
        match current {
            None => Transition::Cast(requested),
            Some(current) if current == requested => Transition::Cancel(requested),
            Some(current) => Transition::Switch {
                from: current,
                to: requested,
            },
        }
    }

    /// Casting and switching capture identity, cancelling reuses the stored one.
    pub fn needs_identity(&self) -> bool {
        !matches!(self, Transition::Cancel(_))
    }

    fn resulting_direction(&self) -> Option<VoteDirection> {
        match *self {
            Transition::Cast(direction) => Some(direction),
            Transition::Cancel(_) => None,
            Transition::Switch { to, .. } => Some(to),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VoteOutcome {
    ConfirmedActive,
    ConfirmedResolved,
    Canceled,
}

impl VoteOutcome {
    fn of(transition: Transition) -> Self {
        match transition.resulting_direction() {
            Some(VoteDirection::Up) => VoteOutcome::ConfirmedActive,
            Some(VoteDirection::Down) => VoteOutcome::ConfirmedResolved,
            None => VoteOutcome::Canceled,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            VoteOutcome::ConfirmedActive => "Confirmaste que la incidencia sigue activa",
            VoteOutcome::ConfirmedResolved => "Confirmaste que la incidencia ya no está activa",
            VoteOutcome::Canceled => "Voto cancelado",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VoteError {
    #[error("a vote from this viewer is already being submitted")]
    InFlight,
    #[error("name and phone are required to cast or change a vote")]
    IdentityRequired,
    #[error("invalid identity: {0}")]
    InvalidIdentity(ValidationErrors),
    #[error("the vote changed since the submission started")]
    StaleTicket,
}

/// Ticket for a submission that has started but not yet been applied.
#[must_use = "a pending vote must be completed or aborted to release the viewer"]
#[derive(Debug, PartialEq, Eq)]
pub struct PendingVote {
    incident_id: u64,
    viewer: ViewerId,
    requested: VoteDirection,
    transition: Transition,
}

impl PendingVote {
    pub fn viewer(&self) -> &str {
        &self.viewer
    }

    pub fn requested(&self) -> VoteDirection {
        self.requested
    }

    pub fn transition(&self) -> Transition {
        self.transition
    }

    pub fn needs_identity(&self) -> bool {
        self.transition.needs_identity()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoteReceipt {
    pub outcome: VoteOutcome,
    pub state: VoteState,
    pub tally: Tally,
    /// Who the vote is attributed to. For cancellations this is the identity
    /// given when the vote was cast.
    pub voter: Viewer,
}

impl VoteReceipt {
    pub fn message(&self) -> &'static str {
        self.outcome.message()
    }
}

#[derive(Clone, Debug)]
struct VoteRecord {
    direction: VoteDirection,
    voter: Viewer,
}

#[derive(Clone, Debug)]
pub struct VoteMachine {
    incident_id: u64,
    tally: Tally,
    votes: HashMap<ViewerId, VoteRecord>,
    in_flight: HashSet<ViewerId>,
}

impl VoteMachine {
    pub fn new(incident_id: u64, tally: Tally) -> Self {
        Self {
            incident_id,
            tally,
            votes: HashMap::new(),
            in_flight: HashSet::new(),
        }
    }

    pub fn incident_id(&self) -> u64 {
        self.incident_id
    }

    pub fn tally(&self) -> Tally {
        self.tally
    }

    pub fn state_of(&self, viewer: &str) -> VoteState {
        self.votes.get(viewer).map(|record| record.direction).into()
    }

    pub fn voter(&self, viewer: &str) -> Option<&Viewer> {
        self.votes.get(viewer).map(|record| &record.voter)
    }

    pub fn is_in_flight(&self, viewer: &str) -> bool {
        self.in_flight.contains(viewer)
    }

    /// Text shown under the vote buttons while the viewer holds a vote.
    pub fn status_line(&self, viewer: &str) -> Option<&'static str> {
        match self.state_of(viewer) {
            VoteState::NoVote => None,
            VoteState::VotedUp => Some("Has confirmado que esta incidencia sigue activa"),
            VoteState::VotedDown => Some("Has confirmado que esta incidencia ya no existe"),
        }
    }

    pub fn begin(
        &mut self,
        viewer: &str,
        direction: VoteDirection,
    ) -> Result<PendingVote, VoteError> {
        if self.in_flight.contains(viewer) {
            log!(
                Level::Debug,
                "Dropping vote on incident {} while another is in flight",
                self.incident_id
            );
            return Err(VoteError::InFlight);
        }
        let current = self.votes.get(viewer).map(|record| record.direction);
        self.in_flight.insert(viewer.to_string());
        Ok(PendingVote {
            incident_id: self.incident_id,
            viewer: viewer.to_string(),
            requested: direction,
            transition: Transition::between(current, direction),
        })
    }

    /// Applies a pending submission. The viewer is released whatever the result,
    /// and on error no counter is touched. A ticket issued by another machine
    /// releases nothing here.
    pub fn complete(
        &mut self,
        pending: PendingVote,
        identity: Option<Viewer>,
    ) -> Result<VoteReceipt, VoteError> {
        if pending.incident_id != self.incident_id {
            return Err(VoteError::StaleTicket);
        }
        self.in_flight.remove(&pending.viewer);

        let current = self.votes.get(&pending.viewer).map(|record| record.direction);
        let transition = Transition::between(current, pending.requested);
        if transition != pending.transition {
            return Err(VoteError::StaleTicket);
        }

        let voter = if transition.needs_identity() {
            let identity = identity.ok_or(VoteError::IdentityRequired)?;
            validate_viewer(&identity).map_err(VoteError::InvalidIdentity)?;
            identity
        } else {
            match self.votes.get(&pending.viewer) {
                Some(record) => record.voter.clone(),
                None => return Err(VoteError::StaleTicket),
            }
        };

        self.tally = self.tally.apply(transition);
        match transition.resulting_direction() {
            Some(direction) => {
                self.votes.insert(
                    pending.viewer.clone(),
                    VoteRecord {
                        direction,
                        voter: voter.clone(),
                    },
                );
            }
            None => {
                self.votes.remove(&pending.viewer);
            }
        }

        let outcome = VoteOutcome::of(transition);
        log!(
            Level::Info,
            "Vote on incident {}: {:?} -> {}/{}",
            self.incident_id,
            outcome,
            self.tally.upvotes,
            self.tally.downvotes
        );
        Ok(VoteReceipt {
            outcome,
            state: self.state_of(&pending.viewer),
            tally: self.tally,
            voter,
        })
    }

    /// Releases the viewer without changing anything.
    pub fn abort(&mut self, pending: PendingVote) {
        if pending.incident_id != self.incident_id {
            return;
        }
        self.in_flight.remove(&pending.viewer);
    }

    pub fn submit(
        &mut self,
        viewer: &str,
        direction: VoteDirection,
        identity: Option<Viewer>,
    ) -> Result<VoteReceipt, VoteError> {
        let pending = self.begin(viewer, direction)?;
        self.complete(pending, identity)
    }
}
