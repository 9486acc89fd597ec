use std::collections::HashMap;

use chrono::{DateTime, Utc};
use log::{log, Level};
use thiserror::Error;

use crate::{
    comments::{CommentLedger, NewComment},
    filter::FilterSelection,
    schema::model::{Comment, Incident, Viewer},
    taxonomy::{Category, Status},
    utils::{parse_timestamp, ValidationErrors},
    votes::{Tally, Transition, VoteDirection, VoteError, VoteMachine, VoteReceipt, VoteState},
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Incident {0} could not be found")]
    NotFound(u64),
    #[error("{0}")]
    Conflict(&'static str),
    #[error(transparent)]
    Vote(#[from] VoteError),
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
}

/// What a vote call is allowed to do. Each HTTP verb maps to one kind, so a
/// `POST` never silently cancels an existing vote.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteIntent {
    Create,
    Change,
    Cancel,
}

impl VoteIntent {
    fn allows(&self, transition: Transition) -> Result<(), StoreError> {
        match (self, transition) {
            (VoteIntent::Create, Transition::Cast(_))
            | (VoteIntent::Change, Transition::Switch { .. })
            | (VoteIntent::Cancel, Transition::Cancel(_)) => Ok(()),
            (VoteIntent::Create, _) => Err(StoreError::Conflict(
                "A vote already exists, use PUT to change it or DELETE to cancel it",
            )),
            (VoteIntent::Change, Transition::Cast(_)) => {
                Err(StoreError::Conflict("There is no vote to change"))
            }
            (VoteIntent::Change, _) => {
                Err(StoreError::Conflict("The vote already has that direction"))
            }
            (VoteIntent::Cancel, _) => Err(StoreError::Conflict("There is no vote to cancel")),
        }
    }
}

/// Process-lifetime state of the local API: incidents in upstream order plus a
/// vote machine and comment ledger per incident, created on first use.
#[derive(Default)]
pub struct IncidentStore {
    loaded: bool,
    incidents: Vec<Incident>,
    votes: HashMap<u64, VoteMachine>,
    comments: HashMap<u64, CommentLedger>,
}

impl IncidentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_incidents(incidents: Vec<Incident>) -> Self {
        let mut store = Self::new();
        store.load(incidents);
        store
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn load(&mut self, incidents: Vec<Incident>) {
        log!(Level::Info, "Loaded {} incidents", incidents.len());
        self.incidents = incidents;
        self.votes.clear();
        self.comments.clear();
        self.loaded = true;
    }

    /// Adds an incident found through a single-record lookup.
    pub fn insert(&mut self, incident: Incident) {
        if self.get(incident.id).is_none() {
            self.incidents.push(incident);
        }
    }

    pub fn list(&self, selection: &FilterSelection) -> Vec<Incident> {
        selection
            .apply(&self.incidents)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn get(&self, id: u64) -> Option<&Incident> {
        self.incidents.iter().find(|incident| incident.id == id)
    }

    fn get_mut(&mut self, id: u64) -> Result<&mut Incident, StoreError> {
        self.incidents
            .iter_mut()
            .find(|incident| incident.id == id)
            .ok_or(StoreError::NotFound(id))
    }

    fn machine(&mut self, id: u64) -> Result<&mut VoteMachine, StoreError> {
        let incident = self
            .incidents
            .iter()
            .find(|incident| incident.id == id)
            .ok_or(StoreError::NotFound(id))?;
        let tally = Tally::new(incident.upvotes, incident.downvotes);
        Ok(self
            .votes
            .entry(id)
            .or_insert_with(|| VoteMachine::new(id, tally)))
    }

    pub fn vote_state(&mut self, id: u64, viewer: &str) -> Result<(VoteState, Tally), StoreError> {
        let machine = self.machine(id)?;
        Ok((machine.state_of(viewer), machine.tally()))
    }

    pub fn vote(
        &mut self,
        id: u64,
        viewer: &str,
        intent: VoteIntent,
        direction: Option<VoteDirection>,
        identity: Option<Viewer>,
    ) -> Result<VoteReceipt, StoreError> {
        let machine = self.machine(id)?;
        let direction = match (intent, direction) {
            (_, Some(direction)) => direction,
            (VoteIntent::Cancel, None) => match machine.state_of(viewer) {
                VoteState::VotedUp => VoteDirection::Up,
                VoteState::VotedDown => VoteDirection::Down,
                VoteState::NoVote => {
                    return Err(StoreError::Conflict("There is no vote to cancel"))
                }
            },
            (_, None) => return Err(StoreError::Conflict("A vote direction is required")),
        };

        let pending = machine.begin(viewer, direction)?;
        if let Err(e) = intent.allows(pending.transition()) {
            machine.abort(pending);
            return Err(e);
        }
        let receipt = machine.complete(pending, identity)?;

        let incident = self.get_mut(id)?;
        incident.upvotes = receipt.tally.upvotes;
        incident.downvotes = receipt.tally.downvotes;
        Ok(receipt)
    }

    pub fn add_comment(
        &mut self,
        id: u64,
        new: NewComment,
        now: DateTime<Utc>,
    ) -> Result<Comment, StoreError> {
        self.get_mut(id)?;
        let comment = self
            .comments
            .entry(id)
            .or_insert_with(|| CommentLedger::new(id))
            .add_comment(new, now)?
            .clone();
        let incident = self.get_mut(id)?;
        incident.comments_count = incident.comments_count.saturating_add(1);
        Ok(comment)
    }

    pub fn comments(&self, id: u64) -> Result<Vec<Comment>, StoreError> {
        if self.get(id).is_none() {
            return Err(StoreError::NotFound(id));
        }
        Ok(self
            .comments
            .get(&id)
            .map(|ledger| ledger.comments().cloned().collect())
            .unwrap_or_default())
    }
}

/// Incidents served when no upstream reports API is configured.
pub fn sample_incidents() -> Vec<Incident> {
    let at = |raw: &str| parse_timestamp(raw).unwrap_or_else(Utc::now);
    vec![
        Incident {
            id: 1,
            title: "Bache peligroso en calle principal".into(),
            description: "Hay un bache muy grande y peligroso en mitad de la calle que está causando daños a los vehículos y es un riesgo para motocicletas.".into(),
            category: Category::Road,
            status: Status::Active,
            latitude: 40.416775,
            longitude: -3.70379,
            address: "Calle Gran Vía 28, Madrid".into(),
            created_at: at("2023-08-15T10:30:00"),
            updated_at: at("2023-08-15T10:30:00"),
            upvotes: 23,
            downvotes: 2,
            comments_count: 5,
            image_url: None,
        },
        Incident {
            id: 2,
            title: "Farola sin funcionar desde hace semanas".into(),
            description: "La farola de la esquina no funciona desde hace semanas, dejando la zona muy oscura por la noche y creando inseguridad.".into(),
            category: Category::Lighting,
            status: Status::InProgress,
            latitude: 40.418075,
            longitude: -3.70479,
            address: "Plaza de España 5, Madrid".into(),
            created_at: at("2023-08-10T15:45:00"),
            updated_at: at("2023-08-12T09:20:00"),
            upvotes: 15,
            downvotes: 0,
            comments_count: 3,
            image_url: None,
        },
        Incident {
            id: 3,
            title: "Acumulación de basura junto a contenedores".into(),
            description: "Los contenedores de basura están desbordados desde hace días y la basura se acumula a su alrededor, generando mal olor y suciedad.".into(),
            category: Category::Trash,
            status: Status::Resolved,
            latitude: 40.417275,
            longitude: -3.70279,
            address: "Calle Princesa 12, Madrid".into(),
            created_at: at("2023-08-05T18:20:00"),
            updated_at: at("2023-08-08T11:10:00"),
            upvotes: 28,
            downvotes: 1,
            comments_count: 7,
            image_url: None,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewer() -> Option<Viewer> {
        Some(Viewer {
            name: "Marta".into(),
            phone: "611222333".into(),
            dni: Some("12345678Z".into()),
        })
    }

    fn store() -> IncidentStore {
        IncidentStore::from_incidents(sample_incidents())
    }

    #[test]
    fn votes_update_incident_counters() {
        let mut store = store();
        store
            .vote(1, "s1", VoteIntent::Create, Some(VoteDirection::Up), viewer())
            .unwrap();
        assert_eq!(store.get(1).unwrap().upvotes, 24);

        let receipt = store
            .vote(1, "s1", VoteIntent::Cancel, None, None)
            .unwrap();
        assert_eq!(receipt.state, VoteState::NoVote);
        assert_eq!(store.get(1).unwrap().upvotes, 23);
    }

    #[test]
    fn intent_mismatch_is_a_conflict_without_changes() {
        let mut store = store();
        store
            .vote(1, "s1", VoteIntent::Create, Some(VoteDirection::Down), viewer())
            .unwrap();
        let err = store
            .vote(1, "s1", VoteIntent::Create, Some(VoteDirection::Up), viewer())
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        let err = store
            .vote(1, "s1", VoteIntent::Change, Some(VoteDirection::Down), viewer())
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.vote_state(1, "s1").unwrap(), (VoteState::VotedDown, Tally::new(23, 3)));

        store
            .vote(1, "s1", VoteIntent::Change, Some(VoteDirection::Up), viewer())
            .unwrap();
        assert_eq!(store.vote_state(1, "s1").unwrap(), (VoteState::VotedUp, Tally::new(24, 2)));
    }

    #[test]
    fn cancel_without_vote_conflicts() {
        let mut store = store();
        let err = store.vote(2, "s1", VoteIntent::Cancel, None, None).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn unknown_incident() {
        let mut store = store();
        assert!(matches!(
            store.vote(99, "s1", VoteIntent::Create, Some(VoteDirection::Up), viewer()),
            Err(StoreError::NotFound(99))
        ));
        assert!(matches!(store.comments(99), Err(StoreError::NotFound(99))));
    }

    #[test]
    fn comments_bump_count() {
        let mut store = store();
        let now = Utc::now();
        let new = NewComment {
            author: "Marta".into(),
            phone: "611222333".into(),
            dni: None,
            content: "Sigue sin arreglar".into(),
        };
        let comment = store.add_comment(3, new, now).unwrap();
        assert_eq!(comment.id, 1);
        assert_eq!(store.get(3).unwrap().comments_count, 8);
        assert_eq!(store.comments(3).unwrap().len(), 1);

        let invalid = NewComment {
            author: "M".into(),
            ..Default::default()
        };
        assert!(matches!(
            store.add_comment(3, invalid, now),
            Err(StoreError::Validation(_))
        ));
        assert_eq!(store.get(3).unwrap().comments_count, 8);
    }

    #[test]
    fn listing_applies_filters() {
        let store = store();
        let selection = FilterSelection::with([Category::Road, Category::Trash], [Status::Resolved]);
        let ids: Vec<u64> = store.list(&selection).iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![3]);
    }
}
