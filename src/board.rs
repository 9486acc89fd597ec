//! View state for the incident board: the filtered list and map page.

use std::collections::BTreeSet;

use log::{log, Level};
use thiserror::Error;

use crate::{
    filter::FilterSelection,
    schema::model::Incident,
    taxonomy::{Category, Status},
    votes::Tally,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoardError {
    #[error("incidents are still loading")]
    NotLoaded,
    #[error("incident {0} is not on the board")]
    UnknownIncident(u64),
    #[error("the view has been torn down")]
    Unmounted,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LoadState<T> {
    Loading,
    Ready(T),
    Failed(String),
}

/// Handed out by `begin_load`. Only the newest ticket can write a result.
#[must_use]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
}

#[derive(Debug)]
pub struct Loader<T> {
    state: LoadState<T>,
    generation: u64,
    mounted: bool,
}

impl<T> Default for Loader<T> {
    fn default() -> Self {
        Self {
            state: LoadState::Loading,
            generation: 0,
            mounted: true,
        }
    }
}

impl<T> Loader<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &LoadState<T> {
        &self.state
    }

    pub fn ready(&self) -> Option<&T> {
        match &self.state {
            LoadState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn ready_mut(&mut self) -> Option<&mut T> {
        match &mut self.state {
            LoadState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn begin_load(&mut self) -> Result<LoadTicket, BoardError> {
        if !self.mounted {
            return Err(BoardError::Unmounted);
        }
        self.generation += 1;
        self.state = LoadState::Loading;
        Ok(LoadTicket {
            generation: self.generation,
        })
    }

    /// Same as `begin_load`; offered after a failure.
    pub fn retry(&mut self) -> Result<LoadTicket, BoardError> {
        self.begin_load()
    }

    /// Stores the result of a load. Returns false, leaving the state untouched,
    /// when the ticket is stale or the view was unmounted in the meantime.
    pub fn finish_load(&mut self, ticket: LoadTicket, result: anyhow::Result<T>) -> bool {
        if !self.mounted || ticket.generation != self.generation {
            log!(
                Level::Debug,
                "Discarding load result for generation {}",
                ticket.generation
            );
            return false;
        }
        self.state = match result {
            Ok(value) => LoadState::Ready(value),
            Err(e) => {
                log!(Level::Warn, "Load failed: {e}");
                LoadState::Failed(e.to_string())
            }
        };
        true
    }

    pub fn unmount(&mut self) {
        self.mounted = false;
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }
}

#[derive(Debug, Default)]
pub struct IncidentBoard {
    loader: Loader<Vec<Incident>>,
    selection: FilterSelection,
    // indices into the loaded incidents, in source order
    visible: Vec<usize>,
    selected: Option<u64>,
}

impl IncidentBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &LoadState<Vec<Incident>> {
        self.loader.state()
    }

    pub fn begin_load(&mut self) -> Result<LoadTicket, BoardError> {
        self.loader.begin_load()
    }

    pub fn retry(&mut self) -> Result<LoadTicket, BoardError> {
        self.loader.retry()
    }

    pub fn finish_load(&mut self, ticket: LoadTicket, result: anyhow::Result<Vec<Incident>>) -> bool {
        let applied = self.loader.finish_load(ticket, result);
        if applied {
            self.refresh();
        }
        applied
    }

    pub fn unmount(&mut self) {
        self.loader.unmount();
    }

    pub fn selection(&self) -> &FilterSelection {
        &self.selection
    }

    /// Badge count on the filter button.
    pub fn filter_badge(&self) -> usize {
        self.selection.active_count()
    }

    pub fn toggle_category(&mut self, category: Category) -> Result<bool, BoardError> {
        self.ensure_ready()?;
        let selected = self.selection.toggle_category(category);
        self.refresh();
        Ok(selected)
    }

    pub fn toggle_status(&mut self, status: Status) -> Result<bool, BoardError> {
        self.ensure_ready()?;
        let selected = self.selection.toggle_status(status);
        self.refresh();
        Ok(selected)
    }

    pub fn set_filters(
        &mut self,
        categories: BTreeSet<Category>,
        statuses: BTreeSet<Status>,
    ) -> Result<(), BoardError> {
        self.ensure_ready()?;
        self.selection.set(categories, statuses);
        self.refresh();
        Ok(())
    }

    pub fn reset_filters(&mut self) -> Result<(), BoardError> {
        self.ensure_ready()?;
        self.selection.reset();
        self.refresh();
        Ok(())
    }

    /// Incidents passing the current filters. Empty while loading or failed.
    pub fn visible(&self) -> Vec<&Incident> {
        match self.loader.ready() {
            Some(incidents) => self.visible.iter().map(|&i| &incidents[i]).collect(),
            None => Vec::new(),
        }
    }

    pub fn select(&mut self, id: u64) -> Result<&Incident, BoardError> {
        let incidents = self.loader.ready().ok_or(BoardError::NotLoaded)?;
        let incident = incidents
            .iter()
            .find(|incident| incident.id == id)
            .ok_or(BoardError::UnknownIncident(id))?;
        self.selected = Some(id);
        Ok(incident)
    }

    pub fn selected(&self) -> Option<&Incident> {
        let id = self.selected?;
        self.loader.ready()?.iter().find(|incident| incident.id == id)
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Writes a vote result back to the board. Only that incident changes.
    pub fn apply_tally(&mut self, id: u64, tally: Tally) -> Result<(), BoardError> {
        let incidents = self.loader.ready_mut().ok_or(BoardError::NotLoaded)?;
        let incident = incidents
            .iter_mut()
            .find(|incident| incident.id == id)
            .ok_or(BoardError::UnknownIncident(id))?;
        incident.upvotes = tally.upvotes;
        incident.downvotes = tally.downvotes;
        Ok(())
    }

    fn ensure_ready(&self) -> Result<(), BoardError> {
        match self.loader.ready() {
            Some(_) => Ok(()),
            None => Err(BoardError::NotLoaded),
        }
    }

    fn refresh(&mut self) {
        self.visible = match self.loader.ready() {
            Some(incidents) => incidents
                .iter()
                .enumerate()
                .filter(|(_, incident)| self.selection.matches(incident))
                .map(|(i, _)| i)
                .collect(),
            None => Vec::new(),
        };
    }
}
