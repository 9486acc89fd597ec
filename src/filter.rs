use std::collections::BTreeSet;

use thiserror::Error;

use crate::{
    schema::model::Incident,
    taxonomy::{Category, Status},
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterParseError {
    #[error("unknown category: {0}")]
    UnknownCategory(String),
    #[error("unknown status: {0}")]
    UnknownStatus(String),
}

// An empty set places no constraint on its dimension.
fn is_selected(
    incident: &Incident,
    categories: &BTreeSet<Category>,
    statuses: &BTreeSet<Status>,
) -> bool {
    (categories.is_empty() || categories.contains(&incident.category))
        && (statuses.is_empty() || statuses.contains(&incident.status))
}

/// Stable sub-sequence of `incidents` passing both sets.
pub fn filter_incidents<'a>(
    incidents: &'a [Incident],
    categories: &BTreeSet<Category>,
    statuses: &BTreeSet<Status>,
) -> Vec<&'a Incident> {
    incidents
        .iter()
        .filter(|incident| is_selected(incident, categories, statuses))
        .collect()
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterSelection {
    categories: BTreeSet<Category>,
    statuses: BTreeSet<Status>,
}

impl FilterSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(
        categories: impl IntoIterator<Item = Category>,
        statuses: impl IntoIterator<Item = Status>,
    ) -> Self {
        Self {
            categories: categories.into_iter().collect(),
            statuses: statuses.into_iter().collect(),
        }
    }

    /// Builds a selection from comma separated query values such as
    /// `road,lighting`. Blank values select nothing.
    pub fn from_query(
        categories: Option<&str>,
        statuses: Option<&str>,
    ) -> Result<Self, FilterParseError> {
        let mut selection = Self::new();
        for raw in split_values(categories) {
            let category =
                Category::parse(raw).ok_or_else(|| FilterParseError::UnknownCategory(raw.into()))?;
            selection.categories.insert(category);
        }
        for raw in split_values(statuses) {
            let status =
                Status::parse(raw).ok_or_else(|| FilterParseError::UnknownStatus(raw.into()))?;
            selection.statuses.insert(status);
        }
        Ok(selection)
    }

    pub fn categories(&self) -> &BTreeSet<Category> {
        &self.categories
    }

    pub fn statuses(&self) -> &BTreeSet<Status> {
        &self.statuses
    }

    /// Returns whether the category is selected after the toggle.
    pub fn toggle_category(&mut self, category: Category) -> bool {
        if !self.categories.remove(&category) {
            self.categories.insert(category);
            return true;
        }
        false
    }

    /// Returns whether the status is selected after the toggle.
    pub fn toggle_status(&mut self, status: Status) -> bool {
        if !self.statuses.remove(&status) {
            self.statuses.insert(status);
            return true;
        }
        false
    }

    pub fn set(&mut self, categories: BTreeSet<Category>, statuses: BTreeSet<Status>) {
        self.categories = categories;
        self.statuses = statuses;
    }

    pub fn reset(&mut self) {
        self.categories.clear();
        self.statuses.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.statuses.is_empty()
    }

    /// Number of selected values across both dimensions.
    pub fn active_count(&self) -> usize {
        self.categories.len() + self.statuses.len()
    }

    pub fn matches(&self, incident: &Incident) -> bool {
        is_selected(incident, &self.categories, &self.statuses)
    }

    pub fn apply<'a>(&self, incidents: &'a [Incident]) -> Vec<&'a Incident> {
        filter_incidents(incidents, &self.categories, &self.statuses)
    }
}

fn split_values(raw: Option<&str>) -> impl Iterator<Item = &str> {
    raw.unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    pub(crate) fn incident(id: u64, category: Category, status: Status) -> Incident {
        let at = Utc.with_ymd_and_hms(2023, 8, 15, 10, 30, 0).unwrap();
        Incident {
            id,
            title: format!("incident {id}"),
            description: String::new(),
            category,
            status,
            latitude: 40.416775,
            longitude: -3.70379,
            address: "Calle Gran Vía 28, Madrid".into(),
            created_at: at,
            updated_at: at,
            upvotes: 0,
            downvotes: 0,
            comments_count: 0,
            image_url: None,
        }
    }

    fn ids(incidents: &[&Incident]) -> Vec<u64> {
        incidents.iter().map(|i| i.id).collect()
    }

    fn sample() -> Vec<Incident> {
        vec![
            incident(1, Category::Road, Status::Active),
            incident(2, Category::Lighting, Status::Resolved),
            incident(3, Category::Road, Status::Resolved),
        ]
    }

    #[test]
    fn empty_selection_keeps_everything_in_order() {
        let incidents = sample();
        let filtered = FilterSelection::new().apply(&incidents);
        assert_eq!(ids(&filtered), vec![1, 2, 3]);
    }

    #[test]
    fn category_then_status() {
        let incidents = sample();
        let mut selection = FilterSelection::new();
        selection.toggle_category(Category::Road);
        assert_eq!(ids(&selection.apply(&incidents)), vec![1, 3]);
        selection.toggle_status(Status::Resolved);
        assert_eq!(ids(&selection.apply(&incidents)), vec![3]);
    }

    #[test]
    fn toggling_off_restores_excluded_incidents() {
        let incidents = sample();
        let mut selection = FilterSelection::new();
        assert!(selection.toggle_category(Category::Lighting));
        assert_eq!(ids(&selection.apply(&incidents)), vec![2]);
        assert!(!selection.toggle_category(Category::Lighting));
        assert_eq!(ids(&selection.apply(&incidents)), vec![1, 2, 3]);
    }

    #[test]
    fn selecting_every_value_matches_everything() {
        let incidents = sample();
        let selection = FilterSelection::with(Category::ALL, Status::ALL);
        assert_eq!(ids(&selection.apply(&incidents)), vec![1, 2, 3]);
    }

    #[test]
    fn membership_holds_for_every_selection() {
        let incidents: Vec<Incident> = Category::ALL
            .iter()
            .enumerate()
            .flat_map(|(i, c)| {
                Status::ALL
                    .iter()
                    .enumerate()
                    .map(move |(j, s)| incident((i * 3 + j) as u64, *c, *s))
            })
            .collect();

        for category_mask in 0u32..(1 << Category::ALL.len()) {
            for status_mask in 0u32..(1 << Status::ALL.len()) {
                let categories: BTreeSet<Category> = Category::ALL
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| category_mask & (1 << i) != 0)
                    .map(|(_, c)| *c)
                    .collect();
                let statuses: BTreeSet<Status> = Status::ALL
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| status_mask & (1 << i) != 0)
                    .map(|(_, s)| *s)
                    .collect();

                let filtered = filter_incidents(&incidents, &categories, &statuses);
                let expected: Vec<u64> = incidents
                    .iter()
                    .filter(|i| categories.is_empty() || categories.contains(&i.category))
                    .filter(|i| statuses.is_empty() || statuses.contains(&i.status))
                    .map(|i| i.id)
                    .collect();
                assert_eq!(ids(&filtered), expected);
            }
        }
    }

    #[test]
    fn matches_agrees_with_apply() {
        let incidents = sample();
        let selection = FilterSelection::with([Category::Road], [Status::Resolved]);
        let matched: Vec<u64> = incidents
            .iter()
            .filter(|i| selection.matches(i))
            .map(|i| i.id)
            .collect();
        assert_eq!(matched, ids(&selection.apply(&incidents)));
        assert_eq!(matched, vec![3]);
    }

    #[test]
    fn active_count_and_reset() {
        let mut selection = FilterSelection::new();
        selection.toggle_category(Category::Trash);
        selection.toggle_category(Category::Water);
        selection.toggle_status(Status::Active);
        assert_eq!(selection.active_count(), 3);
        assert!(!selection.is_empty());
        selection.reset();
        assert!(selection.is_empty());
        assert_eq!(selection.active_count(), 0);
    }

    #[test]
    fn query_values_are_parsed() {
        let selection = FilterSelection::from_query(Some("road, lighting"), Some("")).unwrap();
        assert_eq!(
            selection.categories().iter().copied().collect::<Vec<_>>(),
            vec![Category::Road, Category::Lighting]
        );
        assert!(selection.statuses().is_empty());

        assert_eq!(
            FilterSelection::from_query(None, Some("done")),
            Err(FilterParseError::UnknownStatus("done".into()))
        );
    }
}
