use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    schema::model::Incident,
    taxonomy::{Category, Status},
    utils::parse_timestamp,
};

pub const UNTITLED: &str = "Sin título";
pub const UNKNOWN_ADDRESS: &str = "Dirección desconocida";

/// Incident as returned by the upstream `/reports` API. Every field is optional
/// because the upstream shape is not under our control.
#[derive(Serialize, Deserialize, Debug, Default, Clone)]
pub struct IncidentRecord {
    pub id: Option<u64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub upvotes: Option<i64>,
    pub downvotes: Option<i64>,
    pub comments_count: Option<i64>,
    pub image_url: Option<String>,
}

impl IncidentRecord {
    pub fn into_incident(self, now: DateTime<Utc>) -> Incident {
        let timestamp = |raw: Option<String>| {
            raw.as_deref()
                .filter(|s| !s.is_empty())
                .and_then(parse_timestamp)
                .unwrap_or(now)
        };
        Incident {
            id: self.id.unwrap_or(0),
            title: non_empty_or(self.title, UNTITLED),
            description: self.description.unwrap_or_default(),
            category: Category::from_wire(self.category.as_deref()),
            status: Status::from_wire(self.status.as_deref()),
            latitude: self.latitude.unwrap_or(0.0),
            longitude: self.longitude.unwrap_or(0.0),
            address: non_empty_or(self.address, UNKNOWN_ADDRESS),
            created_at: timestamp(self.created_at),
            updated_at: timestamp(self.updated_at),
            upvotes: counter(self.upvotes),
            downvotes: counter(self.downvotes),
            comments_count: counter(self.comments_count),
            image_url: self.image_url.filter(|url| !url.is_empty()),
        }
    }
}

fn non_empty_or(value: Option<String>, fallback: &str) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

fn counter(value: Option<i64>) -> u32 {
    value
        .map(|v| v.clamp(0, u32::MAX as i64) as u32)
        .unwrap_or(0)
}
